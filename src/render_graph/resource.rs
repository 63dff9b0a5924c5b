//! Virtual resources for the render graph

use crate::backend::types::*;
use crate::error::GraphError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker trait for the kinds of resource a handle can refer to
pub trait ResourceKind: 'static {
    const NAME: &'static str;
}

/// Texture resource marker
#[derive(Debug)]
pub enum Texture {}

/// Buffer resource marker
#[derive(Debug)]
pub enum Buffer {}

impl ResourceKind for Texture {
    const NAME: &'static str = "texture";
}

impl ResourceKind for Buffer {
    const NAME: &'static str = "buffer";
}

/// How long the backing of a handle lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Valid for the frame that declared it; backing is pooled and aliased.
    Transient,
    /// Survives across frames until explicitly released.
    Persistent,
    /// Owned outside the graph; valid for the frame that imported it.
    Imported,
}

/// Typed opaque handle to a graph resource.
///
/// Transient and imported handles carry the frame generation they were
/// declared in, so a handle kept past its frame is detected as stale.
/// Persistent handles carry their slot generation instead.
pub struct ResourceHandle<K: ResourceKind> {
    index: u32,
    generation: u32,
    lifetime: Lifetime,
    _kind: PhantomData<fn() -> K>,
}

pub type TextureHandle = ResourceHandle<Texture>;
pub type BufferHandle = ResourceHandle<Buffer>;

impl<K: ResourceKind> ResourceHandle<K> {
    pub(crate) fn new(index: u32, generation: u32, lifetime: Lifetime) -> Self {
        Self {
            index,
            generation,
            lifetime,
            _kind: PhantomData,
        }
    }

    /// Get the index of this resource.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Get the generation of this handle.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn is_persistent(&self) -> bool {
        self.lifetime == Lifetime::Persistent
    }
}

impl<K: ResourceKind> Clone for ResourceHandle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: ResourceKind> Copy for ResourceHandle<K> {}

impl<K: ResourceKind> PartialEq for ResourceHandle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.generation == other.generation
            && self.lifetime == other.lifetime
    }
}

impl<K: ResourceKind> Eq for ResourceHandle<K> {}

impl<K: ResourceKind> Hash for ResourceHandle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
        self.lifetime.hash(state);
    }
}

impl<K: ResourceKind> fmt::Debug for ResourceHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}@{}({:?})",
            K::NAME,
            self.index,
            self.generation,
            self.lifetime
        )
    }
}

/// Texture request
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub label: &'static str,
    pub width: u32,
    pub height: u32,
    /// Array length, volume depth or cube count depending on `dimension`
    pub depth: u32,
    pub format: TextureFormat,
    pub dimension: TextureDimension,
    pub has_mips: bool,
    pub is_persistent: bool,
    pub is_screen_texture: bool,
}

impl TextureDesc {
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            label: "",
            width,
            height,
            depth: 1,
            format,
            dimension: TextureDimension::Tex2D,
            has_mips: false,
            is_persistent: false,
            is_screen_texture: false,
        }
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_dimension(mut self, dimension: TextureDimension) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_mips(mut self, has_mips: bool) -> Self {
        self.has_mips = has_mips;
        self
    }

    pub fn persistent(mut self) -> Self {
        self.is_persistent = true;
        self
    }

    pub fn screen_texture(mut self) -> Self {
        self.is_screen_texture = true;
        self
    }

    /// Number of mip levels a texture with this shape gets
    pub fn mip_count(&self) -> u32 {
        if self.has_mips {
            32 - self.width.max(self.height).max(1).leading_zeros()
        } else {
            1
        }
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(GraphError::InvalidArgument(format!(
                "texture '{}' has zero extent {}x{}x{}",
                self.label, self.width, self.height, self.depth
            )));
        }
        if self.dimension == TextureDimension::Cube && self.depth != 1 {
            return Err(GraphError::InvalidArgument(format!(
                "cube texture '{}' must have depth 1, use CubeArray",
                self.label
            )));
        }
        Ok(())
    }

    pub(crate) fn pool_key(&self) -> TextureKey {
        TextureKey {
            width: self.width,
            height: self.height,
            depth: self.depth,
            format: self.format,
            dimension: self.dimension,
            mip_count: self.mip_count(),
        }
    }
}

/// Buffer request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDesc {
    pub label: &'static str,
    pub count: u32,
    pub stride: u32,
    pub target: BufferTarget,
}

impl BufferDesc {
    pub fn new(count: u32, stride: u32) -> Self {
        Self {
            label: "",
            count,
            stride,
            target: BufferTarget::Structured,
        }
    }

    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn with_target(mut self, target: BufferTarget) -> Self {
        self.target = target;
        self
    }

    pub fn size(&self) -> u64 {
        self.count as u64 * self.stride as u64
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if self.count == 0 || self.stride == 0 {
            return Err(GraphError::InvalidArgument(format!(
                "buffer '{}' has zero size ({} x {})",
                self.label, self.count, self.stride
            )));
        }
        Ok(())
    }

    pub(crate) fn pool_key(&self) -> BufferKey {
        BufferKey {
            count: self.count,
            stride: self.stride,
            target: self.target,
        }
    }
}

/// Shape key used for texture reuse; label and lifetime flags do not matter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TextureKey {
    width: u32,
    height: u32,
    depth: u32,
    format: TextureFormat,
    dimension: TextureDimension,
    mip_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BufferKey {
    count: u32,
    stride: u32,
    target: BufferTarget,
}

/// Read/write intent of a declared access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    pub fn reads(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn writes(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Either kind of handle, for bookkeeping that spans both tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceRef {
    Texture(TextureHandle),
    Buffer(BufferHandle),
}

impl From<TextureHandle> for ResourceRef {
    fn from(handle: TextureHandle) -> Self {
        ResourceRef::Texture(handle)
    }
}

impl From<BufferHandle> for ResourceRef {
    fn from(handle: BufferHandle) -> Self {
        ResourceRef::Buffer(handle)
    }
}

impl ResourceRef {
    pub fn lifetime(&self) -> Lifetime {
        match self {
            ResourceRef::Texture(h) => h.lifetime(),
            ResourceRef::Buffer(h) => h.lifetime(),
        }
    }
}

/// What the graph does with a declared resource before the pass closure runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Tracked for lifetimes only
    None,
    /// Bound under a shader-visible name
    Global(&'static str),
    /// Bound as color render target
    ColorTarget {
        load: LoadAction,
        store: StoreAction,
    },
    /// Bound as depth render target
    DepthTarget {
        load: LoadAction,
        store: StoreAction,
    },
}

/// Resource access declaration for a pass
#[derive(Debug, Clone, Copy)]
pub struct ResourceAccess {
    pub resource: ResourceRef,
    pub mode: AccessMode,
    pub binding: Binding,
}

impl ResourceAccess {
    pub fn is_read(&self) -> bool {
        self.mode.reads()
    }

    pub fn is_write(&self) -> bool {
        self.mode.writes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_equality_includes_generation() {
        let a = TextureHandle::new(3, 1, Lifetime::Transient);
        let b = TextureHandle::new(3, 2, Lifetime::Transient);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_handle_debug() {
        let a = BufferHandle::new(7, 0, Lifetime::Persistent);
        assert_eq!(format!("{a:?}"), "buffer#7@0(Persistent)");
    }

    #[test]
    fn test_mip_count() {
        let desc = TextureDesc::new(1024, 512, TextureFormat::Rgba16Float).with_mips(true);
        assert_eq!(desc.mip_count(), 11);
        let desc = TextureDesc::new(1024, 512, TextureFormat::Rgba16Float);
        assert_eq!(desc.mip_count(), 1);
    }

    #[test]
    fn test_pool_key_ignores_label_and_lifetime() {
        let a = TextureDesc::new(64, 64, TextureFormat::R32Float).with_label("a");
        let b = TextureDesc::new(64, 64, TextureFormat::R32Float)
            .with_label("b")
            .persistent();
        assert_eq!(a.pool_key(), b.pool_key());
    }

    #[test]
    fn test_validate_rejects_zero_extent() {
        assert!(TextureDesc::new(0, 4, TextureFormat::R32Float).validate().is_err());
        assert!(BufferDesc::new(0, 4).validate().is_err());
        assert!(BufferDesc::new(4, 4).validate().is_ok());
    }

    #[test]
    fn test_access_mode() {
        assert!(AccessMode::ReadWrite.reads());
        assert!(AccessMode::ReadWrite.writes());
        assert!(!AccessMode::Read.writes());
    }
}
