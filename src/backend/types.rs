//! Common types shared between the graph and the command recording layer

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    R11G11B10Float,
    R16Float,
    R32Float,
    Rg16Float,
    Rg32Float,
    R32Uint,
    R32G32Sint,
    Depth16Unorm,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth32Float
                | TextureFormat::Depth24PlusStencil8
        )
    }

    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Depth16Unorm | TextureFormat::R16Float => 2,
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::R11G11B10Float
            | TextureFormat::R32Float
            | TextureFormat::Rg16Float
            | TextureFormat::R32Uint
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float | TextureFormat::Rg32Float | TextureFormat::R32G32Sint => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}

/// Shape of a texture resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureDimension {
    #[default]
    Tex2D,
    Tex2DArray,
    Tex3D,
    Cube,
    CubeArray,
}

impl TextureDimension {
    /// Number of array layers a texture of this shape occupies for `depth` elements.
    ///
    /// Cube arrays store six faces per element.
    pub fn layer_count(&self, depth: u32) -> u32 {
        match self {
            TextureDimension::Tex2D | TextureDimension::Tex3D => 1,
            TextureDimension::Tex2DArray => depth,
            TextureDimension::Cube => 6,
            TextureDimension::CubeArray => depth * 6,
        }
    }
}

/// How a buffer is bound by shaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferTarget {
    #[default]
    Structured,
    Raw,
    Constant,
}

/// What happens to render target contents when a pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadAction {
    Load,
    #[default]
    Clear,
    DontCare,
}

/// What happens to render target contents when a pass ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreAction {
    #[default]
    Store,
    DontCare,
}

/// Physical texture backing owned by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuTexture(pub(crate) u32);

impl GpuTexture {
    /// Raw id, mostly useful for logging
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Physical buffer backing owned by the allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuBuffer(pub(crate) u32);

impl GpuBuffer {
    /// Raw id, mostly useful for logging
    pub fn id(&self) -> u32 {
        self.0
    }
}
