//! Render graph definition
//!
//! The graph is rebuilt every frame: features allocate handles and declare
//! passes in program order, then [`RenderGraph::execute`] runs the passes in
//! that same order. Declarations are used for resource lifetimes only, never
//! for reordering.

use crate::backend::*;
use crate::error::{GraphError, GraphResult};
use crate::render_graph::pass::*;
use crate::render_graph::pool::TransientResourcePool;
use crate::render_graph::release_queue::ReleaseQueue;
use crate::render_graph::resource::*;
use crate::render_graph::resource_map::ResourceMap;
use bytemuck::Pod;
use std::marker::PhantomData;

/// A transient or imported texture declared this frame
pub(crate) struct VirtualTexture {
    pub(crate) desc: TextureDesc,
    pub(crate) imported: Option<GpuTexture>,
}

/// A transient buffer declared this frame
pub(crate) struct VirtualBuffer {
    pub(crate) desc: BufferDesc,
    pub(crate) initial_data: Option<Vec<u8>>,
}

struct PersistentSlot<D, B> {
    generation: u32,
    entry: Option<(D, B)>,
}

/// Generation-checked slots for resources that outlive a frame
pub(crate) struct PersistentTable<K: ResourceKind, D, B> {
    slots: Vec<PersistentSlot<D, B>>,
    free: Vec<u32>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind, D, B: Copy> PersistentTable<K, D, B> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            _kind: PhantomData,
        }
    }

    fn insert(&mut self, desc: D, backing: B) -> ResourceHandle<K> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some((desc, backing));
            return ResourceHandle::new(index, slot.generation, Lifetime::Persistent);
        }
        let index = self.slots.len() as u32;
        self.slots.push(PersistentSlot {
            generation: 0,
            entry: Some((desc, backing)),
        });
        ResourceHandle::new(index, 0, Lifetime::Persistent)
    }

    pub(crate) fn get(&self, handle: ResourceHandle<K>) -> GraphResult<(&D, B)> {
        let slot = self
            .slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .ok_or(GraphError::StaleHandle {
                kind: K::NAME,
                index: handle.index(),
                generation: handle.generation(),
            })?;
        slot.entry
            .as_ref()
            .map(|(desc, backing)| (desc, *backing))
            .ok_or(GraphError::ReleasedHandle {
                kind: K::NAME,
                index: handle.index(),
            })
    }

    fn remove(&mut self, handle: ResourceHandle<K>) -> GraphResult<B> {
        self.get(handle)?;
        let slot = &mut self.slots[handle.index() as usize];
        let (_, backing) = slot.entry.take().ok_or(GraphError::ReleasedHandle {
            kind: K::NAME,
            index: handle.index(),
        })?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        Ok(backing)
    }

    fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }
}

/// Per-frame execution statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub passes_executed: usize,
    pub transient_textures: usize,
    pub transient_buffers: usize,
    /// Physical backings created by the allocator during this frame
    pub backings_created: u64,
    /// Transient acquisitions served from the pool
    pub backings_reused: u32,
    pub commands_recorded: usize,
}

/// The main render graph structure
pub struct RenderGraph {
    pub(crate) frame_index: u64,
    screen_width: u32,
    screen_height: u32,
    pub(crate) passes: Vec<RenderPassNode>,
    pub(crate) textures: Vec<VirtualTexture>,
    pub(crate) buffers: Vec<VirtualBuffer>,
    pub(crate) persistent_textures: PersistentTable<Texture, TextureDesc, GpuTexture>,
    pub(crate) persistent_buffers: PersistentTable<Buffer, BufferDesc, GpuBuffer>,
    pub(crate) resources: ResourceMap,
    pub(crate) allocator: ResourceAllocator,
    pub(crate) pool: TransientResourcePool,
    pub(crate) release_queue: ReleaseQueue,
    pub(crate) last_stats: FrameStats,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self {
            frame_index: 0,
            screen_width: 1,
            screen_height: 1,
            passes: Vec::new(),
            textures: Vec::new(),
            buffers: Vec::new(),
            persistent_textures: PersistentTable::new(),
            persistent_buffers: PersistentTable::new(),
            resources: ResourceMap::new(),
            allocator: ResourceAllocator::new(),
            pool: TransientResourcePool::new(),
            release_queue: ReleaseQueue::new(),
            last_stats: FrameStats::default(),
        }
    }

    /// Number of frames executed so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Generation stamped into transient handles declared this frame
    pub(crate) fn frame_generation(&self) -> u32 {
        self.frame_index as u32
    }

    pub fn set_screen_size(&mut self, width: u32, height: u32) {
        self.screen_width = width.max(1);
        self.screen_height = height.max(1);
    }

    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen_width, self.screen_height)
    }

    /// Descriptor for a texture matching the current screen size
    pub fn screen_texture_desc(&self, format: TextureFormat) -> TextureDesc {
        TextureDesc::new(self.screen_width, self.screen_height, format).screen_texture()
    }

    // ------------------------------------------------------------------
    // Pass declaration
    // ------------------------------------------------------------------

    /// Start declaring a pass. The pass is appended when the builder drops.
    pub fn add_render_pass(&mut self, name: &str, pass_type: PassType) -> PassBuilder<'_> {
        PassBuilder::new(self, name, pass_type)
    }

    pub fn add_raster_pass(&mut self, name: &str) -> PassBuilder<'_> {
        self.add_render_pass(name, PassType::Raster)
    }

    pub fn add_compute_pass(&mut self, name: &str) -> PassBuilder<'_> {
        self.add_render_pass(name, PassType::Compute)
    }

    pub fn add_generic_pass(&mut self, name: &str) -> PassBuilder<'_> {
        self.add_render_pass(name, PassType::Generic)
    }

    pub(crate) fn push_pass(&mut self, node: RenderPassNode) {
        log::trace!("declared pass '{}' ({} accesses)", node.name, node.accesses.len());
        self.passes.push(node);
    }

    /// Passes declared so far this frame
    pub fn passes(&self) -> &[RenderPassNode] {
        &self.passes
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    // ------------------------------------------------------------------
    // Resource allocation
    // ------------------------------------------------------------------

    /// Declare a texture. Persistent descriptors get a backing immediately;
    /// transient ones are bound to a pooled backing only while in use.
    pub fn try_get_texture(&mut self, desc: TextureDesc) -> GraphResult<TextureHandle> {
        desc.validate()?;
        if desc.is_persistent {
            let backing = self.allocator.create_texture(&desc);
            return Ok(self.persistent_textures.insert(desc, backing));
        }
        let index = self.textures.len() as u32;
        self.textures.push(VirtualTexture {
            desc,
            imported: None,
        });
        Ok(TextureHandle::new(
            index,
            self.frame_generation(),
            Lifetime::Transient,
        ))
    }

    /// Declare a texture.
    ///
    /// # Panics
    ///
    /// Panics on a descriptor with zero extent.
    pub fn get_texture(&mut self, desc: TextureDesc) -> TextureHandle {
        self.try_get_texture(desc)
            .unwrap_or_else(|err| panic!("get_texture: {err}"))
    }

    /// Declare a transient buffer.
    pub fn try_get_buffer(&mut self, desc: BufferDesc) -> GraphResult<BufferHandle> {
        desc.validate()?;
        Ok(self.push_buffer(desc, None))
    }

    /// Declare a transient buffer.
    ///
    /// # Panics
    ///
    /// Panics on a descriptor with zero count or stride.
    pub fn get_buffer(&mut self, desc: BufferDesc) -> BufferHandle {
        self.try_get_buffer(desc)
            .unwrap_or_else(|err| panic!("get_buffer: {err}"))
    }

    /// Declare a persistent buffer with its backing allocated now.
    pub fn get_persistent_buffer(&mut self, desc: BufferDesc) -> GraphResult<BufferHandle> {
        desc.validate()?;
        let backing = self.allocator.create_buffer(&desc);
        Ok(self.persistent_buffers.insert(desc, backing))
    }

    /// Declare a structured buffer filled with `data` before its first use.
    ///
    /// An empty slice still yields a single zeroed element so shaders always
    /// have something bound.
    pub fn get_buffer_with_data<T: Pod>(&mut self, label: &'static str, data: &[T]) -> BufferHandle {
        let stride = std::mem::size_of::<T>().max(1) as u32;
        let (count, bytes) = if data.is_empty() {
            (1, vec![0u8; stride as usize])
        } else {
            (data.len() as u32, bytemuck::cast_slice(data).to_vec())
        };
        let desc = BufferDesc::new(count, stride).with_label(label);
        self.push_buffer(desc, Some(bytes))
    }

    /// Upload a POD struct as this frame's constant buffer.
    pub fn set_constant_buffer<T: Pod>(&mut self, label: &'static str, value: &T) -> BufferHandle {
        let stride = std::mem::size_of::<T>().max(1) as u32;
        let mut bytes = bytemuck::bytes_of(value).to_vec();
        bytes.resize(stride as usize, 0);
        let desc = BufferDesc::new(1, stride)
            .with_label(label)
            .with_target(BufferTarget::Constant);
        self.push_buffer(desc, Some(bytes))
    }

    fn push_buffer(&mut self, desc: BufferDesc, initial_data: Option<Vec<u8>>) -> BufferHandle {
        let index = self.buffers.len() as u32;
        self.buffers.push(VirtualBuffer { desc, initial_data });
        BufferHandle::new(index, self.frame_generation(), Lifetime::Transient)
    }

    /// Register an externally owned texture for this frame.
    pub fn import_texture(&mut self, texture: GpuTexture, desc: TextureDesc) -> TextureHandle {
        let index = self.textures.len() as u32;
        self.textures.push(VirtualTexture {
            desc,
            imported: Some(texture),
        });
        TextureHandle::new(index, self.frame_generation(), Lifetime::Imported)
    }

    /// Destroy a persistent resource now. Later use of the handle is an error.
    pub fn release_persistent_resource(&mut self, resource: impl Into<ResourceRef>) -> GraphResult<()> {
        match resource.into() {
            ResourceRef::Texture(handle) => {
                if !handle.is_persistent() {
                    return Err(GraphError::InvalidArgument(format!(
                        "{handle:?} is not persistent"
                    )));
                }
                let backing = self.persistent_textures.remove(handle)?;
                self.allocator.destroy_texture(backing);
            }
            ResourceRef::Buffer(handle) => {
                if !handle.is_persistent() {
                    return Err(GraphError::InvalidArgument(format!(
                        "{handle:?} is not persistent"
                    )));
                }
                let backing = self.persistent_buffers.remove(handle)?;
                self.allocator.destroy_buffer(backing);
            }
        }
        Ok(())
    }

    /// Shared queue for releasing persistent resources from places without
    /// access to the graph. Drained at the start of the next `execute`.
    pub fn release_queue(&self) -> ReleaseQueue {
        self.release_queue.clone()
    }

    pub(crate) fn process_release_queue(&mut self) {
        for resource in self.release_queue.drain() {
            if let Err(err) = self.release_persistent_resource(resource) {
                log::warn!("deferred release failed: {err}");
            }
        }
    }

    pub fn texture_desc(&self, handle: TextureHandle) -> GraphResult<&TextureDesc> {
        match handle.lifetime() {
            Lifetime::Persistent => self.persistent_textures.get(handle).map(|(desc, _)| desc),
            Lifetime::Transient | Lifetime::Imported => {
                self.check_frame_generation(handle)?;
                self.textures
                    .get(handle.index() as usize)
                    .map(|texture| &texture.desc)
                    .ok_or(GraphError::StaleHandle {
                        kind: Texture::NAME,
                        index: handle.index(),
                        generation: handle.generation(),
                    })
            }
        }
    }

    pub fn buffer_desc(&self, handle: BufferHandle) -> GraphResult<&BufferDesc> {
        match handle.lifetime() {
            Lifetime::Persistent => self.persistent_buffers.get(handle).map(|(desc, _)| desc),
            Lifetime::Transient | Lifetime::Imported => {
                self.check_frame_generation(handle)?;
                self.buffers
                    .get(handle.index() as usize)
                    .map(|buffer| &buffer.desc)
                    .ok_or(GraphError::StaleHandle {
                        kind: Buffer::NAME,
                        index: handle.index(),
                        generation: handle.generation(),
                    })
            }
        }
    }

    fn check_frame_generation<K: ResourceKind>(&self, handle: ResourceHandle<K>) -> GraphResult<()> {
        if handle.generation() != self.frame_generation() {
            return Err(GraphError::StaleHandle {
                kind: K::NAME,
                index: handle.index(),
                generation: handle.generation(),
            });
        }
        Ok(())
    }

    pub(crate) fn validate_texture(&self, handle: TextureHandle) -> GraphResult<()> {
        self.texture_desc(handle).map(|_| ())
    }

    pub(crate) fn validate_buffer(&self, handle: BufferHandle) -> GraphResult<()> {
        self.buffer_desc(handle).map(|_| ())
    }

    /// Physical texture behind a persistent handle
    pub fn persistent_texture_backing(&self, handle: TextureHandle) -> GraphResult<GpuTexture> {
        self.persistent_textures.get(handle).map(|(_, backing)| backing)
    }

    pub fn persistent_resource_count(&self) -> usize {
        self.persistent_textures.len() + self.persistent_buffers.len()
    }

    // ------------------------------------------------------------------
    // Typed resource registry
    // ------------------------------------------------------------------

    /// Publish `value` as the current `T`, replacing any earlier value.
    pub fn set_resource<T: 'static>(&mut self, value: T, persistent: bool) {
        self.resources.set(value, self.frame_index, persistent);
    }

    /// Current `T` published this frame.
    ///
    /// # Panics
    ///
    /// Panics if no producer published `T` this frame.
    pub fn get_resource<T: 'static>(&self) -> &T {
        self.try_get_resource::<T>()
            .unwrap_or_else(|err| panic!("{err}"))
    }

    pub fn try_get_resource<T: 'static>(&self) -> GraphResult<&T> {
        self.resources.get::<T>(self.frame_index)
    }

    pub fn is_render_pass_data_valid<T: 'static>(&self) -> bool {
        self.resources.is_valid::<T>(self.frame_index)
    }

    pub fn resource_map(&self) -> &ResourceMap {
        &self.resources
    }

    // ------------------------------------------------------------------
    // Pool and statistics
    // ------------------------------------------------------------------

    /// Destroy pooled backings that sat unused for more than `max_idle_frames` trims.
    pub fn trim_pool(&mut self, max_idle_frames: u32) {
        self.pool.trim(&mut self.allocator, max_idle_frames);
    }

    pub fn pool(&self) -> &TransientResourcePool {
        &self.pool
    }

    pub fn allocator_stats(&self) -> AllocatorStats {
        self.allocator.stats()
    }

    /// Statistics of the last executed frame
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RenderGraph {
    fn drop(&mut self) {
        self.process_release_queue();
        let alive = self.persistent_resource_count();
        if alive > 0 {
            log::warn!("render graph dropped with {alive} persistent resources still alive");
        }
    }
}
