//! Render graph compilation and execution
//!
//! Compilation computes, for every declared resource, the first and last
//! pass (in declaration order) that touches it. Execution walks the passes in
//! that same order, binds a pooled backing to each transient resource right
//! before its first use and hands it back right after its last use.

use crate::backend::*;
use crate::error::{GraphError, GraphResult};
use crate::render_graph::graph::{FrameStats, PersistentTable, RenderGraph};
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use std::collections::HashMap;

/// Live range of a resource within one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub first_use: usize,
    pub last_use: usize,
    /// First pass that writes the resource, if any
    pub first_write: Option<usize>,
}

/// Compiled render graph ready for execution
#[derive(Debug, Default)]
pub struct CompiledGraph {
    /// Declaration order; the graph never reorders passes
    pub pass_order: Vec<usize>,
    pub resource_lifetimes: HashMap<ResourceRef, ResourceLifetime>,
}

impl CompiledGraph {
    pub fn compile(passes: &[RenderPassNode]) -> Self {
        let mut resource_lifetimes: HashMap<ResourceRef, ResourceLifetime> = HashMap::new();

        for (order, node) in passes.iter().enumerate() {
            for access in node.accesses() {
                let lifetime = resource_lifetimes
                    .entry(access.resource)
                    .or_insert(ResourceLifetime {
                        first_use: order,
                        last_use: order,
                        first_write: None,
                    });
                lifetime.last_use = order;
                if access.is_write() && lifetime.first_write.is_none() {
                    lifetime.first_write = Some(order);
                }
            }
        }

        Self {
            pass_order: (0..passes.len()).collect(),
            resource_lifetimes,
        }
    }

    pub fn lifetime(&self, resource: impl Into<ResourceRef>) -> Option<&ResourceLifetime> {
        self.resource_lifetimes.get(&resource.into())
    }

    /// Whether the resource holds a backing while `pass` runs
    pub fn is_resource_alive(&self, resource: impl Into<ResourceRef>, pass: usize) -> bool {
        self.lifetime(resource)
            .map(|lifetime| lifetime.first_use <= pass && pass <= lifetime.last_use)
            .unwrap_or(false)
    }

    /// Transient resources to acquire before, and release after, each pass.
    fn schedule(&self, passes: &[RenderPassNode]) -> (Vec<Vec<ResourceRef>>, Vec<Vec<ResourceRef>>) {
        let mut acquire = vec![Vec::new(); passes.len()];
        let mut release = vec![Vec::new(); passes.len()];

        for (order, node) in passes.iter().enumerate() {
            for access in node.accesses() {
                let resource = access.resource;
                if resource.lifetime() != Lifetime::Transient {
                    continue;
                }
                let Some(lifetime) = self.resource_lifetimes.get(&resource) else {
                    continue;
                };
                if lifetime.first_use == order && !acquire[order].contains(&resource) {
                    acquire[order].push(resource);
                }
                if lifetime.last_use == order && !release[order].contains(&resource) {
                    release[order].push(resource);
                }
            }
        }

        (acquire, release)
    }
}

/// Physical backings visible to a pass while it executes
pub(crate) struct BackingTable<'a> {
    pub(crate) generation: u32,
    pub(crate) textures: &'a [Option<GpuTexture>],
    pub(crate) buffers: &'a [Option<GpuBuffer>],
    pub(crate) persistent_textures: &'a PersistentTable<Texture, TextureDesc, GpuTexture>,
    pub(crate) persistent_buffers: &'a PersistentTable<Buffer, BufferDesc, GpuBuffer>,
}

impl BackingTable<'_> {
    pub(crate) fn texture(&self, handle: TextureHandle) -> GraphResult<GpuTexture> {
        match handle.lifetime() {
            Lifetime::Persistent => self.persistent_textures.get(handle).map(|(_, b)| b),
            Lifetime::Transient | Lifetime::Imported => {
                resolve_frame_resource(self.textures, handle, self.generation)
            }
        }
    }

    pub(crate) fn buffer(&self, handle: BufferHandle) -> GraphResult<GpuBuffer> {
        match handle.lifetime() {
            Lifetime::Persistent => self.persistent_buffers.get(handle).map(|(_, b)| b),
            Lifetime::Transient | Lifetime::Imported => {
                resolve_frame_resource(self.buffers, handle, self.generation)
            }
        }
    }
}

fn resolve_frame_resource<K: ResourceKind, B: Copy>(
    table: &[Option<B>],
    handle: ResourceHandle<K>,
    generation: u32,
) -> GraphResult<B> {
    if handle.generation() != generation {
        return Err(GraphError::StaleHandle {
            kind: K::NAME,
            index: handle.index(),
            generation: handle.generation(),
        });
    }
    table
        .get(handle.index() as usize)
        .copied()
        .flatten()
        .ok_or_else(|| GraphError::UnresolvedResource {
            name: format!("{handle:?}"),
        })
}

/// Bind named resources and render targets declared by the pass.
fn bind_declared_resources(ctx: &PassContext<'_>, cmd: &mut CommandBuffer) {
    let mut colors = Vec::new();
    let mut depth = None;
    let mut target_actions = None;

    for access in ctx.node.accesses() {
        match (access.binding, access.resource) {
            (Binding::Global(name), ResourceRef::Texture(handle)) => {
                cmd.set_global_texture(name, ctx.texture(handle));
            }
            (Binding::Global(name), ResourceRef::Buffer(handle)) => {
                cmd.set_global_buffer(name, ctx.buffer(handle));
            }
            (Binding::ColorTarget { load, store }, ResourceRef::Texture(handle)) => {
                colors.push(ctx.texture(handle));
                target_actions.get_or_insert((load, store));
            }
            (Binding::DepthTarget { load, store }, ResourceRef::Texture(handle)) => {
                depth = Some(ctx.texture(handle));
                target_actions.get_or_insert((load, store));
            }
            _ => {}
        }
    }

    if let Some((load, store)) = target_actions {
        cmd.set_render_target(colors, depth, 0, load, store);
    }
}

impl RenderGraph {
    /// Compute resource lifetimes for the passes declared so far.
    pub fn compile(&self) -> CompiledGraph {
        CompiledGraph::compile(&self.passes)
    }

    /// Run every declared pass in declaration order, then end the frame.
    ///
    /// Pending persistent releases are processed first. At the end, transient
    /// handles become stale, non-persistent registry entries are dropped and
    /// the frame index advances.
    pub fn execute(&mut self, cmd: &mut CommandBuffer) -> FrameStats {
        self.process_release_queue();

        let mut passes = std::mem::take(&mut self.passes);
        let compiled = CompiledGraph::compile(&passes);
        self.warn_uninitialized_reads(&passes, &compiled);

        let created_before = self.allocator.stats();
        let commands_before = cmd.len();
        let generation = self.frame_generation();

        let mut texture_backings: Vec<Option<GpuTexture>> =
            self.textures.iter().map(|texture| texture.imported).collect();
        let mut buffer_backings: Vec<Option<GpuBuffer>> = vec![None; self.buffers.len()];
        let (acquire_at, release_at) = compiled.schedule(&passes);

        for (index, node) in passes.iter_mut().enumerate() {
            for &resource in &acquire_at[index] {
                self.acquire_backing(resource, &mut texture_backings, &mut buffer_backings, cmd);
            }

            log::trace!("executing pass {index} '{}'", node.name);
            cmd.begin_sample(&node.name);
            let render_fn = node.render_fn.take();
            {
                let ctx = PassContext {
                    node,
                    pass_index: index,
                    frame_index: self.frame_index,
                    backings: BackingTable {
                        generation,
                        textures: &texture_backings,
                        buffers: &buffer_backings,
                        persistent_textures: &self.persistent_textures,
                        persistent_buffers: &self.persistent_buffers,
                    },
                };
                bind_declared_resources(&ctx, cmd);
                for binder in &node.binders {
                    binder(&ctx, cmd);
                }
                if let Some(render) = render_fn {
                    render(cmd, &ctx);
                }
            }
            cmd.end_sample(&node.name);

            for &resource in &release_at[index] {
                self.release_backing(resource, &mut texture_backings, &mut buffer_backings);
            }
        }

        let created_after = self.allocator.stats();
        let stats = FrameStats {
            frame_index: self.frame_index,
            passes_executed: passes.len(),
            transient_textures: self.textures.iter().filter(|t| t.imported.is_none()).count(),
            transient_buffers: self.buffers.len(),
            backings_created: (created_after.textures_created + created_after.buffers_created)
                - (created_before.textures_created + created_before.buffers_created),
            backings_reused: self.pool.take_reuse_count(),
            commands_recorded: cmd.len() - commands_before,
        };
        log::debug!(
            "frame {}: {} passes, {} live textures (peak {}), {} live buffers (peak {})",
            stats.frame_index,
            stats.passes_executed,
            created_after.live_textures,
            created_after.peak_textures,
            created_after.live_buffers,
            created_after.peak_buffers
        );

        self.end_frame();
        self.last_stats = stats;
        stats
    }

    fn acquire_backing(
        &mut self,
        resource: ResourceRef,
        texture_backings: &mut [Option<GpuTexture>],
        buffer_backings: &mut [Option<GpuBuffer>],
        cmd: &mut CommandBuffer,
    ) {
        match resource {
            ResourceRef::Texture(handle) => {
                let index = handle.index() as usize;
                let desc = &self.textures[index].desc;
                texture_backings[index] = Some(self.pool.acquire_texture(&mut self.allocator, desc));
            }
            ResourceRef::Buffer(handle) => {
                let index = handle.index() as usize;
                let virtual_buffer = &mut self.buffers[index];
                let backing = self
                    .pool
                    .acquire_buffer(&mut self.allocator, &virtual_buffer.desc);
                if let Some(data) = virtual_buffer.initial_data.take() {
                    cmd.set_buffer_data(backing, data);
                }
                buffer_backings[index] = Some(backing);
            }
        }
    }

    fn release_backing(
        &mut self,
        resource: ResourceRef,
        texture_backings: &mut [Option<GpuTexture>],
        buffer_backings: &mut [Option<GpuBuffer>],
    ) {
        match resource {
            ResourceRef::Texture(handle) => {
                if let Some(backing) = texture_backings[handle.index() as usize].take() {
                    self.pool.release_texture(backing);
                }
            }
            ResourceRef::Buffer(handle) => {
                if let Some(backing) = buffer_backings[handle.index() as usize].take() {
                    self.pool.release_buffer(backing);
                }
            }
        }
    }

    fn warn_uninitialized_reads(&self, passes: &[RenderPassNode], compiled: &CompiledGraph) {
        for (resource, lifetime) in &compiled.resource_lifetimes {
            if resource.lifetime() != Lifetime::Transient {
                continue;
            }
            if let ResourceRef::Buffer(handle) = resource {
                if self.buffers[handle.index() as usize].initial_data.is_some() {
                    continue;
                }
            }
            let written_first = lifetime
                .first_write
                .map(|write| write <= lifetime.first_use)
                .unwrap_or(false);
            if !written_first {
                log::warn!(
                    "pass '{}' reads {resource:?} before any pass wrote it",
                    passes[lifetime.first_use].name
                );
            }
        }
    }

    fn end_frame(&mut self) {
        self.textures.clear();
        self.buffers.clear();
        self.resources.end_frame();
        self.frame_index += 1;
    }
}
