//! Render pass declarations for the render graph

use crate::backend::*;
use crate::error::{GraphError, GraphResult};
use crate::render_graph::executor::BackingTable;
use crate::render_graph::graph::RenderGraph;
use crate::render_graph::pass_data::RenderPassData;
use crate::render_graph::resource::*;

/// Type of render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassType {
    /// Rasterization pass; `write_texture` binds render targets
    Raster,
    /// Compute dispatch pass
    Compute,
    /// Anything else: uploads, global state, copies
    Generic,
}

pub(crate) type RenderFn = Box<dyn FnOnce(&mut CommandBuffer, &PassContext<'_>)>;
pub(crate) type PropertyBinder = Box<dyn Fn(&PassContext<'_>, &mut CommandBuffer)>;

/// A declared pass waiting for execution
pub struct RenderPassNode {
    pub(crate) name: String,
    pub(crate) pass_type: PassType,
    pub(crate) accesses: Vec<ResourceAccess>,
    pub(crate) binders: Vec<PropertyBinder>,
    pub(crate) render_fn: Option<RenderFn>,
}

impl RenderPassNode {
    pub(crate) fn new(name: &str, pass_type: PassType) -> Self {
        Self {
            name: name.to_string(),
            pass_type,
            accesses: Vec::new(),
            binders: Vec::new(),
            render_fn: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pass_type(&self) -> PassType {
        self.pass_type
    }

    pub fn accesses(&self) -> &[ResourceAccess] {
        &self.accesses
    }

    pub fn reads_resource(&self, resource: ResourceRef) -> bool {
        self.accesses
            .iter()
            .any(|a| a.resource == resource && a.is_read())
    }

    pub fn writes_resource(&self, resource: ResourceRef) -> bool {
        self.accesses
            .iter()
            .any(|a| a.resource == resource && a.is_write())
    }

    fn declares(&self, resource: ResourceRef) -> bool {
        self.accesses.iter().any(|a| a.resource == resource)
    }
}

impl std::fmt::Debug for RenderPassNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPassNode")
            .field("name", &self.name)
            .field("pass_type", &self.pass_type)
            .field("accesses", &self.accesses)
            .field("binders", &self.binders.len())
            .field("has_render_fn", &self.render_fn.is_some())
            .finish()
    }
}

/// Scoped pass builder returned by [`RenderGraph::add_render_pass`].
///
/// Declarations accumulate while the builder is alive. Dropping it finalizes
/// the pass and appends it to the frame's pass list, so passes execute in the
/// order their builders go out of scope.
pub struct PassBuilder<'g> {
    graph: &'g mut RenderGraph,
    node: Option<RenderPassNode>,
}

impl<'g> PassBuilder<'g> {
    pub(crate) fn new(graph: &'g mut RenderGraph, name: &str, pass_type: PassType) -> Self {
        Self {
            graph,
            node: Some(RenderPassNode::new(name, pass_type)),
        }
    }

    fn node_mut(&mut self) -> &mut RenderPassNode {
        self.node
            .as_mut()
            .expect("pass builder used after finalization")
    }

    fn node(&self) -> &RenderPassNode {
        self.node
            .as_ref()
            .expect("pass builder used after finalization")
    }

    fn declare(&mut self, resource: ResourceRef, mode: AccessMode, binding: Binding) {
        let valid = match resource {
            ResourceRef::Texture(h) => self.graph.validate_texture(h),
            ResourceRef::Buffer(h) => self.graph.validate_buffer(h),
        };
        if let Err(err) = valid {
            panic!("pass '{}': {err}", self.node().name);
        }
        self.node_mut().accesses.push(ResourceAccess {
            resource,
            mode,
            binding,
        });
    }

    pub fn name(&self) -> &str {
        &self.node().name
    }

    pub fn pass_type(&self) -> PassType {
        self.node().pass_type
    }

    pub fn frame_index(&self) -> u64 {
        self.graph.frame_index()
    }

    /// Sample a texture under a shader-visible name.
    pub fn read_texture(&mut self, name: &'static str, handle: TextureHandle) -> &mut Self {
        self.declare(handle.into(), AccessMode::Read, Binding::Global(name));
        self
    }

    /// Render into a texture. Depth formats become the depth target.
    pub fn write_texture(
        &mut self,
        handle: TextureHandle,
        load: LoadAction,
        store: StoreAction,
    ) -> &mut Self {
        debug_assert_eq!(
            self.pass_type(),
            PassType::Raster,
            "write_texture binds render targets; use write_storage_texture in compute passes"
        );
        let is_depth = self
            .graph
            .texture_desc(handle)
            .map(|desc| desc.format.is_depth())
            .unwrap_or(false);
        let binding = if is_depth {
            Binding::DepthTarget { load, store }
        } else {
            Binding::ColorTarget { load, store }
        };
        let mode = if load == LoadAction::Load {
            AccessMode::ReadWrite
        } else {
            AccessMode::Write
        };
        self.declare(handle.into(), mode, binding);
        self
    }

    /// Read/write a texture as a storage image under a shader-visible name.
    pub fn write_storage_texture(&mut self, name: &'static str, handle: TextureHandle) -> &mut Self {
        self.declare(handle.into(), AccessMode::ReadWrite, Binding::Global(name));
        self
    }

    pub fn read_buffer(&mut self, name: &'static str, handle: BufferHandle) -> &mut Self {
        self.declare(handle.into(), AccessMode::Read, Binding::Global(name));
        self
    }

    pub fn write_buffer(&mut self, name: &'static str, handle: BufferHandle) -> &mut Self {
        self.declare(handle.into(), AccessMode::ReadWrite, Binding::Global(name));
        self
    }

    /// Track a texture without any automatic binding; the pass closure binds it.
    pub fn use_texture(&mut self, handle: TextureHandle, mode: AccessMode) -> &mut Self {
        self.declare(handle.into(), mode, Binding::None);
        self
    }

    /// Track a buffer without any automatic binding; the pass closure binds it.
    pub fn use_buffer(&mut self, handle: BufferHandle, mode: AccessMode) -> &mut Self {
        self.declare(handle.into(), mode, Binding::None);
        self
    }

    /// Pull the current `T` from the resource map into this pass.
    ///
    /// The data declares its inputs now and binds its properties right before
    /// the render function runs. Returns whether the data was present.
    ///
    /// # Panics
    ///
    /// Panics when `T` was not published this frame and `optional` is false:
    /// a consumer declared before its producer is a pipeline ordering bug.
    pub fn add_render_pass_data<T: RenderPassData>(&mut self, optional: bool) -> bool {
        let frame = self.graph.frame_index();
        let data = match self.graph.resource_map().get::<T>(frame) {
            Ok(data) => data.clone(),
            Err(err) if optional => {
                log::trace!("pass '{}' skipped optional {err}", self.node().name);
                return false;
            }
            Err(err) => panic!("pass '{}': {err}", self.node().name),
        };

        data.set_inputs(self);
        self.node_mut()
            .binders
            .push(Box::new(move |ctx, cmd| data.set_properties(ctx, cmd)));
        true
    }

    /// Set the closure recorded when the pass executes, with its typed data.
    pub fn set_render_function<D, F>(&mut self, data: D, render: F) -> &mut Self
    where
        D: 'static,
        F: FnOnce(&mut CommandBuffer, &PassContext<'_>, &D) + 'static,
    {
        let node = self.node_mut();
        if node.render_fn.is_some() {
            log::warn!("pass '{}' replaced its render function", node.name);
        }
        node.render_fn = Some(Box::new(move |cmd, ctx| render(cmd, ctx, &data)));
        self
    }
}

impl Drop for PassBuilder<'_> {
    fn drop(&mut self) {
        if let Some(node) = self.node.take() {
            self.graph.push_pass(node);
        }
    }
}

/// Execution-time view of a pass: resolves handles to physical backings
pub struct PassContext<'a> {
    pub(crate) node: &'a RenderPassNode,
    pub(crate) pass_index: usize,
    pub(crate) frame_index: u64,
    pub(crate) backings: BackingTable<'a>,
}

impl<'a> PassContext<'a> {
    pub fn pass_name(&self) -> &str {
        &self.node.name
    }

    pub fn pass_index(&self) -> usize {
        self.pass_index
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn try_texture(&self, handle: TextureHandle) -> GraphResult<GpuTexture> {
        if !self.node.declares(handle.into()) {
            return Err(GraphError::UndeclaredResource {
                name: format!("{handle:?}"),
                pass: self.node.name.clone(),
            });
        }
        self.backings.texture(handle)
    }

    pub fn try_buffer(&self, handle: BufferHandle) -> GraphResult<GpuBuffer> {
        if !self.node.declares(handle.into()) {
            return Err(GraphError::UndeclaredResource {
                name: format!("{handle:?}"),
                pass: self.node.name.clone(),
            });
        }
        self.backings.buffer(handle)
    }

    /// Physical texture for a handle declared by this pass.
    ///
    /// # Panics
    ///
    /// Panics if the pass did not declare `handle`.
    pub fn texture(&self, handle: TextureHandle) -> GpuTexture {
        self.try_texture(handle)
            .unwrap_or_else(|err| panic!("pass '{}': {err}", self.node.name))
    }

    /// Physical buffer for a handle declared by this pass.
    ///
    /// # Panics
    ///
    /// Panics if the pass did not declare `handle`.
    pub fn buffer(&self, handle: BufferHandle) -> GpuBuffer {
        self.try_buffer(handle)
            .unwrap_or_else(|err| panic!("pass '{}': {err}", self.node.name))
    }
}
