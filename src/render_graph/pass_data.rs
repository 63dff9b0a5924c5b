//! Typed pass data published between features

use crate::backend::CommandBuffer;
use crate::render_graph::pass::{PassBuilder, PassContext};

/// A small immutable result that a producing feature publishes through the
/// graph's resource map and consuming passes pull in by type.
///
/// `set_inputs` runs while the consuming pass is being declared and must
/// declare every handle the data binds. `set_properties` runs at execution
/// time, right before the pass's render function.
pub trait RenderPassData: Clone + 'static {
    fn set_inputs(&self, pass: &mut PassBuilder<'_>);

    fn set_properties(&self, ctx: &PassContext<'_>, cmd: &mut CommandBuffer);
}
