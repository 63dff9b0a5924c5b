//! Deferred release of persistent resources
//!
//! Features release their persistent handles from `cleanup`, which may run
//! from `Drop` where no graph is reachable. They push into a shared queue
//! instead; the graph drains it at the next frame boundary.

use crate::render_graph::resource::{BufferHandle, Lifetime, ResourceRef, TextureHandle};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle to the graph's pending-release list
#[derive(Clone, Default)]
pub struct ReleaseQueue {
    pending: Arc<Mutex<Vec<ResourceRef>>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release_texture(&self, handle: TextureHandle) {
        self.release(ResourceRef::Texture(handle));
    }

    pub fn release_buffer(&self, handle: BufferHandle) {
        self.release(ResourceRef::Buffer(handle));
    }

    pub fn release(&self, resource: ResourceRef) {
        if resource.lifetime() != Lifetime::Persistent {
            log::warn!("ignoring release of non-persistent {resource:?}");
            return;
        }
        self.pending.lock().push(resource);
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub(crate) fn drain(&self) -> Vec<ResourceRef> {
        std::mem::take(&mut *self.pending.lock())
    }
}

impl std::fmt::Debug for ReleaseQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseQueue")
            .field("pending", &self.len())
            .finish()
    }
}
