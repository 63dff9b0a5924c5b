//! Physical resource allocator
//!
//! Stands in for the device: hands out [`GpuTexture`]/[`GpuBuffer`] ids for
//! descriptors and keeps live/peak counts so pooling behavior is observable.

use crate::backend::types::*;
use crate::render_graph::{BufferDesc, TextureDesc};
use std::collections::HashMap;

/// Snapshot of allocator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    pub live_textures: usize,
    pub live_buffers: usize,
    pub peak_textures: usize,
    pub peak_buffers: usize,
    pub textures_created: u64,
    pub buffers_created: u64,
}

/// Owner of all physical backings
#[derive(Debug, Default)]
pub struct ResourceAllocator {
    textures: HashMap<GpuTexture, TextureDesc>,
    buffers: HashMap<GpuBuffer, BufferDesc>,
    next_id: u32,
    stats: AllocatorStats,
}

impl ResourceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_texture(&mut self, desc: &TextureDesc) -> GpuTexture {
        let texture = GpuTexture(self.next_id);
        self.next_id += 1;
        self.textures.insert(texture, desc.clone());

        self.stats.textures_created += 1;
        self.stats.live_textures = self.textures.len();
        self.stats.peak_textures = self.stats.peak_textures.max(self.stats.live_textures);

        log::trace!(
            "created texture {} '{}' {}x{}x{} {:?}",
            texture.0,
            desc.label,
            desc.width,
            desc.height,
            desc.depth,
            desc.format
        );
        texture
    }

    pub fn create_buffer(&mut self, desc: &BufferDesc) -> GpuBuffer {
        let buffer = GpuBuffer(self.next_id);
        self.next_id += 1;
        self.buffers.insert(buffer, desc.clone());

        self.stats.buffers_created += 1;
        self.stats.live_buffers = self.buffers.len();
        self.stats.peak_buffers = self.stats.peak_buffers.max(self.stats.live_buffers);

        log::trace!(
            "created buffer {} '{}' {}x{}",
            buffer.0,
            desc.label,
            desc.count,
            desc.stride
        );
        buffer
    }

    pub fn destroy_texture(&mut self, texture: GpuTexture) {
        if self.textures.remove(&texture).is_none() {
            log::warn!("destroy of unknown texture {}", texture.0);
        }
        self.stats.live_textures = self.textures.len();
    }

    pub fn destroy_buffer(&mut self, buffer: GpuBuffer) {
        if self.buffers.remove(&buffer).is_none() {
            log::warn!("destroy of unknown buffer {}", buffer.0);
        }
        self.stats.live_buffers = self.buffers.len();
    }

    pub fn texture_desc(&self, texture: GpuTexture) -> Option<&TextureDesc> {
        self.textures.get(&texture)
    }

    pub fn buffer_desc(&self, buffer: GpuBuffer) -> Option<&BufferDesc> {
        self.buffers.get(&buffer)
    }

    pub fn stats(&self) -> AllocatorStats {
        self.stats
    }
}
