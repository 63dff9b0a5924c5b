//! Transient resource pool
//!
//! Free physical backings grouped by shape. The executor acquires a backing
//! right before a resource's first use and releases it right after its last
//! use, so two transient resources of the same shape share a backing only
//! when their live ranges do not overlap.
//!
//! Backings are never destroyed during normal rendering. Call
//! [`TransientResourcePool::trim`] after resolution changes to drop stale ones.

use crate::backend::{GpuBuffer, GpuTexture, ResourceAllocator};
use crate::render_graph::resource::{BufferDesc, BufferKey, TextureDesc, TextureKey};
use std::collections::HashMap;

struct FreeEntry<T> {
    backing: T,
    /// Frames spent in the free list without being reused
    idle_frames: u32,
}

/// Descriptor-keyed free lists of physical backings
#[derive(Default)]
pub struct TransientResourcePool {
    free_textures: HashMap<TextureKey, Vec<FreeEntry<GpuTexture>>>,
    free_buffers: HashMap<BufferKey, Vec<FreeEntry<GpuBuffer>>>,
    texture_keys: HashMap<GpuTexture, TextureKey>,
    buffer_keys: HashMap<GpuBuffer, BufferKey>,
    reused: u32,
}

impl TransientResourcePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a free texture of matching shape or create one.
    pub fn acquire_texture(
        &mut self,
        allocator: &mut ResourceAllocator,
        desc: &TextureDesc,
    ) -> GpuTexture {
        let key = desc.pool_key();
        if let Some(entry) = self.free_textures.get_mut(&key).and_then(Vec::pop) {
            self.reused += 1;
            return entry.backing;
        }
        let texture = allocator.create_texture(desc);
        self.texture_keys.insert(texture, key);
        texture
    }

    /// Take a free buffer of matching shape or create one.
    pub fn acquire_buffer(&mut self, allocator: &mut ResourceAllocator, desc: &BufferDesc) -> GpuBuffer {
        let key = desc.pool_key();
        if let Some(entry) = self.free_buffers.get_mut(&key).and_then(Vec::pop) {
            self.reused += 1;
            return entry.backing;
        }
        let buffer = allocator.create_buffer(desc);
        self.buffer_keys.insert(buffer, key);
        buffer
    }

    /// Return a texture to its free list.
    pub fn release_texture(&mut self, texture: GpuTexture) {
        let Some(key) = self.texture_keys.get(&texture).copied() else {
            log::warn!("texture {} does not belong to the transient pool", texture.id());
            return;
        };
        self.free_textures.entry(key).or_default().push(FreeEntry {
            backing: texture,
            idle_frames: 0,
        });
    }

    /// Return a buffer to its free list.
    pub fn release_buffer(&mut self, buffer: GpuBuffer) {
        let Some(key) = self.buffer_keys.get(&buffer).copied() else {
            log::warn!("buffer {} does not belong to the transient pool", buffer.id());
            return;
        };
        self.free_buffers.entry(key).or_default().push(FreeEntry {
            backing: buffer,
            idle_frames: 0,
        });
    }

    /// Age free entries by one frame and destroy those idle longer than `max_idle_frames`.
    pub fn trim(&mut self, allocator: &mut ResourceAllocator, max_idle_frames: u32) {
        for bucket in self.free_textures.values_mut() {
            bucket.retain_mut(|entry| {
                entry.idle_frames += 1;
                if entry.idle_frames > max_idle_frames {
                    allocator.destroy_texture(entry.backing);
                    self.texture_keys.remove(&entry.backing);
                    false
                } else {
                    true
                }
            });
        }
        self.free_textures.retain(|_, bucket| !bucket.is_empty());

        for bucket in self.free_buffers.values_mut() {
            bucket.retain_mut(|entry| {
                entry.idle_frames += 1;
                if entry.idle_frames > max_idle_frames {
                    allocator.destroy_buffer(entry.backing);
                    self.buffer_keys.remove(&entry.backing);
                    false
                } else {
                    true
                }
            });
        }
        self.free_buffers.retain(|_, bucket| !bucket.is_empty());
    }

    /// Number of acquisitions served from a free list since the last call.
    pub fn take_reuse_count(&mut self) -> u32 {
        std::mem::take(&mut self.reused)
    }

    pub fn free_texture_count(&self) -> usize {
        self.free_textures.values().map(Vec::len).sum()
    }

    pub fn free_buffer_count(&self) -> usize {
        self.free_buffers.values().map(Vec::len).sum()
    }

    /// Backings owned by the pool, free or in use
    pub fn total_count(&self) -> usize {
        self.texture_keys.len() + self.buffer_keys.len()
    }
}
