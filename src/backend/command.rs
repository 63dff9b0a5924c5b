//! Command recording
//!
//! [`CommandBuffer`] is the boundary between the graph and whatever actually
//! talks to the GPU. Passes record [`Command`] values in execution order; a
//! backend replays them. Recording keeps this crate testable without a device.

use crate::backend::types::*;
use glam::{Mat4, Vec4};

/// A single recorded GPU command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginSample(String),
    EndSample(String),
    SetGlobalTexture {
        name: &'static str,
        texture: GpuTexture,
    },
    SetGlobalBuffer {
        name: &'static str,
        buffer: GpuBuffer,
    },
    SetGlobalFloat {
        name: &'static str,
        value: f32,
    },
    SetGlobalInt {
        name: &'static str,
        value: i32,
    },
    SetGlobalVector {
        name: &'static str,
        value: Vec4,
    },
    SetGlobalMatrix {
        name: &'static str,
        value: Mat4,
    },
    SetRenderTarget {
        color: Vec<GpuTexture>,
        depth: Option<GpuTexture>,
        slice: u32,
        load: LoadAction,
        store: StoreAction,
    },
    SetBufferData {
        buffer: GpuBuffer,
        data: Vec<u8>,
    },
    ClearBuffer {
        buffer: GpuBuffer,
        value: u32,
    },
    SetViewProjection {
        view: Mat4,
        projection: Mat4,
    },
    DispatchCompute {
        kernel: &'static str,
        groups: [u32; 3],
    },
    DrawFullscreen {
        shader: &'static str,
    },
    DrawShadowCasters {
        visible_light_index: usize,
        split_index: u32,
    },
}

/// Ordered list of recorded commands
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_sample(&mut self, name: &str) {
        self.commands.push(Command::BeginSample(name.to_string()));
    }

    pub fn end_sample(&mut self, name: &str) {
        self.commands.push(Command::EndSample(name.to_string()));
    }

    pub fn set_global_texture(&mut self, name: &'static str, texture: GpuTexture) {
        self.commands.push(Command::SetGlobalTexture { name, texture });
    }

    pub fn set_global_buffer(&mut self, name: &'static str, buffer: GpuBuffer) {
        self.commands.push(Command::SetGlobalBuffer { name, buffer });
    }

    pub fn set_global_float(&mut self, name: &'static str, value: f32) {
        self.commands.push(Command::SetGlobalFloat { name, value });
    }

    pub fn set_global_int(&mut self, name: &'static str, value: i32) {
        self.commands.push(Command::SetGlobalInt { name, value });
    }

    pub fn set_global_vector(&mut self, name: &'static str, value: Vec4) {
        self.commands.push(Command::SetGlobalVector { name, value });
    }

    pub fn set_global_matrix(&mut self, name: &'static str, value: Mat4) {
        self.commands.push(Command::SetGlobalMatrix { name, value });
    }

    pub fn set_render_target(
        &mut self,
        color: Vec<GpuTexture>,
        depth: Option<GpuTexture>,
        slice: u32,
        load: LoadAction,
        store: StoreAction,
    ) {
        self.commands.push(Command::SetRenderTarget {
            color,
            depth,
            slice,
            load,
            store,
        });
    }

    /// Upload raw bytes into a buffer
    pub fn set_buffer_data(&mut self, buffer: GpuBuffer, data: Vec<u8>) {
        self.commands.push(Command::SetBufferData { buffer, data });
    }

    /// Fill a buffer with a repeated 32-bit value
    pub fn clear_buffer(&mut self, buffer: GpuBuffer, value: u32) {
        self.commands.push(Command::ClearBuffer { buffer, value });
    }

    pub fn set_view_projection(&mut self, view: Mat4, projection: Mat4) {
        self.commands.push(Command::SetViewProjection { view, projection });
    }

    pub fn dispatch_compute(&mut self, kernel: &'static str, x: u32, y: u32, z: u32) {
        self.commands.push(Command::DispatchCompute {
            kernel,
            groups: [x, y, z],
        });
    }

    pub fn draw_fullscreen(&mut self, shader: &'static str) {
        self.commands.push(Command::DrawFullscreen { shader });
    }

    pub fn draw_shadow_casters(&mut self, visible_light_index: usize, split_index: u32) {
        self.commands.push(Command::DrawShadowCasters {
            visible_light_index,
            split_index,
        });
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop all recorded commands, keeping the allocation
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Last texture bound to a global name, if any
    pub fn find_global_texture(&self, name: &str) -> Option<GpuTexture> {
        self.commands.iter().rev().find_map(|c| match c {
            Command::SetGlobalTexture { name: n, texture } if *n == name => Some(*texture),
            _ => None,
        })
    }

    /// Last buffer bound to a global name, if any
    pub fn find_global_buffer(&self, name: &str) -> Option<GpuBuffer> {
        self.commands.iter().rev().find_map(|c| match c {
            Command::SetGlobalBuffer { name: n, buffer } if *n == name => Some(*buffer),
            _ => None,
        })
    }

    /// Last float bound to a global name, if any
    pub fn find_global_float(&self, name: &str) -> Option<f32> {
        self.commands.iter().rev().find_map(|c| match c {
            Command::SetGlobalFloat { name: n, value } if *n == name => Some(*value),
            _ => None,
        })
    }
}
