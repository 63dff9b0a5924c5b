//! Frame Graph - per-frame render graph with clustered lighting and shadow requests
//!
//! The graph records passes and their resource declarations every frame,
//! executes them in declaration order against a recording command buffer, and
//! manages transient resource aliasing, persistent resources and per-view
//! history textures.
//!
//! # Features
//! - Render graph with typed handles, pooled transient backings and RAII pass builders
//! - Typed resource map for passing results between render features
//! - Current/history texture pairs for temporal effects
//! - Clustered light culling with logarithmic depth slices (GPU or CPU assignment)
//! - Shadow request generation for directional cascades, point cube faces and spot lights
//! - Shadow atlas rendering and a deferred lighting consumer

pub mod backend;
pub mod error;
pub mod feature;
pub mod math;
pub mod pipeline;
pub mod render_graph;
pub mod scene;
pub mod settings;

pub use backend::{CommandBuffer, GpuBuffer, GpuTexture};
pub use error::{ConfigError, GraphError, GraphResult};
pub use feature::{FeatureHandle, LeakTracker, RenderFeature};
pub use pipeline::LightingPipeline;
pub use render_graph::{BufferHandle, PassBuilder, PassContext, RenderGraph, RenderPassData, TextureHandle};
pub use scene::{Camera, Light, Scene};
pub use settings::RendererSettings;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
