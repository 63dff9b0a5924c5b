//! Clustered deferred lighting pipeline
//!
//! Features run in producer-before-consumer order each frame:
//! 1. Lighting setup - Packs visible lights and emits shadow requests
//! 2. Shadow renderer - Renders requests into per-category atlases
//! 3. Clustered light culling - Assigns local lights to view clusters
//! 4. Deferred lighting - Fullscreen pass consuming all of the above

pub mod light_culling;
pub mod lighting_pass;
pub mod lighting_setup;
pub mod shadow_culling;
pub mod shadow_fit;
pub mod shadow_renderer;
pub mod shadow_request;

pub use light_culling::{
    ClusterCullingInput, ClusterGrid, ClusterLayout, ClusterLight, ClusteredLightCulling, ClusteredLightCullingResult,
};
pub use lighting_pass::{DeferredLighting, DeferredLightingInput};
pub use lighting_setup::{LightingSetup, LightingSetupInput, LightingSetupResult, LocalLight};
pub use shadow_culling::{DefaultShadowCulling, ShadowCasterSource, ShadowCullingOutput};
pub use shadow_renderer::{ShadowRenderer, ShadowRendererResult};
pub use shadow_request::{
    CullingPlanes, ShadowRequest, ShadowRequestPool, ShadowRequestSet, ShadowSplitData, MAX_CULLING_PLANES,
};

use crate::backend::TextureFormat;
use crate::error::ConfigError;
use crate::feature::{FeatureHandle, LeakTracker, RenderFeature};
use crate::render_graph::{RenderGraph, TextureHandle};
use crate::scene::{CullingResults, Scene};
use crate::settings::RendererSettings;

/// Format of the lit color target
pub const LIGHTING_TARGET_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

/// Owns the lighting features and declares their passes for one camera
pub struct LightingPipeline {
    settings: RendererSettings,
    lighting_setup: FeatureHandle<LightingSetup>,
    shadow_renderer: FeatureHandle<ShadowRenderer>,
    light_culling: FeatureHandle<ClusteredLightCulling>,
    deferred_lighting: FeatureHandle<DeferredLighting>,
}

impl LightingPipeline {
    pub fn new(settings: RendererSettings) -> Result<Self, ConfigError> {
        Self::build(settings, None)
    }

    /// Same as `new`, with every feature registered in `tracker`
    pub fn with_tracker(settings: RendererSettings, tracker: &LeakTracker) -> Result<Self, ConfigError> {
        Self::build(settings, Some(tracker))
    }

    fn build(settings: RendererSettings, tracker: Option<&LeakTracker>) -> Result<Self, ConfigError> {
        settings.validate()?;

        fn wrap<F: RenderFeature>(feature: F, tracker: Option<&LeakTracker>) -> FeatureHandle<F> {
            match tracker {
                Some(tracker) => FeatureHandle::tracked(feature, tracker),
                None => FeatureHandle::new(feature),
            }
        }

        log::info!(
            "lighting pipeline: {} cascades, {}px tiles, {} depth slices, {:?} cluster assignment",
            settings.shadows.cascade_count,
            settings.clustering.tile_size,
            settings.clustering.cluster_depth,
            settings.clustering.assignment
        );

        Ok(Self {
            lighting_setup: wrap(LightingSetup::new(settings.shadows.clone()), tracker),
            shadow_renderer: wrap(ShadowRenderer::new(settings.shadows.clone()), tracker),
            light_culling: wrap(ClusteredLightCulling::new(settings.clustering.clone()), tracker),
            deferred_lighting: wrap(DeferredLighting::new(), tracker),
            settings,
        })
    }

    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: RendererSettings) -> Result<(), ConfigError> {
        settings.validate()?;
        self.lighting_setup.set_settings(settings.shadows.clone());
        self.shadow_renderer.set_settings(settings.shadows.clone());
        self.light_culling.set_settings(settings.clustering.clone());
        self.settings = settings;
        Ok(())
    }

    /// Declare this frame's lighting passes and return the lit color target.
    pub fn render(&mut self, graph: &mut RenderGraph, scene: &Scene, width: u32, height: u32) -> TextureHandle {
        graph.set_screen_size(width, height);
        let mut camera = scene.camera.clone();
        camera.set_aspect(width.max(1) as f32, height.max(1) as f32);

        let culling = CullingResults::cull(&camera.frustum_planes(), &scene.lights, &scene.shadow_casters);
        let source = DefaultShadowCulling::new(&culling);

        self.lighting_setup.render(
            graph,
            LightingSetupInput {
                camera: &camera,
                culling: &culling,
                source: &source,
            },
        );
        self.shadow_renderer
            .render(graph, self.lighting_setup.shadow_requests());
        self.lighting_setup.release_shadow_requests();

        self.light_culling.render(
            graph,
            ClusterCullingInput {
                camera: &camera,
                width,
                height,
            },
        );

        let target_desc = graph
            .screen_texture_desc(LIGHTING_TARGET_FORMAT)
            .with_label("LightingTarget");
        let target = graph.get_texture(target_desc);
        self.deferred_lighting.render(
            graph,
            DeferredLightingInput {
                camera: &camera,
                target,
                ambient_light: scene.ambient_light,
            },
        );
        target
    }

    /// Clean up every feature.
    pub fn dispose(self) {
        let Self {
            lighting_setup,
            shadow_renderer,
            light_culling,
            deferred_lighting,
            ..
        } = self;
        deferred_lighting.dispose();
        light_culling.dispose();
        shadow_renderer.dispose();
        lighting_setup.dispose();
    }
}
