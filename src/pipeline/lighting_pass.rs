//! Deferred lighting pass
//!
//! Fullscreen pass that consumes the light list, the cluster grid and, when
//! present, the shadow atlases, and accumulates lighting into the target.

use crate::backend::{LoadAction, StoreAction};
use crate::feature::RenderFeature;
use crate::pipeline::light_culling::ClusteredLightCullingResult;
use crate::pipeline::lighting_setup::LightingSetupResult;
use crate::pipeline::shadow_renderer::ShadowRendererResult;
use crate::render_graph::{RenderGraph, TextureHandle};
use crate::scene::Camera;
use glam::Vec3;

pub struct DeferredLightingInput<'a> {
    pub camera: &'a Camera,
    pub target: TextureHandle,
    pub ambient_light: Vec3,
}

/// Deferred lighting pass
#[derive(Debug, Default)]
pub struct DeferredLighting;

impl DeferredLighting {
    pub fn new() -> Self {
        Self
    }
}

impl RenderFeature for DeferredLighting {
    type Input<'a> = DeferredLightingInput<'a>;

    fn name(&self) -> &'static str {
        "DeferredLighting"
    }

    fn render(&mut self, graph: &mut RenderGraph, input: DeferredLightingInput<'_>) {
        let camera_data = graph.set_constant_buffer("CameraData", &input.camera.uniform_data());
        let ambient = input.ambient_light.extend(1.0);

        let mut pass = graph.add_raster_pass("Deferred Lighting");
        pass.add_render_pass_data::<LightingSetupResult>(false);
        pass.add_render_pass_data::<ClusteredLightCullingResult>(false);
        // Shadows are optional; the shader falls back to unshadowed lighting
        let shadows = pass.add_render_pass_data::<ShadowRendererResult>(true);
        pass.read_buffer("_CameraData", camera_data)
            .write_texture(input.target, LoadAction::Clear, StoreAction::Store);
        pass.set_render_function(shadows, move |cmd, _ctx, shadows| {
            cmd.set_global_int("_ShadowsEnabled", i32::from(*shadows));
            cmd.set_global_vector("_AmbientLight", ambient);
            cmd.draw_fullscreen("DeferredLighting");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Command, CommandBuffer, TextureFormat};
    use crate::pipeline::light_culling::{ClusterCullingInput, ClusteredLightCulling};
    use crate::settings::ClusterSettings;
    use std::sync::Arc;

    fn publish_light_list(graph: &mut RenderGraph) {
        let light_buffer = graph.get_buffer_with_data("LightData", &[0u32; 16][..]);
        graph.set_resource(
            LightingSetupResult {
                light_buffer,
                light_count: 0,
                directional_light_count: 0,
                local_lights: Arc::new([]),
            },
            false,
        );
    }

    #[test]
    fn test_lighting_without_shadows() {
        let mut graph = RenderGraph::new();
        graph.set_screen_size(64, 64);
        let camera = Camera::default();
        publish_light_list(&mut graph);
        ClusteredLightCulling::new(ClusterSettings::default()).render(
            &mut graph,
            ClusterCullingInput {
                camera: &camera,
                width: 64,
                height: 64,
            },
        );

        let target = graph.get_texture(graph.screen_texture_desc(TextureFormat::Rgba16Float));
        DeferredLighting::new().render(
            &mut graph,
            DeferredLightingInput {
                camera: &camera,
                target,
                ambient_light: Vec3::splat(0.1),
            },
        );

        let mut cmd = CommandBuffer::new();
        graph.execute(&mut cmd);
        assert!(cmd
            .commands()
            .contains(&Command::DrawFullscreen { shader: "DeferredLighting" }));
        assert!(cmd.commands().contains(&Command::SetGlobalInt {
            name: "_ShadowsEnabled",
            value: 0
        }));
        assert!(cmd.find_global_buffer("_LightClusterList").is_some());
        assert!(cmd.find_global_buffer("_LightData").is_some());
    }

    #[test]
    #[should_panic(expected = "ClusteredLightCullingResult")]
    fn test_missing_cluster_grid_panics() {
        let mut graph = RenderGraph::new();
        publish_light_list(&mut graph);
        let camera = Camera::default();
        let target = graph.get_texture(graph.screen_texture_desc(TextureFormat::Rgba16Float));
        DeferredLighting::new().render(
            &mut graph,
            DeferredLightingInput {
                camera: &camera,
                target,
                ambient_light: Vec3::ZERO,
            },
        );
    }
}
