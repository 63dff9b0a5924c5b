//! Shadow atlas rendering
//!
//! Each frame allocates one depth array per light category, sized to exactly
//! the number of slices requested, and records one raster pass per request.
//! A category with no requests gets a cleared 1×1 array so the lighting
//! shader always has something bound.

use crate::backend::{CommandBuffer, LoadAction, StoreAction, TextureDimension, TextureFormat};
use crate::feature::RenderFeature;
use crate::pipeline::shadow_request::{ShadowRequest, ShadowRequestSet};
use crate::render_graph::{
    AccessMode, BufferHandle, PassBuilder, PassContext, RenderGraph, RenderPassData, TextureDesc, TextureHandle,
};
use crate::settings::ShadowSettings;
use glam::{Mat4, Vec4};

pub const SHADOW_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Shadow atlases and their per-slice data for the lighting pass
#[derive(Debug, Clone)]
pub struct ShadowRendererResult {
    pub directional_shadows: TextureHandle,
    pub point_shadows: TextureHandle,
    pub spot_shadows: TextureHandle,
    /// World to atlas matrix per cascade
    pub directional_matrices: BufferHandle,
    pub directional_texel_sizes: BufferHandle,
    /// Culling sphere per cascade, used to pick the cascade when shading
    pub cascade_spheres: BufferHandle,
    pub point_texel_sizes: BufferHandle,
    pub spot_matrices: BufferHandle,
    pub spot_texel_sizes: BufferHandle,
    pub cascade_count: u32,
}

impl RenderPassData for ShadowRendererResult {
    fn set_inputs(&self, pass: &mut PassBuilder<'_>) {
        pass.read_texture("_DirectionalShadows", self.directional_shadows)
            .read_texture("_PointShadows", self.point_shadows)
            .read_texture("_SpotShadows", self.spot_shadows)
            .read_buffer("_DirectionalShadowMatrices", self.directional_matrices)
            .read_buffer("_DirectionalShadowTexelSizes", self.directional_texel_sizes)
            .read_buffer("_CascadeCullingSpheres", self.cascade_spheres)
            .read_buffer("_PointShadowTexelSizes", self.point_texel_sizes)
            .read_buffer("_SpotShadowMatrices", self.spot_matrices)
            .read_buffer("_SpotShadowTexelSizes", self.spot_texel_sizes);
    }

    fn set_properties(&self, _ctx: &PassContext<'_>, cmd: &mut CommandBuffer) {
        cmd.set_global_int("_CascadeCount", self.cascade_count as i32);
    }
}

pub struct ShadowRenderer {
    settings: ShadowSettings,
}

impl ShadowRenderer {
    pub fn new(settings: ShadowSettings) -> Self {
        Self { settings }
    }

    pub fn set_settings(&mut self, settings: ShadowSettings) {
        self.settings = settings;
    }
}

/// Atlas for one light category
fn render_atlas(
    graph: &mut RenderGraph,
    label: &'static str,
    dimension: TextureDimension,
    resolution: u32,
    requests: &[ShadowRequest],
) -> TextureHandle {
    if requests.is_empty() {
        let dummy = graph.get_texture(
            TextureDesc::new(1, 1, SHADOW_FORMAT)
                .with_dimension(dimension)
                .with_label(label),
        );
        let mut pass = graph.add_raster_pass(label);
        pass.write_texture(dummy, LoadAction::Clear, StoreAction::Store);
        return dummy;
    }

    let elements = match dimension {
        TextureDimension::CubeArray => requests.len().div_ceil(6),
        _ => requests.len(),
    };
    let atlas = graph.get_texture(
        TextureDesc::new(resolution, resolution, SHADOW_FORMAT)
            .with_dimension(dimension)
            .with_depth(elements as u32)
            .with_label(label),
    );

    for (slice, request) in requests.iter().enumerate() {
        let name = format!("{label} {slice}");
        let mut pass = graph.add_raster_pass(&name);
        pass.use_texture(atlas, AccessMode::Write);
        pass.set_render_function(*request, move |cmd, ctx, request| {
            cmd.set_render_target(
                Vec::new(),
                Some(ctx.texture(atlas)),
                slice as u32,
                LoadAction::Clear,
                StoreAction::Store,
            );
            if request.is_valid {
                cmd.set_view_projection(request.view, request.projection);
                cmd.draw_shadow_casters(request.visible_light_index, request.face_or_cascade);
            }
        });
    }
    atlas
}

impl RenderFeature for ShadowRenderer {
    type Input<'a> = &'a ShadowRequestSet;

    fn name(&self) -> &'static str {
        "ShadowRenderer"
    }

    fn render(&mut self, graph: &mut RenderGraph, requests: &ShadowRequestSet) {
        let settings = &self.settings;
        let directional_shadows = render_atlas(
            graph,
            "Directional Shadows",
            TextureDimension::Tex2DArray,
            settings.directional_resolution,
            &requests.directional,
        );
        let point_shadows = render_atlas(
            graph,
            "Point Shadows",
            TextureDimension::CubeArray,
            settings.point_resolution,
            &requests.point,
        );
        let spot_shadows = render_atlas(
            graph,
            "Spot Shadows",
            TextureDimension::Tex2DArray,
            settings.spot_resolution,
            &requests.spot,
        );

        let matrices = |requests: &[ShadowRequest]| -> Vec<Mat4> { requests.iter().map(|r| r.atlas_matrix).collect() };
        let texel_sizes = |requests: &[ShadowRequest]| -> Vec<Vec4> { requests.iter().map(|r| r.texel_size).collect() };
        let spheres: Vec<Vec4> = requests
            .directional
            .iter()
            .map(|r| r.split.culling_sphere)
            .collect();

        log::trace!(
            "shadow renderer: {} directional, {} point, {} spot slices",
            requests.directional.len(),
            requests.point.len(),
            requests.spot.len()
        );

        let result = ShadowRendererResult {
            directional_shadows,
            point_shadows,
            spot_shadows,
            directional_matrices: graph.get_buffer_with_data("DirectionalShadowMatrices", &matrices(&requests.directional)),
            directional_texel_sizes: graph
                .get_buffer_with_data("DirectionalShadowTexelSizes", &texel_sizes(&requests.directional)),
            cascade_spheres: graph.get_buffer_with_data("CascadeCullingSpheres", &spheres),
            point_texel_sizes: graph.get_buffer_with_data("PointShadowTexelSizes", &texel_sizes(&requests.point)),
            spot_matrices: graph.get_buffer_with_data("SpotShadowMatrices", &matrices(&requests.spot)),
            spot_texel_sizes: graph.get_buffer_with_data("SpotShadowTexelSizes", &texel_sizes(&requests.spot)),
            cascade_count: settings.cascade_count,
        };
        graph.set_resource(result, false);
    }
}
