//! Per-frame light list and shadow request generation
//!
//! Runs first in the lighting pipeline. Every visible light is packed into the
//! GPU light buffer (directional lights first) and every shadowed light is
//! expanded into [`ShadowRequest`]s for the shadow renderer.

use crate::backend::CommandBuffer;
use crate::feature::RenderFeature;
use crate::math::Sphere;
use crate::pipeline::shadow_culling::{ShadowCasterSource, ShadowCullingOutput};
use crate::pipeline::shadow_fit::{
    atlas_matrix, cascade_culling_sphere, cascade_splits, close_fit_cascade, merge_culling_planes,
    projection_depth_range, texel_size,
};
use crate::pipeline::shadow_request::{ShadowRequest, ShadowRequestPool, ShadowRequestSet, ShadowSplitData};
use crate::render_graph::{BufferHandle, PassBuilder, PassContext, RenderGraph, RenderPassData};
use crate::scene::{Camera, CullingResults, LightType, VisibleLight};
use crate::settings::ShadowSettings;
use glam::{Mat4, Vec3, Vec4};
use std::sync::Arc;

/// A point or spot light as seen by cluster assignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalLight {
    /// Index into the light buffer
    pub light_index: u32,
    /// World-space bounds of the lit volume
    pub sphere: Sphere,
    pub light_type: LightType,
}

/// Light list published for the rest of the frame
#[derive(Debug, Clone)]
pub struct LightingSetupResult {
    pub light_buffer: BufferHandle,
    pub light_count: u32,
    pub directional_light_count: u32,
    pub local_lights: Arc<[LocalLight]>,
}

impl LightingSetupResult {
    pub fn local_light_count(&self) -> u32 {
        self.local_lights.len() as u32
    }
}

impl RenderPassData for LightingSetupResult {
    fn set_inputs(&self, pass: &mut PassBuilder<'_>) {
        pass.read_buffer("_LightData", self.light_buffer);
    }

    fn set_properties(&self, _ctx: &PassContext<'_>, cmd: &mut CommandBuffer) {
        cmd.set_global_int("_LightCount", self.light_count as i32);
        cmd.set_global_int("_DirectionalLightCount", self.directional_light_count as i32);
    }
}

pub struct LightingSetupInput<'a> {
    pub camera: &'a Camera,
    pub culling: &'a CullingResults,
    pub source: &'a dyn ShadowCasterSource,
}

/// Cube face stored at atlas face `face`
pub fn point_face_source(face: u32, convention_fix: bool) -> u32 {
    match (convention_fix, face) {
        (true, 2) => 3,
        (true, 3) => 2,
        _ => face,
    }
}

/// Negate row 1 of a point shadow view matrix
pub fn flip_point_view(view: Mat4) -> Mat4 {
    Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)) * view
}

pub struct LightingSetup {
    settings: ShadowSettings,
    requests: ShadowRequestPool,
}

impl LightingSetup {
    pub fn new(settings: ShadowSettings) -> Self {
        Self {
            settings,
            requests: ShadowRequestPool::default(),
        }
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ShadowSettings) {
        self.settings = settings;
    }

    /// Requests emitted by the last `render`; empty once released.
    pub fn shadow_requests(&self) -> &ShadowRequestSet {
        self.requests.inner()
    }

    /// Return this frame's requests to the pool.
    pub fn release_shadow_requests(&mut self) {
        self.requests.release();
    }

    fn directional_requests(
        &self,
        requests: &mut Vec<ShadowRequest>,
        index: usize,
        light: &VisibleLight,
        input: &LightingSetupInput<'_>,
    ) {
        let settings = &self.settings;
        let camera = input.camera;
        let far = camera.far().min(settings.shadow_distance);
        let splits = cascade_splits(camera.near(), far, settings.cascade_count, settings.cascade_split_lambda);
        let camera_planes = camera.frustum_planes();
        let direction = light.light.direction;

        for (cascade, range) in splits.windows(2).enumerate() {
            let output = if settings.close_fit {
                let corners = camera.frustum_corners(range[0], range[1]);
                let (view, projection) = close_fit_cascade(
                    direction,
                    &corners,
                    settings.directional_resolution,
                    settings.cascade_near_plane_offset,
                    settings.texel_snapping,
                );
                match merge_culling_planes(&(projection * view), &camera_planes, direction) {
                    Ok(culling_planes) => Some(ShadowCullingOutput {
                        view,
                        projection,
                        split: ShadowSplitData {
                            culling_sphere: cascade_culling_sphere(&corners),
                            culling_planes,
                        },
                    }),
                    Err(err) => {
                        log::warn!("cascade {cascade} of light {} has no culling planes: {err}", light.scene_index);
                        None
                    }
                }
            } else {
                input.source.directional_cascade(
                    index,
                    camera,
                    range[0],
                    range[1],
                    settings.directional_resolution,
                    settings.cascade_near_plane_offset,
                )
            };
            requests.push(make_request(
                input.source,
                index,
                LightType::Directional,
                cascade as u32,
                output,
                settings.directional_resolution,
            ));
        }
    }

    fn point_requests(
        &self,
        requests: &mut Vec<ShadowRequest>,
        index: usize,
        input: &LightingSetupInput<'_>,
    ) {
        let fix = self.settings.point_face_convention_fix;
        for face in 0..6 {
            let raw_face = point_face_source(face, fix);
            let output = input
                .source
                .point_face(index, raw_face, self.settings.point_near_plane)
                .map(|mut output| {
                    if fix {
                        output.view = flip_point_view(output.view);
                    }
                    output
                });
            requests.push(make_request(
                input.source,
                index,
                LightType::Point,
                face,
                output,
                self.settings.point_resolution,
            ));
        }
    }
}

fn make_request(
    source: &dyn ShadowCasterSource,
    visible_light_index: usize,
    light_type: LightType,
    face_or_cascade: u32,
    output: Option<ShadowCullingOutput>,
    resolution: u32,
) -> ShadowRequest {
    match output {
        Some(output) => {
            let (near, far) = projection_depth_range(&output.projection);
            ShadowRequest {
                is_valid: source.any_caster_inside(visible_light_index, &output.split.culling_planes),
                visible_light_index,
                light_type,
                view: output.view,
                projection: output.projection,
                split: output.split,
                face_or_cascade,
                atlas_matrix: atlas_matrix(&output.view, &output.projection),
                texel_size: texel_size(&output.projection, resolution, near, far),
            }
        }
        None => ShadowRequest {
            is_valid: false,
            visible_light_index,
            light_type,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            split: ShadowSplitData::default(),
            face_or_cascade,
            atlas_matrix: Mat4::IDENTITY,
            texel_size: Vec4::ZERO,
        },
    }
}

impl RenderFeature for LightingSetup {
    type Input<'a> = LightingSetupInput<'a>;

    fn name(&self) -> &'static str {
        "LightingSetup"
    }

    fn render(&mut self, graph: &mut RenderGraph, input: LightingSetupInput<'_>) {
        if self.requests.is_active() {
            log::warn!("shadow requests of the previous frame were never released");
            self.requests.release();
        }

        let visible = &input.culling.visible_lights;
        let mut set = std::mem::take(self.requests.activate());
        set.shadow_indices.resize(visible.len(), -1);

        for (index, light) in visible.iter().enumerate() {
            if !light.light.casts_shadows {
                continue;
            }
            if input.source.caster_bounds(index).is_none() {
                log::trace!("light {} casts shadows but has no casters this frame", light.scene_index);
                continue;
            }

            set.shadow_indices[index] = match light.light_type() {
                LightType::Directional => {
                    let base = set.directional.len() as i32;
                    self.directional_requests(&mut set.directional, index, light, &input);
                    base
                }
                LightType::Point => {
                    let base = set.point_light_count() as i32;
                    self.point_requests(&mut set.point, index, &input);
                    base
                }
                LightType::Spot => {
                    let output = input.source.spot(index, self.settings.point_near_plane);
                    set.spot.push(make_request(
                        input.source,
                        index,
                        LightType::Spot,
                        0,
                        output,
                        self.settings.spot_resolution,
                    ));
                    set.spot.len() as i32 - 1
                }
            };
        }

        let mut gpu_lights = Vec::with_capacity(visible.len());
        let mut local_lights = Vec::new();
        for directional in [true, false] {
            for (index, light) in visible.iter().enumerate() {
                if (light.light_type() == LightType::Directional) != directional {
                    continue;
                }
                if let Some(sphere) = light.light.bounding_sphere() {
                    local_lights.push(LocalLight {
                        light_index: gpu_lights.len() as u32,
                        sphere,
                        light_type: light.light_type(),
                    });
                }
                gpu_lights.push(light.light.to_gpu_data(set.shadow_indices[index]));
            }
        }

        log::trace!(
            "lighting setup: {} lights, {} shadow requests",
            gpu_lights.len(),
            set.request_count()
        );

        let result = LightingSetupResult {
            light_buffer: graph.get_buffer_with_data("LightData", &gpu_lights),
            light_count: gpu_lights.len() as u32,
            directional_light_count: (gpu_lights.len() - local_lights.len()) as u32,
            local_lights: local_lights.into(),
        };
        *self.requests.activate() = set;
        graph.set_resource(result, false);
    }

    fn cleanup(&mut self, _disposing: bool) {
        self.requests.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Aabb;
    use crate::pipeline::shadow_culling::DefaultShadowCulling;
    use crate::scene::Light;

    fn culling(lights: Vec<Light>, casters: Vec<Aabb>) -> CullingResults {
        CullingResults {
            visible_lights: lights
                .into_iter()
                .enumerate()
                .map(|(scene_index, light)| VisibleLight { scene_index, light })
                .collect(),
            shadow_casters: casters,
        }
    }

    fn run(setup: &mut LightingSetup, graph: &mut RenderGraph, culling: &CullingResults) {
        let camera = Camera::default();
        let source = DefaultShadowCulling::new(culling);
        setup.render(
            graph,
            LightingSetupInput {
                camera: &camera,
                culling,
                source: &source,
            },
        );
    }

    #[test]
    fn test_shadowed_light_without_casters_has_no_shadow() {
        let mut graph = RenderGraph::new();
        let mut setup = LightingSetup::new(ShadowSettings::default());
        let culling = culling(
            vec![Light::point(Vec3::ZERO, Vec3::ONE, 1.0, 5.0).with_shadows(true)],
            vec![],
        );
        run(&mut setup, &mut graph, &culling);

        assert_eq!(setup.shadow_requests().request_count(), 0);
        assert_eq!(setup.shadow_requests().shadow_indices, vec![-1]);
    }

    #[test]
    fn test_directional_lights_come_first_in_light_buffer() {
        let mut graph = RenderGraph::new();
        let mut setup = LightingSetup::new(ShadowSettings::default());
        let culling = culling(
            vec![
                Light::point(Vec3::ZERO, Vec3::ONE, 1.0, 5.0),
                Light::directional(-Vec3::Y, Vec3::ONE, 1.0),
                Light::spot(Vec3::ONE, -Vec3::Y, Vec3::ONE, 1.0, 8.0, 1.0),
            ],
            vec![],
        );
        run(&mut setup, &mut graph, &culling);

        let result = graph.get_resource::<LightingSetupResult>();
        assert_eq!(result.light_count, 3);
        assert_eq!(result.directional_light_count, 1);
        let indices: Vec<u32> = result.local_lights.iter().map(|l| l.light_index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(result.local_lights[1].light_type, LightType::Spot);
    }

    #[test]
    fn test_cascades_per_directional_light() {
        let mut graph = RenderGraph::new();
        let mut settings = ShadowSettings::default();
        settings.cascade_count = 3;
        let mut setup = LightingSetup::new(settings);
        let culling = culling(
            vec![Light::directional(Vec3::new(0.3, -1.0, 0.2), Vec3::ONE, 1.0).with_shadows(true)],
            vec![Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))],
        );
        run(&mut setup, &mut graph, &culling);

        let requests = setup.shadow_requests();
        assert_eq!(requests.directional.len(), 3);
        assert_eq!(requests.shadow_indices, vec![0]);
        let cascades: Vec<u32> = requests.directional.iter().map(|r| r.face_or_cascade).collect();
        assert_eq!(cascades, vec![0, 1, 2]);
        assert!(requests.directional[0].is_valid);
    }

    #[test]
    fn test_point_light_emits_six_faces_with_swapped_y_faces() {
        let mut graph = RenderGraph::new();
        let mut setup = LightingSetup::new(ShadowSettings::default());
        let position = Vec3::new(0.0, 1.0, -4.0);
        let culling = culling(
            vec![Light::point(position, Vec3::ONE, 1.0, 6.0).with_shadows(true)],
            vec![Aabb::new(position - Vec3::new(0.5, 3.0, 0.5), position - Vec3::new(-0.5, 2.0, -0.5))],
        );
        run(&mut setup, &mut graph, &culling);

        let requests = setup.shadow_requests();
        assert_eq!(requests.point.len(), 6);
        let source = DefaultShadowCulling::new(&culling);
        let raw = source.point_face(0, 3, 0.1).unwrap();
        assert_eq!(requests.point[2].view, flip_point_view(raw.view));

        // The caster sits below the light, only the -Y face sees it
        let valid: Vec<bool> = requests.point.iter().map(|r| r.is_valid).collect();
        assert_eq!(valid, vec![false, false, true, false, false, false]);
    }

    #[test]
    fn test_release_empties_requests() {
        let mut graph = RenderGraph::new();
        let mut setup = LightingSetup::new(ShadowSettings::default());
        let culling = culling(
            vec![Light::spot(Vec3::ZERO, -Vec3::Y, Vec3::ONE, 1.0, 8.0, 1.0).with_shadows(true)],
            vec![Aabb::new(Vec3::new(-1.0, -3.0, -1.0), Vec3::new(1.0, -2.0, 1.0))],
        );
        run(&mut setup, &mut graph, &culling);
        assert_eq!(setup.shadow_requests().spot.len(), 1);
        assert_eq!(setup.shadow_requests().shadow_indices, vec![0]);

        setup.release_shadow_requests();
        assert_eq!(setup.shadow_requests().request_count(), 0);
    }
}
