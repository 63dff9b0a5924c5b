//! Shadow caster culling primitives
//!
//! [`ShadowCasterSource`] is what the lighting setup asks for light-space
//! matrices, split culling volumes and caster visibility. The default
//! implementation works from per-frame [`CullingResults`].

use crate::math::{frustum_planes, Aabb, Sphere};
use crate::pipeline::shadow_fit::{directional_light_view, stable_up};
use crate::pipeline::shadow_request::{CullingPlanes, ShadowSplitData};
use crate::scene::{Camera, CullingResults, LightType, VisibleLight};
use glam::{Mat4, Vec3};

/// Cube face look directions and up vectors in cubemap face order
/// (+X, -X, +Y, -Y, +Z, -Z)
pub const CUBE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Y),
    (Vec3::NEG_X, Vec3::NEG_Y),
    (Vec3::Y, Vec3::Z),
    (Vec3::NEG_Y, Vec3::NEG_Z),
    (Vec3::Z, Vec3::NEG_Y),
    (Vec3::NEG_Z, Vec3::NEG_Y),
];

/// Matrices and culling volume of one shadow split
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowCullingOutput {
    pub view: Mat4,
    pub projection: Mat4,
    pub split: ShadowSplitData,
}

impl ShadowCullingOutput {
    fn from_matrices(view: Mat4, projection: Mat4, sphere: Sphere) -> Self {
        let planes = frustum_planes(&(projection * view));
        Self {
            view,
            projection,
            split: ShadowSplitData {
                culling_sphere: sphere.center.extend(sphere.radius),
                culling_planes: CullingPlanes::from_planes(&planes).unwrap_or_default(),
            },
        }
    }
}

/// Source of shadow matrices and caster visibility for visible lights
pub trait ShadowCasterSource {
    /// Bounds of every caster that can shadow from this light, `None` if there are none
    fn caster_bounds(&self, visible_light_index: usize) -> Option<Aabb>;

    /// Whether any caster of this light lies inside the culling planes
    fn any_caster_inside(&self, visible_light_index: usize, planes: &CullingPlanes) -> bool {
        self.caster_bounds(visible_light_index)
            .map(|bounds| !planes.iter().any(|plane| bounds.is_outside(plane)))
            .unwrap_or(false)
    }

    /// Standard (sphere-fit) cascade for a directional light
    fn directional_cascade(
        &self,
        visible_light_index: usize,
        camera: &Camera,
        split_near: f32,
        split_far: f32,
        resolution: u32,
        near_plane_offset: f32,
    ) -> Option<ShadowCullingOutput>;

    /// One cube face of a point light, in raw cubemap face order
    fn point_face(&self, visible_light_index: usize, face: u32, near_plane: f32) -> Option<ShadowCullingOutput>;

    fn spot(&self, visible_light_index: usize, near_plane: f32) -> Option<ShadowCullingOutput>;
}

/// Culling against the frame's caster bounds
pub struct DefaultShadowCulling<'a> {
    culling: &'a CullingResults,
}

impl<'a> DefaultShadowCulling<'a> {
    pub fn new(culling: &'a CullingResults) -> Self {
        Self { culling }
    }

    fn light(&self, index: usize, light_type: LightType) -> Option<&'a VisibleLight> {
        self.culling
            .visible_lights
            .get(index)
            .filter(|light| light.light_type() == light_type)
    }

    fn relevant_casters(&self, index: usize) -> impl Iterator<Item = &'a Aabb> + 'a {
        let reach = self
            .culling
            .visible_lights
            .get(index)
            .map(|light| light.light.bounding_sphere());
        self.culling
            .shadow_casters
            .iter()
            .filter(move |caster| match reach {
                Some(Some(sphere)) => caster.intersects_sphere(&sphere),
                Some(None) => true,
                None => false,
            })
    }
}

impl ShadowCasterSource for DefaultShadowCulling<'_> {
    fn caster_bounds(&self, visible_light_index: usize) -> Option<Aabb> {
        self.relevant_casters(visible_light_index)
            .copied()
            .reduce(|a, b| a.union(&b))
    }

    fn any_caster_inside(&self, visible_light_index: usize, planes: &CullingPlanes) -> bool {
        self.relevant_casters(visible_light_index)
            .any(|caster| !planes.iter().any(|plane| caster.is_outside(plane)))
    }

    fn directional_cascade(
        &self,
        visible_light_index: usize,
        camera: &Camera,
        split_near: f32,
        split_far: f32,
        resolution: u32,
        near_plane_offset: f32,
    ) -> Option<ShadowCullingOutput> {
        let light = self.light(visible_light_index, LightType::Directional)?;
        let corners = camera.frustum_corners(split_near, split_far);
        let sphere = Sphere::enclosing(&corners);
        let radius = sphere.radius.max(f32::EPSILON);

        let view = directional_light_view(light.light.direction);
        let mut center = view.transform_point3(sphere.center);
        let texel = 2.0 * radius / resolution.max(1) as f32;
        center.x = (center.x / texel).floor() * texel;
        center.y = (center.y / texel).floor() * texel;

        let projection = Mat4::orthographic_rh(
            center.x - radius,
            center.x + radius,
            center.y - radius,
            center.y + radius,
            -center.z - radius - near_plane_offset,
            -center.z + radius,
        );
        Some(ShadowCullingOutput::from_matrices(view, projection, sphere))
    }

    fn point_face(&self, visible_light_index: usize, face: u32, near_plane: f32) -> Option<ShadowCullingOutput> {
        let light = &self.light(visible_light_index, LightType::Point)?.light;
        let (direction, up) = *CUBE_FACES.get(face as usize)?;
        let view = Mat4::look_at_rh(light.position, light.position + direction, up);
        let projection = Mat4::perspective_rh(
            std::f32::consts::FRAC_PI_2,
            1.0,
            near_plane,
            light.range.max(near_plane * 2.0),
        );
        Some(ShadowCullingOutput::from_matrices(
            view,
            projection,
            Sphere::new(light.position, light.range),
        ))
    }

    fn spot(&self, visible_light_index: usize, near_plane: f32) -> Option<ShadowCullingOutput> {
        let light = &self.light(visible_light_index, LightType::Spot)?.light;
        let view = Mat4::look_at_rh(
            light.position,
            light.position + light.direction,
            stable_up(light.direction),
        );
        let projection = Mat4::perspective_rh(
            light.spot_angle.max(1f32.to_radians()),
            1.0,
            near_plane,
            light.range.max(near_plane * 2.0),
        );
        Some(ShadowCullingOutput::from_matrices(
            view,
            projection,
            Sphere::new(light.position, light.range),
        ))
    }
}
