//! Shadow projection fitting
//!
//! Cascade split distances, tight ("close fit") directional cascades and the
//! matrices and descriptors the lighting shader needs to sample a slice.

use crate::error::GraphResult;
use crate::math::{frustum_planes, Aabb, Plane, Sphere};
use crate::pipeline::shadow_request::CullingPlanes;
use glam::{Mat4, Vec3, Vec4};

/// Split distances of `count` cascades between `near` and `far`.
///
/// Blends uniform and logarithmic spacing by `lambda` (0 = uniform,
/// 1 = logarithmic). Returns `count + 1` distances starting at `near`.
pub fn cascade_splits(near: f32, far: f32, count: u32, lambda: f32) -> Vec<f32> {
    let count = count.max(1);
    (0..=count)
        .map(|i| {
            let t = i as f32 / count as f32;
            let log = near * (far / near).powf(t);
            let uniform = near + (far - near) * t;
            lambda * log + (1.0 - lambda) * uniform
        })
        .collect()
}

/// An up vector that is not parallel to `direction`
pub fn stable_up(direction: Vec3) -> Vec3 {
    if direction.normalize().dot(Vec3::Y).abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

/// Rotation-only view looking along the light direction
pub fn directional_light_view(direction: Vec3) -> Mat4 {
    Mat4::look_at_rh(Vec3::ZERO, direction.normalize(), stable_up(direction))
}

/// Tight orthographic fit around cascade frustum corners.
///
/// The near plane is pulled back towards the light by `near_plane_offset` so
/// casters between the light and the slice still land in the map. With
/// `texel_snapping` the x/y bounds move in whole texel increments, which keeps
/// the shadow stable while the camera translates.
pub fn close_fit_cascade(
    direction: Vec3,
    corners: &[Vec3; 8],
    resolution: u32,
    near_plane_offset: f32,
    texel_snapping: bool,
) -> (Mat4, Mat4) {
    let view = directional_light_view(direction);
    let light_space: Vec<Vec3> = corners.iter().map(|c| view.transform_point3(*c)).collect();
    let bounds = Aabb::from_points(&light_space).unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO));

    let (mut min, mut max) = (bounds.min, bounds.max);
    if texel_snapping {
        let resolution = resolution.max(1) as f32;
        let texel_x = ((max.x - min.x) / resolution).max(f32::EPSILON);
        let texel_y = ((max.y - min.y) / resolution).max(f32::EPSILON);
        min.x = (min.x / texel_x).floor() * texel_x;
        max.x = (max.x / texel_x).ceil() * texel_x;
        min.y = (min.y / texel_y).floor() * texel_y;
        max.y = (max.y / texel_y).ceil() * texel_y;
    }

    // View space looks down -Z: the closest corner has the largest z
    let near = -max.z - near_plane_offset;
    let far = -min.z;
    let projection = Mat4::orthographic_rh(min.x, max.x, min.y, max.y, near, far);
    (view, projection)
}

/// Culling planes of a close-fit cascade: the light frustum's planes except
/// its near plane, plus every camera plane the light does not shine into.
///
/// A camera plane whose inward normal points along the light direction is
/// skipped: casters behind it can still throw shadows into the slice.
pub fn merge_culling_planes(
    light_view_projection: &Mat4,
    camera_planes: &[Plane; 6],
    direction: Vec3,
) -> GraphResult<CullingPlanes> {
    let [left, right, bottom, top, _near, far] = frustum_planes(light_view_projection);
    let mut planes = CullingPlanes::from_planes(&[left, right, bottom, top, far])?;

    for plane in camera_planes {
        if plane.normal.dot(direction) > 0.0 {
            continue;
        }
        if planes.push(*plane).is_err() {
            log::debug!("cascade culling planes full, dropping camera plane");
            break;
        }
    }
    Ok(planes)
}

/// Culling sphere around a cascade slice, as (center, radius)
pub fn cascade_culling_sphere(corners: &[Vec3; 8]) -> Vec4 {
    let sphere = Sphere::enclosing(corners);
    sphere.center.extend(sphere.radius)
}

/// Clip space [-1, 1] to texture space [0, 1]
pub fn texture_scale_bias() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(0.5, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 0.5, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.5, 0.5, 0.0, 1.0),
    )
}

/// World to shadow-map texture space for one slice
pub fn atlas_matrix(view: &Mat4, projection: &Mat4) -> Mat4 {
    texture_scale_bias() * *projection * *view
}

/// `(texel width, texel height, near, far)` of a shadow slice.
///
/// For orthographic projections the width is in world units; for perspective
/// ones it is the texel footprint at unit distance.
pub fn texel_size(projection: &Mat4, resolution: u32, near: f32, far: f32) -> Vec4 {
    let resolution = resolution.max(1) as f32;
    Vec4::new(
        2.0 / (projection.x_axis.x * resolution),
        2.0 / (projection.y_axis.y * resolution),
        near,
        far,
    )
}

/// Near and far planes encoded in an orthographic or perspective `[0, 1]` projection
pub fn projection_depth_range(projection: &Mat4) -> (f32, f32) {
    let (m22, m32) = (projection.z_axis.z, projection.w_axis.z);
    if projection.w_axis.w == 1.0 {
        // orthographic_rh: z' = m22·z + m32, near -> 0, far -> 1
        let near = m32 / m22;
        let far = (m32 - 1.0) / m22;
        (near, far)
    } else {
        // perspective_rh: z' = (m22·z + m32) / -z
        let near = m32 / m22;
        let far = m32 / (m22 + 1.0);
        (near, far)
    }
}
