//! Geometry helpers shared by light culling and shadow fitting
//!
//! View space follows glam's right-handed convention: the camera looks down
//! -Z and projections map depth to [0, 1].

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Plane `dot(normal, p) + distance = 0`; the positive side is "inside".
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Build from `(a, b, c, d)` coefficients and normalize.
    pub fn from_vec4(v: Vec4) -> Self {
        let length = v.truncate().length();
        if length <= f32::EPSILON {
            return Self::new(v.truncate(), v.w);
        }
        Self::new(v.truncate() / length, v.w / length)
    }

    pub fn to_vec4(&self) -> Vec4 {
        self.normal.extend(self.distance)
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    pub fn flipped(&self) -> Self {
        Self::new(-self.normal, -self.distance)
    }
}

/// Extract the six frustum planes of a `[0, 1]` depth view-projection
/// matrix, normals pointing inward, in the order
/// left, right, bottom, top, near, far.
pub fn frustum_planes(view_projection: &Mat4) -> [Plane; 6] {
    let r0 = view_projection.row(0);
    let r1 = view_projection.row(1);
    let r2 = view_projection.row(2);
    let r3 = view_projection.row(3);
    [
        Plane::from_vec4(r3 + r0),
        Plane::from_vec4(r3 - r0),
        Plane::from_vec4(r3 + r1),
        Plane::from_vec4(r3 - r1),
        Plane::from_vec4(r2),
        Plane::from_vec4(r3 - r2),
    ]
}

/// World-space corners of a `[0, 1]` depth frustum: near face first
/// (bottom-left, bottom-right, top-right, top-left), then the far face.
pub fn frustum_corners(view_projection: &Mat4) -> [Vec3; 8] {
    let inverse = view_projection.inverse();
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let z = if i < 4 { 0.0 } else { 1.0 };
        let (x, y) = match i % 4 {
            0 => (-1.0, -1.0),
            1 => (1.0, -1.0),
            2 => (1.0, 1.0),
            _ => (-1.0, 1.0),
        };
        *corner = inverse.project_point3(Vec3::new(x, y, z));
    }
    corners
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Smallest sphere around the points' centroid containing all of them
    pub fn enclosing(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::new(Vec3::ZERO, 0.0);
        }
        let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0f32, f32::max);
        Self::new(center, radius)
    }

    pub fn is_outside(&self, plane: &Plane) -> bool {
        plane.signed_distance(self.center) < -self.radius
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        Some(points.iter().skip(1).fold(Self::new(first, first), |acc, p| Self {
            min: acc.min.min(*p),
            max: acc.max.max(*p),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }

    /// Bounds of the eight corners after an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let corners = self.corners().map(|c| matrix.transform_point3(c));
        let mut result = Aabb::new(corners[0], corners[0]);
        for c in &corners[1..] {
            result.min = result.min.min(*c);
            result.max = result.max.max(*c);
        }
        result
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let closest = sphere.center.clamp(self.min, self.max);
        closest.distance_squared(sphere.center) <= sphere.radius * sphere.radius
    }

    /// Whether the box lies entirely on the negative side of `plane`
    pub fn is_outside(&self, plane: &Plane) -> bool {
        let radius = self.extents().dot(plane.normal.abs());
        plane.signed_distance(self.center()) < -radius
    }
}

/// Real roots of `a·x² + b·x + c = 0`, ascending.
///
/// `None` for a negative discriminant or a degenerate (`a == 0`) equation;
/// callers decide whether that means "no intersection" or "unbounded".
pub fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    if a.abs() <= f32::EPSILON {
        return None;
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    // Avoid cancellation between -b and the root
    let q = -0.5 * (b + b.signum() * root);
    let (x0, x1) = if q.abs() <= f32::EPSILON {
        let x = -b / (2.0 * a);
        (x, x)
    } else {
        (q / a, c / q)
    };
    Some((x0.min(x1), x0.max(x1)))
}

/// Normalized-device-coordinate rectangle covered by a view-space sphere
/// under a perspective projection, clamped to `[-1, 1]`.
///
/// Returns `None` when the sphere is entirely behind the camera. A sphere
/// containing the camera plane covers the whole screen.
pub fn projected_sphere_bounds(center: Vec3, radius: f32, projection: &Mat4) -> Option<(Vec2, Vec2)> {
    let depth = -center.z;
    if depth + radius <= 0.0 {
        return None;
    }
    if depth <= radius {
        return Some((Vec2::splat(-1.0), Vec2::splat(1.0)));
    }

    let scale = Vec2::new(projection.x_axis.x, projection.y_axis.y);
    let axis_bounds = |offset: f32, scale: f32| -> (f32, f32) {
        // Slopes k of the tangent lines offset = k·depth around the circle
        let a = depth * depth - radius * radius;
        let b = -2.0 * offset * depth;
        let c = offset * offset - radius * radius;
        match solve_quadratic(a, b, c) {
            Some((k0, k1)) => ((k0 * scale).max(-1.0), (k1 * scale).min(1.0)),
            None => (-1.0, 1.0),
        }
    };

    let (min_x, max_x) = axis_bounds(center.x, scale.x);
    let (min_y, max_y) = axis_bounds(center.y, scale.y);
    if min_x > max_x || min_y > max_y {
        return None;
    }
    Some((Vec2::new(min_x, min_y), Vec2::new(max_x, max_y)))
}
