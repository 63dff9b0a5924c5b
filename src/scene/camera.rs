//! Viewing camera
//!
//! The camera supplies the view matrix, the depth range the clusters and
//! cascades are split over, and the slice corners and planes shadow fitting
//! works with.

use crate::math::{frustum_corners, frustum_planes, Plane};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// View-to-clip mapping of a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    /// Box centered on the view axis
    Orthographic { half_extent: Vec2, near: f32, far: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Self::perspective(45.0, 16.0 / 9.0, 0.3, 1000.0)
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        Self::Orthographic {
            half_extent: Vec2::new(width, height) * 0.5,
            near,
            far,
        }
    }

    /// `(near, far)` view distances
    pub fn depth_range(&self) -> (f32, f32) {
        match *self {
            Self::Perspective { near, far, .. } | Self::Orthographic { near, far, .. } => (near, far),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let (near, far) = self.depth_range();
        self.matrix_with_range(near, far)
    }

    /// The same projection clipped to another depth range, e.g. one cascade
    pub fn matrix_with_range(&self, near: f32, far: f32) -> Mat4 {
        match *self {
            Self::Perspective { fov_y, aspect, .. } => Mat4::perspective_rh(fov_y, aspect, near, far),
            Self::Orthographic { half_extent, .. } => {
                Mat4::orthographic_rh(-half_extent.x, half_extent.x, -half_extent.y, half_extent.y, near, far)
            }
        }
    }

    pub fn is_perspective(&self) -> bool {
        matches!(self, Self::Perspective { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO)
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    pub fn near(&self) -> f32 {
        self.projection.depth_range().0
    }

    pub fn far(&self) -> f32 {
        self.projection.depth_range().1
    }

    /// Inward-facing world-space frustum planes: left, right, bottom, top, near, far
    pub fn frustum_planes(&self) -> [Plane; 6] {
        frustum_planes(&(self.projection_matrix() * self.view_matrix()))
    }

    /// World-space corners of the frustum slice between two view distances
    pub fn frustum_corners(&self, near: f32, far: f32) -> [Vec3; 8] {
        frustum_corners(&(self.projection.matrix_with_range(near, far) * self.view_matrix()))
    }

    /// Match a perspective projection to the target size. Orthographic
    /// extents are left alone.
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if let Projection::Perspective { aspect, .. } = &mut self.projection {
            *aspect = width / height;
        }
    }

    pub fn uniform_data(&self) -> CameraUniformData {
        let view = self.view_matrix();
        let proj = self.projection_matrix();
        let (near, far) = self.projection.depth_range();
        CameraUniformData {
            view,
            proj,
            view_proj: proj * view,
            inv_view: view.inverse(),
            inv_proj: proj.inverse(),
            position: self.position.extend(1.0),
            depth_params: Vec4::new(near, far, far / near, f32::from(u8::from(self.projection.is_perspective()))),
        }
    }
}

/// `_CameraData` constant buffer layout
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniformData {
    pub view: Mat4,
    pub proj: Mat4,
    pub view_proj: Mat4,
    pub inv_view: Mat4,
    pub inv_proj: Mat4,
    pub position: Vec4,
    /// near, far, far / near, 1 for perspective or 0 for orthographic
    pub depth_params: Vec4,
}
