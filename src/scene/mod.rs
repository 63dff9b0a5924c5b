//! Scene management

mod camera;
mod light;

pub use camera::*;
pub use light::*;

use crate::math::Aabb;
use glam::Vec3;

/// The scene containing lights and shadow-casting geometry bounds
pub struct Scene {
    pub camera: Camera,
    pub lights: Vec<Light>,
    /// World-space bounds of every shadow-casting object
    pub shadow_casters: Vec<Aabb>,
    pub ambient_light: Vec3,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            camera: Camera::default(),
            lights: Vec::new(),
            shadow_casters: Vec::new(),
            ambient_light: Vec3::new(0.03, 0.03, 0.03),
        }
    }

    /// Add a light to the scene
    pub fn add_light(&mut self, light: Light) -> usize {
        let id = self.lights.len();
        self.lights.push(light);
        id
    }

    pub fn add_shadow_caster(&mut self, bounds: Aabb) {
        self.shadow_casters.push(bounds);
    }

    /// Get the number of point/spot lights
    pub fn local_light_count(&self) -> usize {
        self.lights
            .iter()
            .filter(|l| l.light_type != LightType::Directional)
            .count()
    }

    /// Cull lights against the scene camera
    pub fn cull(&self) -> CullingResults {
        CullingResults::cull(
            &self.camera.frustum_planes(),
            &self.lights,
            &self.shadow_casters,
        )
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
