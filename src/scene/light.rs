//! Light types for the scene

use crate::math::{Aabb, Plane, Sphere};
use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    Directional,
    Point,
    Spot,
}

impl LightType {
    /// Type tag stored in `GpuLightData::direction_type.w`
    pub fn gpu_tag(&self) -> f32 {
        match self {
            LightType::Point => 0.0,
            LightType::Spot => 1.0,
            LightType::Directional => 2.0,
        }
    }
}

/// A light as authored in the scene
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub light_type: LightType,
    pub position: Vec3,
    /// Direction the light travels; unused for point lights
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Attenuation range for point and spot lights
    pub range: f32,
    /// Full outer cone angle in radians
    pub spot_angle: f32,
    /// Full inner cone angle in radians
    pub inner_spot_angle: f32,
    pub casts_shadows: bool,
}

impl Light {
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            position: Vec3::ZERO,
            direction: direction.normalize(),
            color,
            intensity,
            range: f32::INFINITY,
            spot_angle: 0.0,
            inner_spot_angle: 0.0,
            casts_shadows: false,
        }
    }

    pub fn point(position: Vec3, color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            direction: -Vec3::Y,
            color,
            intensity,
            range,
            spot_angle: 0.0,
            inner_spot_angle: 0.0,
            casts_shadows: false,
        }
    }

    pub fn spot(
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        range: f32,
        spot_angle: f32,
    ) -> Self {
        Self {
            light_type: LightType::Spot,
            position,
            direction: direction.normalize(),
            color,
            intensity,
            range,
            spot_angle,
            inner_spot_angle: spot_angle * 0.8,
            casts_shadows: false,
        }
    }

    pub fn with_shadows(mut self, casts_shadows: bool) -> Self {
        self.casts_shadows = casts_shadows;
        self
    }

    /// Bounding sphere of the lit volume; `None` for directional lights
    pub fn bounding_sphere(&self) -> Option<Sphere> {
        match self.light_type {
            LightType::Directional => None,
            LightType::Point | LightType::Spot => Some(Sphere::new(self.position, self.range)),
        }
    }

    /// Convert to GPU data format
    pub fn to_gpu_data(&self, shadow_index: i32) -> GpuLightData {
        let range = if self.light_type == LightType::Directional {
            0.0
        } else {
            self.range
        };
        GpuLightData {
            position: self.position.extend(range),
            color_intensity: self.color.extend(self.intensity),
            direction_type: self.direction.extend(self.light_type.gpu_tag()),
            spot_params: Vec4::new(
                (self.inner_spot_angle * 0.5).cos(),
                (self.spot_angle * 0.5).cos(),
                shadow_index as f32,
                0.0,
            ),
        }
    }
}

/// A light that survived camera culling this frame
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleLight {
    /// Index into the scene's light list
    pub scene_index: usize,
    pub light: Light,
}

impl VisibleLight {
    pub fn light_type(&self) -> LightType {
        self.light.light_type
    }
}

/// Per-camera visibility: visible lights and the bounds of shadow casters
#[derive(Debug, Clone, Default)]
pub struct CullingResults {
    pub visible_lights: Vec<VisibleLight>,
    pub shadow_casters: Vec<Aabb>,
}

impl CullingResults {
    /// Keep directional lights and every local light whose range touches the frustum.
    pub fn cull(frustum: &[Plane; 6], lights: &[Light], shadow_casters: &[Aabb]) -> Self {
        let visible_lights = lights
            .iter()
            .enumerate()
            .filter(|(_, light)| match light.bounding_sphere() {
                Some(sphere) => !frustum.iter().any(|plane| sphere.is_outside(plane)),
                None => true,
            })
            .map(|(scene_index, light)| VisibleLight {
                scene_index,
                light: light.clone(),
            })
            .collect();

        Self {
            visible_lights,
            shadow_casters: shadow_casters.to_vec(),
        }
    }
}

/// GPU-friendly light data structure
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuLightData {
    /// xyz = position, w = range
    pub position: Vec4,
    /// xyz = color, w = intensity
    pub color_intensity: Vec4,
    /// xyz = direction, w = light type (0=point, 1=spot, 2=directional)
    pub direction_type: Vec4,
    /// x = cos(inner half angle), y = cos(outer half angle), z = shadow index or -1
    pub spot_params: Vec4,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::frustum_planes;
    use glam::Mat4;

    #[test]
    fn test_gpu_data_carries_shadow_index() {
        let light = Light::spot(Vec3::ZERO, -Vec3::Y, Vec3::ONE, 2.0, 10.0, 1.0);
        let data = light.to_gpu_data(-1);
        assert_eq!(data.spot_params.z, -1.0);
        assert_eq!(data.direction_type.w, 1.0);
        assert_eq!(data.position.w, 10.0);
    }

    #[test]
    fn test_cull_drops_lights_outside_frustum() {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        let frustum = frustum_planes(&(proj * view));
        let lights = [
            Light::point(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE, 1.0, 2.0),
            Light::point(Vec3::new(0.0, 0.0, 20.0), Vec3::ONE, 1.0, 2.0),
            Light::directional(-Vec3::Y, Vec3::ONE, 1.0),
        ];

        let culling = CullingResults::cull(&frustum, &lights, &[]);
        let indices: Vec<usize> = culling.visible_lights.iter().map(|l| l.scene_index).collect();
        assert_eq!(indices, vec![0, 2]);
    }
}
