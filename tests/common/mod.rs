//! Shared helpers for integration tests.

#![allow(dead_code)]

use frame_graph::backend::{Command, CommandBuffer};
use frame_graph::math::Aabb;
use frame_graph::scene::{Camera, Light, Projection, Scene};
use glam::Vec3;

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Camera at the origin looking down -Z with the given depth range.
pub fn forward_camera(near: f32, far: f32) -> Camera {
    Camera::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0))
        .with_projection(Projection::perspective(60.0, 16.0 / 9.0, near, far))
}

/// Scene with a floor caster, a shadowed sun, one shadowed point light and
/// one shadowed spot light, all in front of the camera.
pub fn lit_scene() -> Scene {
    let mut scene = Scene::new();
    scene.camera = Camera::new(Vec3::new(0.0, 4.0, 10.0), Vec3::ZERO);
    scene.add_shadow_caster(Aabb::new(Vec3::new(-10.0, -0.5, -10.0), Vec3::new(10.0, 0.0, 10.0)));
    scene.add_shadow_caster(Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 2.0, 1.0)));
    scene.add_light(Light::directional(Vec3::new(0.3, -1.0, 0.2), Vec3::ONE, 3.0).with_shadows(true));
    scene.add_light(Light::point(Vec3::new(2.0, 3.0, 0.0), Vec3::new(1.0, 0.8, 0.6), 10.0, 8.0).with_shadows(true));
    scene.add_light(
        Light::spot(Vec3::new(-3.0, 5.0, 0.0), -Vec3::Y, Vec3::ONE, 20.0, 12.0, 45f32.to_radians()).with_shadows(true),
    );
    scene
}

pub fn count_commands(cmd: &CommandBuffer, predicate: impl Fn(&Command) -> bool) -> usize {
    cmd.commands().iter().filter(|c| predicate(c)).count()
}
