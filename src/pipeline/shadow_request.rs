//! Shadow render requests
//!
//! `LightingSetup` turns every shadowed visible light into requests (one per
//! cascade, cube face or spot light) each frame. `ShadowRenderer` consumes
//! them and the list goes back to its pool, keeping its capacity.

use crate::error::{GraphError, GraphResult};
use crate::math::Plane;
use crate::scene::LightType;
use glam::{Mat4, Vec4};

/// Maximum number of culling planes per shadow split
pub const MAX_CULLING_PLANES: usize = 10;

/// Fixed-capacity inline plane list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullingPlanes {
    planes: [Plane; MAX_CULLING_PLANES],
    count: usize,
}

impl Default for CullingPlanes {
    fn default() -> Self {
        Self {
            planes: [Plane::default(); MAX_CULLING_PLANES],
            count: 0,
        }
    }
}

impl CullingPlanes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_planes(planes: &[Plane]) -> GraphResult<Self> {
        let mut result = Self::new();
        for plane in planes {
            result.push(*plane)?;
        }
        Ok(result)
    }

    /// Append a plane; fails once all slots are used.
    pub fn push(&mut self, plane: Plane) -> GraphResult<()> {
        if self.count == MAX_CULLING_PLANES {
            return Err(GraphError::InvalidArgument(format!(
                "culling plane list is full ({MAX_CULLING_PLANES})"
            )));
        }
        self.planes[self.count] = plane;
        self.count += 1;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Plane> {
        self.as_slice().get(index)
    }

    pub fn set(&mut self, index: usize, plane: Plane) -> GraphResult<()> {
        if index >= self.count {
            return Err(GraphError::InvalidArgument(format!(
                "culling plane {index} out of range ({})",
                self.count
            )));
        }
        self.planes[index] = plane;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == MAX_CULLING_PLANES
    }

    pub fn as_slice(&self) -> &[Plane] {
        &self.planes[..self.count]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plane> {
        self.as_slice().iter()
    }
}

/// Culling volume of one shadow split
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShadowSplitData {
    /// xyz = center, w = radius
    pub culling_sphere: Vec4,
    pub culling_planes: CullingPlanes,
}

/// One shadow map slice to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowRequest {
    /// False when the slice exists but nothing can be drawn into it
    pub is_valid: bool,
    pub visible_light_index: usize,
    pub light_type: LightType,
    pub view: Mat4,
    pub projection: Mat4,
    pub split: ShadowSplitData,
    /// Cascade index for directional lights, cube face for point lights
    pub face_or_cascade: u32,
    /// World to shadow-map texture space
    pub atlas_matrix: Mat4,
    /// (texel width, texel height, near, far)
    pub texel_size: Vec4,
}

/// Types that can be cleared for reuse while keeping their allocations
pub trait Poolable {
    fn new_empty() -> Self;

    fn reset(&mut self);
}

/// Single value that alternates between active use and a cleared, pooled state
#[derive(Debug)]
pub struct Pooled<T: Poolable> {
    value: T,
    active: bool,
}

impl<T: Poolable> Pooled<T> {
    /// Make the value active and return it. A pooled value is already cleared.
    pub fn activate(&mut self) -> &mut T {
        self.active = true;
        &mut self.value
    }

    /// Clear the value and return it to the pool. No-op when already pooled.
    pub fn release(&mut self) {
        if self.active {
            self.value.reset();
            self.active = false;
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn get(&self) -> Option<&T> {
        self.active.then_some(&self.value)
    }

    /// The value regardless of state; empty while pooled.
    pub fn inner(&self) -> &T {
        &self.value
    }
}

impl<T: Poolable> Default for Pooled<T> {
    fn default() -> Self {
        Self {
            value: T::new_empty(),
            active: false,
        }
    }
}

/// All requests of one frame, grouped by the atlas they render into
#[derive(Debug, Default)]
pub struct ShadowRequestSet {
    /// Cascades, grouped per light
    pub directional: Vec<ShadowRequest>,
    /// Six faces per light, in atlas face order
    pub point: Vec<ShadowRequest>,
    pub spot: Vec<ShadowRequest>,
    /// Atlas index per visible light, -1 for no shadow
    pub shadow_indices: Vec<i32>,
}

impl ShadowRequestSet {
    pub fn request_count(&self) -> usize {
        self.directional.len() + self.point.len() + self.spot.len()
    }

    pub fn point_light_count(&self) -> usize {
        self.point.len() / 6
    }

    /// Requests emitted for one visible light
    pub fn requests_for_light(&self, visible_light_index: usize) -> impl Iterator<Item = &ShadowRequest> {
        self.directional
            .iter()
            .chain(&self.point)
            .chain(&self.spot)
            .filter(move |r| r.visible_light_index == visible_light_index)
    }
}

impl Poolable for ShadowRequestSet {
    fn new_empty() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.directional.clear();
        self.point.clear();
        self.spot.clear();
        self.shadow_indices.clear();
    }
}

pub type ShadowRequestPool = Pooled<ShadowRequestSet>;

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn request(index: usize) -> ShadowRequest {
        ShadowRequest {
            is_valid: true,
            visible_light_index: index,
            light_type: LightType::Spot,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            split: ShadowSplitData::default(),
            face_or_cascade: 0,
            atlas_matrix: Mat4::IDENTITY,
            texel_size: Vec4::ZERO,
        }
    }

    #[test]
    fn test_culling_planes_capacity() {
        let mut planes = CullingPlanes::new();
        for i in 0..MAX_CULLING_PLANES {
            planes.push(Plane::new(Vec3::X, i as f32)).unwrap();
        }
        assert!(planes.is_full());
        assert!(planes.push(Plane::new(Vec3::Y, 0.0)).is_err());
        assert_eq!(planes.get(3).map(|p| p.distance), Some(3.0));
        assert!(planes.get(MAX_CULLING_PLANES).is_none());
    }

    #[test]
    fn test_culling_planes_set_bounds_checked() {
        let mut planes = CullingPlanes::from_planes(&[Plane::new(Vec3::X, 0.0)]).unwrap();
        assert!(planes.set(0, Plane::new(Vec3::Y, 1.0)).is_ok());
        assert!(planes.set(1, Plane::new(Vec3::Y, 1.0)).is_err());
        assert_eq!(planes.len(), 1);
    }

    #[test]
    fn test_pool_release_keeps_capacity() {
        let mut pool = ShadowRequestPool::default();
        assert!(pool.get().is_none());

        let set = pool.activate();
        set.spot.extend((0..8).map(request));
        assert_eq!(pool.get().map(ShadowRequestSet::request_count), Some(8));

        pool.release();
        assert!(!pool.is_active());
        assert!(pool.inner().spot.is_empty());
        assert!(pool.inner().spot.capacity() >= 8);
    }

    #[test]
    fn test_requests_for_light() {
        let mut set = ShadowRequestSet::default();
        set.spot.push(request(0));
        set.spot.push(request(2));
        assert_eq!(set.requests_for_light(2).count(), 1);
        assert_eq!(set.requests_for_light(1).count(), 0);
    }
}
