//! Renderer configuration
//!
//! Plain serde structs with defaults; load from or save to TOML.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where cluster light lists are built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAssignment {
    /// Compute dispatch with a per-cell atomic counter
    #[default]
    Gpu,
    /// Built on the CPU and uploaded
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Screen tile size in pixels
    pub tile_size: u32,
    /// Number of logarithmic depth slices
    pub cluster_depth: u32,
    pub max_lights_per_tile: u32,
    pub assignment: ClusterAssignment,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            tile_size: 16,
            cluster_depth: 32,
            max_lights_per_tile: 32,
            assignment: ClusterAssignment::Gpu,
        }
    }
}

impl ClusterSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 || self.cluster_depth == 0 || self.max_lights_per_tile == 0 {
            return Err(ConfigError::Invalid(format!(
                "cluster settings need non-zero tile size, depth and light cap, got {self:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    pub cascade_count: u32,
    /// Blend between uniform (0) and logarithmic (1) cascade splits
    pub cascade_split_lambda: f32,
    pub shadow_distance: f32,
    pub directional_resolution: u32,
    pub point_resolution: u32,
    pub spot_resolution: u32,
    /// Fit cascades tightly to the camera frustum slice
    pub close_fit: bool,
    /// Snap close-fit cascade bounds to whole shadow-map texels
    pub texel_snapping: bool,
    /// Near plane for point and spot shadow projections
    pub point_near_plane: f32,
    /// Distance the cascade near plane is pulled back towards the light
    pub cascade_near_plane_offset: f32,
    /// Swap cube faces 2/3 and flip view row 1 for point shadows
    pub point_face_convention_fix: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            cascade_count: 4,
            cascade_split_lambda: 0.75,
            shadow_distance: 150.0,
            directional_resolution: 2048,
            point_resolution: 512,
            spot_resolution: 1024,
            close_fit: true,
            texel_snapping: true,
            point_near_plane: 0.1,
            cascade_near_plane_offset: 100.0,
            point_face_convention_fix: true,
        }
    }
}

impl ShadowSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=8).contains(&self.cascade_count) {
            return Err(ConfigError::Invalid(format!(
                "cascade_count must be in 1..=8, got {}",
                self.cascade_count
            )));
        }
        if !(0.0..=1.0).contains(&self.cascade_split_lambda) {
            return Err(ConfigError::Invalid(format!(
                "cascade_split_lambda must be in [0, 1], got {}",
                self.cascade_split_lambda
            )));
        }
        if self.point_near_plane <= 0.0 || self.shadow_distance <= 0.0 {
            return Err(ConfigError::Invalid(
                "shadow distance and point near plane must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level renderer settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub clustering: ClusterSettings,
    pub shadows: ShadowSettings,
}

impl RendererSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clustering.validate()?;
        self.shadows.validate()
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
