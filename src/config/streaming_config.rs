//! Streaming policy configuration
//!
//! Runtime knobs for the cache and the physics manager. Every field has a
//! default, so an empty TOML document yields the stock policy.

use crate::constants::{gpu, physics, streaming};
use crate::error::{TerrainError, TerrainResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Render-side streaming policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Tiles whose centre is closer than this are requested
    pub load_radius: f32,
    /// Resident tiles whose centre is farther than this are evicted
    pub unload_radius: f32,
    /// Upper distance bound of each LOD (LOD0 first); beyond the last is fallback only
    pub lod_thresholds: Vec<f32>,
    pub max_loads_per_update: u32,
    /// Layers in the GPU tile array
    pub slot_capacity: u32,
    pub frames_in_flight: u32,
    pub fallback_max_resolution: u32,
    pub hole_mask_resolution: u32,
    pub physics: PhysicsConfig,
}

/// Physics tile policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub high_detail_radius: f32,
    pub high_detail_lod: u32,
    /// Tier covering everything else; `None` means the base LOD
    pub coarse_lod: Option<u32>,
    pub max_bodies_per_update: u32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            load_radius: streaming::DEFAULT_LOAD_RADIUS,
            unload_radius: streaming::DEFAULT_UNLOAD_RADIUS,
            lod_thresholds: streaming::DEFAULT_LOD_THRESHOLDS.to_vec(),
            max_loads_per_update: streaming::MAX_LOADS_PER_UPDATE,
            slot_capacity: gpu::MAX_ACTIVE_TILES,
            frames_in_flight: gpu::FRAMES_IN_FLIGHT,
            fallback_max_resolution: gpu::FALLBACK_MAX_RESOLUTION,
            hole_mask_resolution: gpu::HOLE_MASK_RESOLUTION,
            physics: PhysicsConfig::default(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            high_detail_radius: physics::DEFAULT_HIGH_DETAIL_RADIUS,
            high_detail_lod: physics::DEFAULT_HIGH_DETAIL_LOD,
            coarse_lod: None,
            max_bodies_per_update: physics::MAX_BODIES_PER_UPDATE,
        }
    }
}

/// Parse and validate a TOML policy document
pub fn streaming_config_from_toml(text: &str, path: &str) -> TerrainResult<StreamingConfig> {
    let config: StreamingConfig = toml::from_str(text).map_err(|e| TerrainError::Config {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    validate_streaming_config(&config, path)?;
    Ok(config)
}

pub fn load_streaming_config(path: &Path) -> TerrainResult<StreamingConfig> {
    let path_name = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| TerrainError::Io {
        path: path_name.clone(),
        error: e.to_string(),
    })?;
    streaming_config_from_toml(&text, &path_name)
}

pub fn validate_streaming_config(config: &StreamingConfig, path: &str) -> TerrainResult<()> {
    let fail = |reason: String| {
        Err(TerrainError::Config {
            path: path.to_string(),
            reason,
        })
    };

    if !(config.load_radius > 0.0) {
        return fail(format!("load_radius must be positive, got {}", config.load_radius));
    }
    if !(config.unload_radius > config.load_radius) {
        return fail(format!(
            "unload_radius ({}) must exceed load_radius ({})",
            config.unload_radius, config.load_radius
        ));
    }
    if config.frames_in_flight < 2 {
        return fail(format!(
            "frames_in_flight must be at least 2, got {}",
            config.frames_in_flight
        ));
    }
    if config.slot_capacity == 0 {
        return fail("slot_capacity must be at least 1".to_string());
    }
    if config.max_loads_per_update == 0 {
        return fail("max_loads_per_update must be at least 1".to_string());
    }
    if config.lod_thresholds.is_empty() {
        return fail("lod_thresholds must not be empty".to_string());
    }

    let mut previous = 0.0;
    for threshold in &config.lod_thresholds {
        if !(*threshold > previous) {
            return fail(format!(
                "lod_thresholds must be positive and strictly increasing: {:?}",
                config.lod_thresholds
            ));
        }
        previous = *threshold;
    }

    if config.fallback_max_resolution < 2 || config.hole_mask_resolution == 0 {
        return fail("fallback and hole mask resolutions must be non-zero".to_string());
    }
    if !(config.physics.high_detail_radius > 0.0) {
        return fail("physics.high_detail_radius must be positive".to_string());
    }
    if let Some(coarse) = config.physics.coarse_lod {
        if coarse < config.physics.high_detail_lod {
            return fail(format!(
                "physics.coarse_lod ({}) must not be finer than high_detail_lod ({})",
                coarse, config.physics.high_detail_lod
            ));
        }
    }
    if config.physics.max_bodies_per_update == 0 {
        return fail("physics.max_bodies_per_update must be at least 1".to_string());
    }

    Ok(())
}
