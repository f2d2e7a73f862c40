//! Physics Tiles Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in physics_tiles_operations.rs

use super::physics_world::BodyId;
use crate::config::PhysicsConfig;
use crate::tiles::{TileGrid, TileId, TileKey};
use rustc_hash::FxHashMap;

/// A tile with a live collision body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsTile {
    pub id: TileId,
    pub body: BodyId,
}

/// Collision bodies for the tiles around the player
///
/// Independent of the render cache: it keeps its own resident set and pulls
/// samples through a `TileSampleProvider`.
#[derive(Debug, Clone)]
pub struct PhysicsTileManagerData {
    pub grid: TileGrid,
    pub height_scale: f32,
    pub min_altitude: f32,
    pub config: PhysicsConfig,
    pub tiles: FxHashMap<TileKey, PhysicsTile>,
}

/// What one physics update did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicsUpdateReport {
    pub desired: u32,
    pub removed: u32,
    pub created: u32,
    pub failed: u32,
    /// Desired tiles left for later updates by the per-update cap
    pub deferred: u32,
}
