//! Tile Cache Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in tile_cache_operations.rs

use super::hole_data::HoleOverlayData;
use crate::config::StreamingConfig;
use crate::fallback::BaseHeightmapData;
use crate::gpu::{TileArrayPoolData, TileInfoPublisherData};
use crate::tiles::{Tile, TileFileSource, TileGrid, TileKey};
use glam::Vec2;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// The streaming cache: resident tiles, slot pool, info ring and fallback
///
/// Every entry in `tiles` is stored under `pack_tile_key(tile.id)`.
/// `active_keys` is re-derived from `tiles` at the end of each update and
/// is the ordering handed to the publisher for that frame.
pub struct TileStreamingCacheData {
    pub grid: TileGrid,
    pub height_scale: f32,
    pub min_altitude: f32,
    pub config: StreamingConfig,
    pub source: Arc<dyn TileFileSource>,

    pub tiles: FxHashMap<TileKey, Tile>,
    pub active_keys: Vec<TileKey>,

    pub pool: TileArrayPoolData,
    pub publisher: TileInfoPublisherData,
    pub base: BaseHeightmapData,
    pub holes: HoleOverlayData,

    pub frame_index: u32,
    pub last_viewer: Option<Vec2>,
    pub stats: StreamingStats,
}

/// What one update did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub desired: u32,
    pub evicted: u32,
    pub loaded: u32,
    pub failed: u32,
    /// Desired tiles left for later updates by the load budget
    pub deferred: u32,
    pub slots_assigned: u32,
    /// Desired tiles left without a slot because the pool was full
    pub pool_exhausted: u32,
    /// Records written to this frame's tile info buffer
    pub published: u32,
}

/// Running totals for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub updates: u64,
    pub tiles_loaded: u64,
    pub tiles_evicted: u64,
    pub load_failures: u64,
    pub slot_uploads: u64,
    pub pool_exhausted_events: u64,
}
