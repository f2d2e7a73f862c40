//! Tile Cache Operations - Pure DOP Functions
//!
//! Per-update order: desired set, evictions, budgeted loads, slot
//! assignment, active list rebuild, tile info publish. Evictions run before
//! loads so a slot freed this update can be reused by it.

use super::hole_data::{HoleCircle, HoleMask, HoleOverlayData};
use super::hole_operations::{add_hole, hole_touches_rect, point_in_hole, refresh_mask, remove_hole};
use super::lod_policy::compute_desired_tiles;
use super::tile_cache_data::{StreamingStats, TileStreamingCacheData, UpdateReport};
use crate::config::{
    height_scale, load_metadata, tile_grid, validate_streaming_config, StreamingConfig,
    TerrainMetadata,
};
use crate::constants::streaming::HYSTERESIS_MIN_GAP;
use crate::error::{OptionExt, TerrainError, TerrainResult};
use crate::fallback::{
    base_tile, build_combined_surface, load_base_tiles, sample_fallback, CombinedSurface,
};
use crate::gpu::{
    allocate_slot, create_tile_array_pool, create_tile_info_publisher, frame_buffer, free_slot,
    pool_capacity, publish_tile_info, upload_slot, GpuSlotUploader, TileArrayPoolData,
};
use crate::physics::TileSampleProvider;
use crate::tiles::{
    create_rect, decode_tile, is_valid_tile, pack_tile_key, rect_center, sample_tile_normalized,
    tile_range_in_radius, tile_world_bounds, tiles_in_range, to_world_height, PngTileSource, Tile,
    TileFileSource, TileGrid, TileId, TileKey, WorldRect,
};
use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// CONSTRUCTION
// ============================================================================

/// Build a cache and load the base LOD
///
/// Fails on an invalid policy or when no base tile loads; both are fatal.
pub fn create_tile_cache(
    metadata: &TerrainMetadata,
    config: StreamingConfig,
    source: Arc<dyn TileFileSource>,
    uploader: Box<dyn GpuSlotUploader>,
) -> TerrainResult<TileStreamingCacheData> {
    validate_streaming_config(&config, "streaming config")?;

    let grid = tile_grid(metadata);
    let resolution = grid.tile_resolution;

    let mut base = load_base_tiles(grid, |id| decode_tile(source.as_ref(), id, resolution))?;
    build_combined_surface(&mut base, config.fallback_max_resolution);

    let pool = create_tile_array_pool(config.slot_capacity, resolution, uploader);
    let publisher = create_tile_info_publisher(config.frames_in_flight, config.slot_capacity);

    log::info!(
        "[tile_cache::create] Terrain {}m, {}x{} LOD0 tiles, {} levels, {} slots, {} frames in flight",
        grid.terrain_size,
        grid.tiles_x,
        grid.tiles_z,
        grid.num_lod_levels,
        config.slot_capacity,
        config.frames_in_flight
    );

    Ok(TileStreamingCacheData {
        grid,
        height_scale: height_scale(metadata),
        min_altitude: metadata.min_altitude,
        config,
        source,
        tiles: FxHashMap::default(),
        active_keys: Vec::new(),
        pool,
        publisher,
        base,
        holes: HoleOverlayData::default(),
        frame_index: 0,
        last_viewer: None,
        stats: StreamingStats::default(),
    })
}

/// Open a baked tile directory (metadata plus PNG tiles)
pub fn open_tile_cache(
    tile_directory: &Path,
    config: StreamingConfig,
    uploader: Box<dyn GpuSlotUploader>,
) -> TerrainResult<TileStreamingCacheData> {
    let metadata = load_metadata(tile_directory)?;
    let source: Arc<dyn TileFileSource> = Arc::new(PngTileSource::new(tile_directory));
    create_tile_cache(&metadata, config, source, uploader)
}

// ============================================================================
// UPDATE
// ============================================================================

/// Stream tiles for a viewer using the configured radii
pub fn update_tile_cache(cache: &mut TileStreamingCacheData, viewer: Vec3) -> UpdateReport {
    let load_radius = cache.config.load_radius;
    let unload_radius = cache.config.unload_radius;
    update_tile_cache_with_radii(cache, viewer, load_radius, unload_radius)
}

/// Stream tiles for a viewer
///
/// `unload_radius` should exceed `load_radius`; the gap keeps boundary tiles
/// from flickering between loaded and evicted.
pub fn update_tile_cache_with_radii(
    cache: &mut TileStreamingCacheData,
    viewer: Vec3,
    load_radius: f32,
    unload_radius: f32,
) -> UpdateReport {
    let viewer = Vec2::new(viewer.x, viewer.z);
    let mut report = UpdateReport::default();

    // Without a gap between the radii boundary tiles thrash every update
    let unload_radius = if unload_radius > load_radius {
        unload_radius
    } else {
        let clamped = load_radius * (1.0 + HYSTERESIS_MIN_GAP);
        log::warn!(
            "[tile_cache::update] unload radius {} not above load radius {}, using {}",
            unload_radius,
            load_radius,
            clamped
        );
        clamped
    };

    let desired = compute_desired_tiles(
        &cache.grid,
        &cache.config.lod_thresholds,
        viewer,
        load_radius,
    );
    report.desired = desired.len() as u32;

    report.evicted = evict_distant_tiles(cache, viewer, unload_radius);
    load_desired_tiles(cache, &desired, &mut report);
    assign_slots(cache, &desired, viewer, &mut report);

    rebuild_active_keys(cache);
    let frame_index = cache.frame_index;
    report.published = publish_frame(cache, frame_index);

    cache.last_viewer = Some(viewer);
    cache.stats.updates += 1;
    cache.stats.tiles_loaded += report.loaded as u64;
    cache.stats.tiles_evicted += report.evicted as u64;
    cache.stats.load_failures += report.failed as u64;
    cache.stats.slot_uploads += report.slots_assigned as u64;
    if report.pool_exhausted > 0 {
        cache.stats.pool_exhausted_events += 1;
    }

    report
}

fn evict_distant_tiles(cache: &mut TileStreamingCacheData, viewer: Vec2, unload_radius: f32) -> u32 {
    let distant: Vec<TileKey> = cache
        .tiles
        .iter()
        .filter(|(_, tile)| rect_center(&tile.bounds).distance(viewer) > unload_radius)
        .map(|(key, _)| *key)
        .collect();

    let mut evicted = 0;
    for key in distant {
        if let Some(tile) = cache.tiles.remove(&key) {
            release_tile_slot(&mut cache.pool, &tile);
            log::debug!("[tile_cache::evict] {:?}", tile.id);
            evicted += 1;
        }
    }
    evicted
}

fn release_tile_slot(pool: &mut TileArrayPoolData, tile: &Tile) {
    if let Some(slot) = tile.slot_index {
        if let Err(e) = free_slot(pool, slot) {
            log::error!("[tile_cache::release_tile_slot] {:?}: {}", tile.id, e);
        }
    }
}

/// Load missing desired tiles in discovery order, bounded by the budget
///
/// Every attempt counts against the budget, failed or not.
fn load_desired_tiles(
    cache: &mut TileStreamingCacheData,
    desired: &[TileId],
    report: &mut UpdateReport,
) {
    let budget = cache.config.max_loads_per_update;
    let mut attempts = 0;

    for id in desired {
        let key = pack_tile_key(*id);
        if cache.tiles.contains_key(&key) {
            continue;
        }
        if attempts >= budget {
            report.deferred += 1;
            continue;
        }
        attempts += 1;

        match load_tile(&cache.grid, cache.source.as_ref(), *id) {
            Ok(tile) => {
                log::debug!("[tile_cache::load] {:?}", id);
                cache.tiles.insert(key, tile);
                report.loaded += 1;
            }
            Err(e) => {
                log::warn!("[tile_cache::load] {}", e);
                report.failed += 1;
            }
        }
    }
}

fn load_tile(grid: &TileGrid, source: &dyn TileFileSource, id: TileId) -> TerrainResult<Tile> {
    let heights = decode_tile(source, id, grid.tile_resolution)?;
    Ok(Tile {
        id,
        heights,
        bounds: tile_world_bounds(grid, id),
        slot_index: None,
    })
}

/// Give slots to desired resident tiles, nearest first
///
/// A full pool leaves the rest CPU-only; they are retried next update.
fn assign_slots(
    cache: &mut TileStreamingCacheData,
    desired: &[TileId],
    viewer: Vec2,
    report: &mut UpdateReport,
) {
    let mut waiting: Vec<(f32, TileKey)> = desired
        .iter()
        .map(|id| pack_tile_key(*id))
        .filter_map(|key| {
            let tile = cache.tiles.get(&key)?;
            match tile.slot_index {
                Some(_) => None,
                None => Some((rect_center(&tile.bounds).distance(viewer), key)),
            }
        })
        .collect();
    waiting.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (position, (_, key)) in waiting.iter().enumerate() {
        let Some(slot) = allocate_slot(&mut cache.pool) else {
            report.pool_exhausted = (waiting.len() - position) as u32;
            let exhausted = TerrainError::SlotPoolExhausted {
                capacity: pool_capacity(&cache.pool),
            };
            log::warn!(
                "[tile_cache::assign_slots] {}, {} tiles stay CPU-only",
                exhausted,
                report.pool_exhausted
            );
            break;
        };

        let Some(tile) = cache.tiles.get_mut(key) else {
            let _ = free_slot(&mut cache.pool, slot);
            continue;
        };

        match upload_slot(&mut cache.pool, slot, &tile.heights) {
            Ok(()) => {
                tile.slot_index = Some(slot);
                report.slots_assigned += 1;
                log::debug!("[tile_cache::assign_slots] {:?} -> slot {}", tile.id, slot);
            }
            Err(e) => {
                // Never publish a slot whose data did not land; retry next update
                log::warn!("[tile_cache::assign_slots] {:?}: {}", tile.id, e);
                let _ = free_slot(&mut cache.pool, slot);
                break;
            }
        }
    }
}

/// Re-derive this frame's active list; finest LOD first, then by key
fn rebuild_active_keys(cache: &mut TileStreamingCacheData) {
    cache.active_keys.clear();
    cache.active_keys.extend(cache.tiles.keys().copied());
    cache.active_keys.sort_unstable();
}

/// Write the active slotted tiles into a frame's tile info buffer
///
/// Call only for the frame about to be submitted.
pub fn publish_frame(cache: &mut TileStreamingCacheData, frame_index: u32) -> u32 {
    let active: Vec<&Tile> = cache
        .active_keys
        .iter()
        .filter_map(|key| cache.tiles.get(key))
        .collect();
    publish_tile_info(&mut cache.publisher, frame_index, &active)
}

/// Select the ring buffer the next update publishes into
pub fn set_frame_index(cache: &mut TileStreamingCacheData, frame_index: u32) {
    cache.frame_index = frame_index;
}

/// Tile info bytes for a frame, ready to bind
pub fn tile_info_buffer(cache: &TileStreamingCacheData, frame_index: u32) -> &[u8] {
    frame_buffer(&cache.publisher, frame_index)
}

// ============================================================================
// QUERIES
// ============================================================================

/// World height at a point
///
/// Uses the finest resident tile covering the point, else the base LOD.
/// `None` only where the base tile itself never loaded.
pub fn get_height_at(cache: &TileStreamingCacheData, world_x: f32, world_z: f32) -> Option<f32> {
    let resolution = cache.grid.tile_resolution;

    let resident = cache
        .tiles
        .values()
        .filter_map(|tile| {
            sample_tile_normalized(tile, resolution, world_x, world_z).map(|h| (tile.id.lod, h))
        })
        .min_by_key(|(lod, _)| *lod)
        .map(|(_, h)| h);

    resident
        .or_else(|| sample_fallback(&cache.base, world_x, world_z))
        .map(|h| to_world_height(h, cache.height_scale, cache.min_altitude))
}

/// World height from the base LOD only
pub fn get_fallback_height_at(
    cache: &TileStreamingCacheData,
    world_x: f32,
    world_z: f32,
) -> Option<f32> {
    sample_fallback(&cache.base, world_x, world_z)
        .map(|h| to_world_height(h, cache.height_scale, cache.min_altitude))
}

pub fn is_tile_resident(cache: &TileStreamingCacheData, id: TileId) -> bool {
    cache.tiles.contains_key(&pack_tile_key(id))
}

pub fn resident_tile(cache: &TileStreamingCacheData, id: TileId) -> Option<&Tile> {
    cache.tiles.get(&pack_tile_key(id))
}

pub fn resident_tile_count(cache: &TileStreamingCacheData) -> usize {
    cache.tiles.len()
}

/// This frame's active tiles in publish order
pub fn active_tiles(cache: &TileStreamingCacheData) -> Vec<&Tile> {
    cache
        .active_keys
        .iter()
        .filter_map(|key| cache.tiles.get(key))
        .collect()
}

pub fn slotted_tile_count(cache: &TileStreamingCacheData) -> u32 {
    cache
        .tiles
        .values()
        .filter(|tile| tile.slot_index.is_some())
        .count() as u32
}

pub fn fallback_surface(cache: &TileStreamingCacheData) -> Option<&CombinedSurface> {
    cache.base.combined.as_ref()
}

pub fn streaming_stats(cache: &TileStreamingCacheData) -> StreamingStats {
    cache.stats
}

// ============================================================================
// CPU-ONLY LOADS
// ============================================================================

/// Make a tile CPU-resident without giving it a slot
///
/// Idempotent: a resident tile is returned as is.
pub fn request_tile_cpu(cache: &mut TileStreamingCacheData, id: TileId) -> TerrainResult<&Tile> {
    if !is_valid_tile(&cache.grid, id) {
        return Err(TerrainError::tile_load(id, "outside the tile grid"));
    }

    let key = pack_tile_key(id);
    if !cache.tiles.contains_key(&key) {
        let tile = load_tile(&cache.grid, cache.source.as_ref(), id)?;
        log::debug!("[tile_cache::request_tile_cpu] {:?}", id);
        cache.tiles.insert(key, tile);
        cache.stats.tiles_loaded += 1;
    }

    cache
        .tiles
        .get(&key)
        .ok_or_terrain(|| TerrainError::tile_load(id, "tile vanished after load"))
}

/// Load every LOD0 tile around a point, ignoring the per-update budget
///
/// Meant for spawn points and teleports. Returns how many tiles were loaded.
pub fn preload_tiles_around(
    cache: &mut TileStreamingCacheData,
    world_x: f32,
    world_z: f32,
    radius: f32,
) -> u32 {
    let center = Vec2::new(world_x, world_z);
    let Some(range) = tile_range_in_radius(&cache.grid, center, radius, 0) else {
        return 0;
    };

    let mut loaded = 0;
    for id in tiles_in_range(&range) {
        if is_tile_resident(cache, id) {
            continue;
        }
        if rect_center(&tile_world_bounds(&cache.grid, id)).distance(center) >= radius {
            continue;
        }
        match request_tile_cpu(cache, id) {
            Ok(_) => loaded += 1,
            Err(e) => log::warn!("[tile_cache::preload_tiles_around] {}", e),
        }
    }

    log::info!(
        "[tile_cache::preload_tiles_around] Preloaded {} tiles around ({}, {})",
        loaded,
        world_x,
        world_z
    );
    loaded
}

// ============================================================================
// HOLES
// ============================================================================

pub fn add_hole_circle(cache: &mut TileStreamingCacheData, center_x: f32, center_z: f32, radius: f32) {
    add_hole(&mut cache.holes, center_x, center_z, radius);
}

pub fn remove_hole_circle(
    cache: &mut TileStreamingCacheData,
    center_x: f32,
    center_z: f32,
    radius: f32,
) -> bool {
    remove_hole(&mut cache.holes, center_x, center_z, radius)
}

/// Analytic hole query; never depends on the mask
pub fn is_hole(cache: &TileStreamingCacheData, world_x: f32, world_z: f32) -> bool {
    point_in_hole(&cache.holes, world_x, world_z)
}

pub fn terrain_bounds(grid: &TileGrid) -> WorldRect {
    let half = grid.terrain_size * 0.5;
    create_rect(-half, -half, half, half)
}

/// Terrain-wide hole mask, re-rasterized only after the hole list changed
pub fn refresh_hole_mask(cache: &mut TileStreamingCacheData) -> &HoleMask {
    let bounds = terrain_bounds(&cache.grid);
    let resolution = cache.config.hole_mask_resolution;
    refresh_mask(&mut cache.holes, &bounds, resolution)
}

/// Resident tiles a hole reaches into, by identity
pub fn tiles_touched_by_hole(
    cache: &TileStreamingCacheData,
    center_x: f32,
    center_z: f32,
    radius: f32,
) -> Vec<TileId> {
    let hole = HoleCircle {
        center_x,
        center_z,
        radius,
    };
    let mut touched: Vec<TileId> = cache
        .tiles
        .values()
        .filter(|tile| hole_touches_rect(&hole, &tile.bounds))
        .map(|tile| tile.id)
        .collect();
    touched.sort();
    touched
}

// ============================================================================
// SAMPLE PROVIDER
// ============================================================================

/// Resident tile, else base LOD tile, else a CPU-only load
impl TileSampleProvider for TileStreamingCacheData {
    fn tile_samples(&mut self, id: TileId) -> TerrainResult<&[f32]> {
        let key = pack_tile_key(id);
        let use_base = !self.tiles.contains_key(&key) && base_tile(&self.base, id).is_some();

        if use_base {
            return base_tile(&self.base, id)
                .map(|tile| tile.heights.as_slice())
                .ok_or_terrain(|| TerrainError::tile_load(id, "base tile missing"));
        }

        let tile = request_tile_cpu(self, id)?;
        Ok(&tile.heights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{decode_tile_info, read_slot, MemorySlotUploader};
    use crate::tiles::{all_tiles_at_lod, rect_contains_point, rect_overlaps, MemoryTileSource};

    const RESOLUTION: u32 = 4;

    fn reference_metadata() -> TerrainMetadata {
        TerrainMetadata {
            tile_resolution: RESOLUTION,
            num_lod_levels: 4,
            tiles_x: 32,
            tiles_z: 32,
            terrain_size: 16384.0,
            source_width: 16384,
            source_height: 16384,
            min_altitude: -15.0,
            max_altitude: 220.0,
            meters_per_pixel: 1.0,
        }
    }

    /// Every tile of every level, flat at `lod_height(lod)`
    fn full_source(metadata: &TerrainMetadata) -> MemoryTileSource {
        let grid = tile_grid(metadata);
        let mut source = MemoryTileSource::new();
        for lod in 0..grid.num_lod_levels {
            for id in all_tiles_at_lod(&grid, lod) {
                source.insert_with(id, RESOLUTION, |_, _| lod_height(lod));
            }
        }
        source
    }

    fn lod_height(lod: u32) -> f32 {
        0.1 + 0.2 * lod as f32
    }

    fn world(normalized: f32) -> f32 {
        to_world_height(normalized, 235.0, -15.0)
    }

    fn assert_height(actual: Option<f32>, expected: f32) {
        let actual = actual.expect("height");
        assert!(
            (actual - expected).abs() < 1e-3,
            "height {} expected {}",
            actual,
            expected
        );
    }

    fn cache_with(config: StreamingConfig, source: MemoryTileSource) -> TileStreamingCacheData {
        let capacity = config.slot_capacity;
        create_tile_cache(
            &reference_metadata(),
            config,
            Arc::new(source),
            Box::new(MemorySlotUploader::new(capacity)),
        )
        .expect("cache")
    }

    fn generous_config() -> StreamingConfig {
        StreamingConfig {
            max_loads_per_update: 64,
            ..StreamingConfig::default()
        }
    }

    #[test]
    fn test_create_loads_base_level() {
        let cache = cache_with(StreamingConfig::default(), full_source(&reference_metadata()));
        assert_eq!(cache.base.loaded_count, 16);
        assert_eq!(resident_tile_count(&cache), 0);
        assert!(fallback_surface(&cache).is_some());
        // Ring starts empty
        assert!(decode_tile_info(tile_info_buffer(&cache, 0)).is_empty());
    }

    #[test]
    fn test_create_without_base_tiles_fails() {
        let result = create_tile_cache(
            &reference_metadata(),
            StreamingConfig::default(),
            Arc::new(MemoryTileSource::new()),
            Box::new(MemorySlotUploader::new(64)),
        );
        match result {
            Err(e) => assert!(e.is_fatal()),
            Ok(_) => panic!("cache without base tiles must not be created"),
        }
    }

    #[test]
    fn test_first_update_at_origin() {
        let mut cache = cache_with(generous_config(), full_source(&reference_metadata()));
        let report = update_tile_cache(&mut cache, Vec3::ZERO);

        assert_eq!(report.failed, 0);
        assert!(report.loaded > 0);
        let origin_tile = cache
            .tiles
            .values()
            .find(|tile| rect_contains_point(&tile.bounds, 0.0, 0.0))
            .expect("tile covering origin");
        assert_eq!(origin_tile.id.lod, 0);
        assert_height(get_height_at(&cache, 0.0, 0.0), world(lod_height(0)));
    }

    #[test]
    fn test_loaded_levels_never_overlap() {
        let mut config = generous_config();
        config.load_radius = 3000.0;
        config.unload_radius = 3600.0;
        let mut cache = cache_with(config, full_source(&reference_metadata()));

        let viewer = Vec3::new(500.0, 0.0, 0.0);
        while update_tile_cache(&mut cache, viewer).loaded > 0 {}
        assert!(cache.tiles.values().any(|tile| tile.id.lod == 1));

        let resident: Vec<&Tile> = cache.tiles.values().collect();
        for a in &resident {
            for b in &resident {
                if a.id.lod < b.id.lod {
                    assert!(
                        !rect_overlaps(&a.bounds, &b.bounds),
                        "{:?} overlaps {:?}",
                        a.id,
                        b.id
                    );
                }
            }
        }
    }

    #[test]
    fn test_load_budget_per_update() {
        let mut cache = cache_with(StreamingConfig::default(), full_source(&reference_metadata()));
        let first = update_tile_cache(&mut cache, Vec3::ZERO);
        assert_eq!(first.loaded, 4);
        assert_eq!(first.deferred, first.desired - 4);

        let mut updates = 1;
        while update_tile_cache(&mut cache, Vec3::ZERO).loaded > 0 {
            updates += 1;
            assert!(updates < 20, "loading never settled");
        }
        assert_eq!(resident_tile_count(&cache) as u32, first.desired);
    }

    #[test]
    fn test_slot_pool_bound() {
        let mut config = generous_config();
        config.slot_capacity = 4;
        let mut cache = cache_with(config, full_source(&reference_metadata()));

        let report = update_tile_cache(&mut cache, Vec3::ZERO);
        assert!(report.desired > 4);
        assert_eq!(report.slots_assigned, 4);
        assert_eq!(report.pool_exhausted, report.desired - 4);
        assert_eq!(slotted_tile_count(&cache), 4);
        assert_eq!(decode_tile_info(tile_info_buffer(&cache, 0)).len(), 4);

        // Unslotted tiles still answer height queries
        let unslotted = cache
            .tiles
            .values()
            .find(|tile| tile.slot_index.is_none())
            .expect("unslotted tile")
            .bounds;
        let center = rect_center(&unslotted);
        assert!(get_height_at(&cache, center.x, center.y).is_some());

        // Fly around: the bound holds in every state
        for step in 0..40 {
            let t = step as f32 * 0.3;
            update_tile_cache(&mut cache, Vec3::new(t.cos() * 3000.0, 0.0, t.sin() * 3000.0));
            assert!(slotted_tile_count(&cache) <= 4);
            assert_eq!(crate::gpu::occupied_slot_count(&cache.pool), slotted_tile_count(&cache));
        }
    }

    #[test]
    fn test_freed_slots_reused_after_move() {
        let mut config = generous_config();
        config.slot_capacity = 4;
        let mut cache = cache_with(config, full_source(&reference_metadata()));

        update_tile_cache(&mut cache, Vec3::ZERO);
        assert_eq!(slotted_tile_count(&cache), 4);

        let report = update_tile_cache(&mut cache, Vec3::new(5000.0, 0.0, 5000.0));
        assert!(report.evicted > 0);
        assert_eq!(report.slots_assigned, 4);
        assert!(cache
            .tiles
            .values()
            .filter(|tile| tile.slot_index.is_some())
            .all(|tile| rect_center(&tile.bounds).distance(Vec2::new(5000.0, 5000.0)) < 1000.0));
    }

    #[test]
    fn test_teleport_evicts_old_neighbourhood() {
        let mut cache = cache_with(generous_config(), full_source(&reference_metadata()));
        update_tile_cache(&mut cache, Vec3::ZERO);
        let old: Vec<TileId> = cache.tiles.values().map(|tile| tile.id).collect();
        assert!(!old.is_empty());

        let report = update_tile_cache(&mut cache, Vec3::new(5000.0, 0.0, 5000.0));
        assert_eq!(report.evicted as usize, old.len());
        for id in old {
            assert!(!is_tile_resident(&cache, id));
        }
        assert!(cache
            .tiles
            .values()
            .all(|tile| rect_center(&tile.bounds).distance(Vec2::new(5000.0, 5000.0)) <= 1200.0));
        assert_eq!(crate::gpu::occupied_slot_count(&cache.pool), slotted_tile_count(&cache));
    }

    #[test]
    fn test_hysteresis_keeps_boundary_tiles() {
        let source = Arc::new(full_source(&reference_metadata()));
        let mut cache = create_tile_cache(
            &reference_metadata(),
            generous_config(),
            source.clone(),
            Box::new(MemorySlotUploader::new(64)),
        )
        .expect("cache");

        update_tile_cache(&mut cache, Vec3::ZERO);
        let resident_before = resident_tile_count(&cache);
        let loads_before = source.loads();

        // Tiles whose centres now sit between the radii stay resident
        let report = update_tile_cache(&mut cache, Vec3::new(150.0, 0.0, 0.0));
        assert_eq!(report.evicted, 0);
        assert!(resident_tile_count(&cache) >= resident_before);

        // Stepping back never reloads what was kept
        let back = update_tile_cache(&mut cache, Vec3::ZERO);
        assert_eq!(back.loaded, 0);
        assert_eq!(back.evicted, 0);
        assert_eq!(source.loads() as usize, loads_before as usize + report.loaded as usize);
    }

    #[test]
    fn test_resolution_mismatch_falls_back() {
        let metadata = reference_metadata();
        let mut source = full_source(&metadata);
        let bad = TileId { x: 16, z: 16, lod: 0 };
        source.insert_with(bad, 2, |_, _| 0.9);

        let mut cache = cache_with(generous_config(), source);
        let report = update_tile_cache(&mut cache, Vec3::ZERO);

        assert_eq!(report.failed, 1);
        assert!(!is_tile_resident(&cache, bad));
        let center = tile_center_of(&cache, bad);
        assert_height(get_height_at(&cache, center.x, center.y), world(lod_height(3)));

        // Retried next update, still rejected, still no panic
        let again = update_tile_cache(&mut cache, Vec3::ZERO);
        assert_eq!(again.failed, 1);
    }

    fn tile_center_of(cache: &TileStreamingCacheData, id: TileId) -> Vec2 {
        rect_center(&tile_world_bounds(&cache.grid, id))
    }

    #[test]
    fn test_height_query_idempotent() {
        let mut cache = cache_with(generous_config(), full_source(&reference_metadata()));
        update_tile_cache(&mut cache, Vec3::new(321.0, 0.0, -77.0));
        for (x, z) in [(0.0, 0.0), (300.0, -50.0), (6000.0, 6000.0), (-8191.0, 8191.0)] {
            assert_eq!(get_height_at(&cache, x, z), get_height_at(&cache, x, z));
        }
    }

    #[test]
    fn test_height_prefers_finest_resident_lod() {
        let mut cache = cache_with(generous_config(), full_source(&reference_metadata()));
        request_tile_cpu(&mut cache, TileId { x: 8, z: 8, lod: 1 }).expect("lod1 tile");
        assert_height(get_height_at(&cache, 100.0, 100.0), world(lod_height(1)));

        request_tile_cpu(&mut cache, TileId { x: 16, z: 16, lod: 0 }).expect("lod0 tile");
        assert_height(get_height_at(&cache, 100.0, 100.0), world(lod_height(0)));
        assert_height(get_fallback_height_at(&cache, 100.0, 100.0), world(lod_height(3)));
    }

    #[test]
    fn test_slot_round_trip() {
        let metadata = reference_metadata();
        let mut source = full_source(&metadata);
        let id = TileId { x: 16, z: 16, lod: 0 };
        source.insert_with(id, RESOLUTION, |col, row| (row * RESOLUTION + col) as f32 / 16.0);

        let mut cache = cache_with(generous_config(), source);
        update_tile_cache(&mut cache, Vec3::ZERO);

        let tile = resident_tile(&cache, id).expect("origin tile");
        let slot = tile.slot_index.expect("origin tile slotted");
        assert_eq!(read_slot(&cache.pool, slot), Some(tile.heights.as_slice()));
    }

    #[test]
    fn test_publish_uses_frame_ring() {
        let mut cache = cache_with(generous_config(), full_source(&reference_metadata()));
        set_frame_index(&mut cache, 4);
        let report = update_tile_cache(&mut cache, Vec3::ZERO);

        assert!(report.published > 0);
        assert_eq!(
            decode_tile_info(tile_info_buffer(&cache, 4)).len() as u32,
            report.published
        );
        // Frame 4 lives in ring slot 1; slots 0 and 2 are untouched
        assert!(decode_tile_info(tile_info_buffer(&cache, 0)).is_empty());
        assert!(decode_tile_info(tile_info_buffer(&cache, 2)).is_empty());
        assert_eq!(active_tiles(&cache).len(), resident_tile_count(&cache));
    }

    #[test]
    fn test_request_tile_cpu_is_idempotent() {
        let source = Arc::new(full_source(&reference_metadata()));
        let mut cache = create_tile_cache(
            &reference_metadata(),
            StreamingConfig::default(),
            source.clone(),
            Box::new(MemorySlotUploader::new(64)),
        )
        .expect("cache");
        let loads_after_base = source.loads();

        let id = TileId { x: 3, z: 4, lod: 0 };
        assert!(request_tile_cpu(&mut cache, id).expect("load").slot_index.is_none());
        request_tile_cpu(&mut cache, id).expect("second request");
        assert_eq!(source.loads(), loads_after_base + 1);
        assert!(request_tile_cpu(&mut cache, TileId { x: 99, z: 0, lod: 0 }).is_err());
    }

    #[test]
    fn test_preload_ignores_budget() {
        let mut cache = cache_with(StreamingConfig::default(), full_source(&reference_metadata()));
        let loaded = preload_tiles_around(&mut cache, 0.0, 0.0, 1000.0);
        assert_eq!(loaded, 12);
        assert_eq!(slotted_tile_count(&cache), 0);
        assert_eq!(preload_tiles_around(&mut cache, 0.0, 0.0, 1000.0), 0);
    }

    #[test]
    fn test_hole_queries() {
        let mut cache = cache_with(StreamingConfig::default(), full_source(&reference_metadata()));
        add_hole_circle(&mut cache, 100.0, 100.0, 10.0);
        assert!(is_hole(&cache, 105.0, 100.0));
        assert!(!is_hole(&cache, 200.0, 200.0));

        assert!(remove_hole_circle(&mut cache, 100.0, 100.0, 10.0));
        assert!(!is_hole(&cache, 105.0, 100.0));
        assert!(!remove_hole_circle(&mut cache, 100.0, 100.0, 10.0));
    }

    #[test]
    fn test_hole_mask_and_touched_tiles() {
        let mut config = generous_config();
        config.hole_mask_resolution = 256;
        let mut cache = cache_with(config, full_source(&reference_metadata()));
        update_tile_cache(&mut cache, Vec3::ZERO);

        add_hole_circle(&mut cache, 0.0, 0.0, 100.0);
        let mask = refresh_hole_mask(&mut cache);
        assert_eq!(mask.resolution, 256);
        assert!(crate::streaming::hole_operations::mask_is_hole(mask, 0.0, 0.0));
        assert!(!cache.holes.mask_dirty);

        // The hole straddles the four tiles meeting at the origin
        let touched = tiles_touched_by_hole(&cache, 0.0, 0.0, 100.0);
        assert_eq!(touched.len(), 4);
        assert!(touched.iter().all(|id| id.lod == 0));
    }

    #[test]
    fn test_cache_as_sample_provider() {
        let mut cache = cache_with(StreamingConfig::default(), full_source(&reference_metadata()));

        // Base tile answered without a new load
        let base = cache.tile_samples(TileId { x: 1, z: 1, lod: 3 }).expect("base");
        assert_eq!(base[0], lod_height(3));
        assert_eq!(resident_tile_count(&cache), 0);

        // Anything else becomes CPU-resident
        let fine = cache.tile_samples(TileId { x: 0, z: 0, lod: 0 }).expect("fine");
        assert_eq!(fine.len(), 16);
        assert_eq!(resident_tile_count(&cache), 1);
        assert_eq!(slotted_tile_count(&cache), 0);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut cache = cache_with(StreamingConfig::default(), full_source(&reference_metadata()));
        update_tile_cache(&mut cache, Vec3::ZERO);
        update_tile_cache(&mut cache, Vec3::ZERO);
        let stats = streaming_stats(&cache);
        assert_eq!(stats.updates, 2);
        assert_eq!(stats.tiles_loaded, 8);
        assert_eq!(stats.slot_uploads, 8);
        assert_eq!(cache.last_viewer, Some(Vec2::ZERO));
    }

    /// Texture array with fewer layers than the configured slot capacity
    struct TwoLayerUploader;

    impl GpuSlotUploader for TwoLayerUploader {
        fn upload(&mut self, slot: u32, _samples: &[f32]) -> TerrainResult<()> {
            if slot >= 2 {
                return Err(TerrainError::InvalidSlot {
                    index: slot,
                    capacity: 2,
                    reason: "beyond texture array layers",
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_rejected_uploads_never_published() {
        let mut config = generous_config();
        config.slot_capacity = 4;
        let mut cache = create_tile_cache(
            &reference_metadata(),
            config,
            Arc::new(full_source(&reference_metadata())),
            Box::new(TwoLayerUploader),
        )
        .expect("cache");

        for _ in 0..2 {
            let report = update_tile_cache(&mut cache, Vec3::ZERO);
            assert_eq!(report.published, 2);
            assert_eq!(slotted_tile_count(&cache), 2);

            let layers: Vec<i32> = decode_tile_info(tile_info_buffer(&cache, 0))
                .iter()
                .map(|record| record.layer_index[0])
                .collect();
            assert_eq!(layers.len(), 2);
            assert!(layers.iter().all(|layer| *layer < 2), "layers {:?}", layers);
        }
        assert_eq!(crate::gpu::occupied_slot_count(&cache.pool), 2);
    }

    #[test]
    fn test_collapsed_radii_keep_hysteresis() {
        let mut cache = cache_with(generous_config(), full_source(&reference_metadata()));

        update_tile_cache_with_radii(&mut cache, Vec3::ZERO, 1000.0, 1000.0);
        let resident_before = resident_tile_count(&cache);
        assert!(resident_before > 0);

        // An unload radius below the load radius is widened, not obeyed
        let report = update_tile_cache_with_radii(&mut cache, Vec3::new(150.0, 0.0, 0.0), 1000.0, 0.0);
        assert_eq!(report.evicted, 0);
        assert!(resident_tile_count(&cache) >= resident_before);
    }
}
