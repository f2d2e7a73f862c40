//! Physics Tiles Operations - Pure DOP Functions
//!
//! Two-tier policy: high-detail tiles near the player, coarse tiles for the
//! rest of the terrain. Coarse tiles that overlap the near set are split
//! through the intermediate levels so every point is covered exactly once.

use super::physics_tiles_data::{PhysicsTile, PhysicsTileManagerData, PhysicsUpdateReport};
use super::physics_world::{BodyId, HeightfieldDesc, PhysicsWorld, TileSampleProvider};
use crate::config::{height_scale, tile_grid, PhysicsConfig, TerrainMetadata};
use crate::error::{TerrainError, TerrainResult};
use crate::tiles::{
    all_tiles_at_lod, base_lod, child_tiles, pack_tile_key, rect_overlaps, tile_center,
    tile_range_in_radius, tile_world_bounds, tile_world_size, tiles_in_range, TileGrid, TileId,
    TileKey, WorldRect,
};
use glam::{Vec2, Vec3};
use rustc_hash::{FxHashMap, FxHashSet};

pub fn create_physics_tile_manager(
    metadata: &TerrainMetadata,
    config: PhysicsConfig,
) -> PhysicsTileManagerData {
    PhysicsTileManagerData {
        grid: tile_grid(metadata),
        height_scale: height_scale(metadata),
        min_altitude: metadata.min_altitude,
        config,
        tiles: FxHashMap::default(),
    }
}

/// Coarse tier level (configured, else the base LOD), clamped to the grid
pub fn coarse_lod(manager: &PhysicsTileManagerData) -> u32 {
    let base = base_lod(&manager.grid);
    manager.config.coarse_lod.unwrap_or(base).min(base)
}

/// High-detail tier level, never coarser than the coarse tier
pub fn high_detail_lod(manager: &PhysicsTileManagerData) -> u32 {
    manager.config.high_detail_lod.min(coarse_lod(manager))
}

/// Tiles that should carry collision bodies
///
/// Near tiles first, then the coarse cover. The result tiles the whole
/// terrain with no gaps and no overlaps.
pub fn compute_physics_desired_tiles(
    grid: &TileGrid,
    high_lod: u32,
    coarse_lod: u32,
    viewer: Vec2,
    high_detail_radius: f32,
) -> Vec<TileId> {
    let near: Vec<TileId> = tile_range_in_radius(grid, viewer, high_detail_radius, high_lod)
        .map(|range| {
            tiles_in_range(&range)
                .filter(|id| tile_center(grid, *id).distance(viewer) < high_detail_radius)
                .collect()
        })
        .unwrap_or_default();

    let near_bounds: Vec<WorldRect> = near.iter().map(|id| tile_world_bounds(grid, *id)).collect();

    let mut desired = near;
    for coarse in all_tiles_at_lod(grid, coarse_lod) {
        cover_tile(grid, coarse, high_lod, &near_bounds, &mut desired);
    }
    desired
}

fn cover_tile(
    grid: &TileGrid,
    id: TileId,
    high_lod: u32,
    near_bounds: &[WorldRect],
    out: &mut Vec<TileId>,
) {
    let bounds = tile_world_bounds(grid, id);
    if !near_bounds.iter().any(|near| rect_overlaps(near, &bounds)) {
        out.push(id);
        return;
    }
    // Same-level overlap means this is one of the near tiles
    if id.lod <= high_lod {
        return;
    }
    for child in child_tiles(grid, id) {
        cover_tile(grid, child, high_lod, near_bounds, out);
    }
}

fn desired_for_viewer(manager: &PhysicsTileManagerData, viewer: Vec3) -> Vec<TileId> {
    compute_physics_desired_tiles(
        &manager.grid,
        high_detail_lod(manager),
        coarse_lod(manager),
        Vec2::new(viewer.x, viewer.z),
        manager.config.high_detail_radius,
    )
}

/// Follow the viewer: drop bodies no longer wanted, then create new ones
/// up to the per-update cap
///
/// A body that fails to build is logged and retried on the next update for
/// as long as its tile stays desired.
pub fn update_physics_tiles(
    manager: &mut PhysicsTileManagerData,
    viewer: Vec3,
    provider: &mut dyn TileSampleProvider,
    world: &mut dyn PhysicsWorld,
) -> PhysicsUpdateReport {
    let desired = desired_for_viewer(manager, viewer);
    let cap = manager.config.max_bodies_per_update;
    sync_bodies(manager, &desired, Some(cap), provider, world)
}

/// Build every desired body at once, ignoring the per-update cap
pub fn preload_physics_tiles(
    manager: &mut PhysicsTileManagerData,
    viewer: Vec3,
    provider: &mut dyn TileSampleProvider,
    world: &mut dyn PhysicsWorld,
) -> PhysicsUpdateReport {
    let desired = desired_for_viewer(manager, viewer);
    let report = sync_bodies(manager, &desired, None, provider, world);
    log::info!(
        "[physics_tiles::preload] {} bodies created, {} failed",
        report.created,
        report.failed
    );
    report
}

fn sync_bodies(
    manager: &mut PhysicsTileManagerData,
    desired: &[TileId],
    cap: Option<u32>,
    provider: &mut dyn TileSampleProvider,
    world: &mut dyn PhysicsWorld,
) -> PhysicsUpdateReport {
    let mut report = PhysicsUpdateReport {
        desired: desired.len() as u32,
        ..Default::default()
    };

    let wanted: FxHashSet<TileKey> = desired.iter().map(|id| pack_tile_key(*id)).collect();
    let stale: Vec<TileKey> = manager
        .tiles
        .keys()
        .filter(|key| !wanted.contains(key))
        .copied()
        .collect();
    for key in stale {
        if let Some(tile) = manager.tiles.remove(&key) {
            world.remove_body(tile.body);
            log::debug!("[physics_tiles::sync] Removed body for {:?}", tile.id);
            report.removed += 1;
        }
    }

    let mut attempts = 0;
    for id in desired {
        let key = pack_tile_key(*id);
        if manager.tiles.contains_key(&key) {
            continue;
        }
        if cap.map(|cap| attempts >= cap).unwrap_or(false) {
            report.deferred += 1;
            continue;
        }
        attempts += 1;

        match create_tile_body(manager, *id, provider, world) {
            Ok(body) => {
                manager.tiles.insert(key, PhysicsTile { id: *id, body });
                log::debug!("[physics_tiles::sync] Created body {:?} for {:?}", body, id);
                report.created += 1;
            }
            Err(e) => {
                log::error!("[physics_tiles::sync] {}", e);
                report.failed += 1;
            }
        }
    }

    report
}

fn create_tile_body(
    manager: &PhysicsTileManagerData,
    id: TileId,
    provider: &mut dyn TileSampleProvider,
    world: &mut dyn PhysicsWorld,
) -> TerrainResult<BodyId> {
    let samples = provider
        .tile_samples(id)
        .map_err(|e| TerrainError::physics_body(id, format!("no samples: {}", e)))?;
    let bounds = tile_world_bounds(&manager.grid, id);

    let desc = HeightfieldDesc {
        tile: id,
        samples,
        resolution: manager.grid.tile_resolution,
        world_min_x: bounds.min_x,
        world_min_z: bounds.min_z,
        tile_world_size: tile_world_size(&manager.grid, id.lod),
        height_scale: manager.height_scale,
        min_altitude: manager.min_altitude,
    };
    world.create_heightfield_body(&desc)
}

/// Remove every body
pub fn clear_physics_tiles(manager: &mut PhysicsTileManagerData, world: &mut dyn PhysicsWorld) {
    let count = manager.tiles.len();
    for (_, tile) in manager.tiles.drain() {
        world.remove_body(tile.body);
    }
    log::info!("[physics_tiles::clear] Removed {} bodies", count);
}

/// Bounds of every tile with a body, for debug drawing
pub fn physics_tile_bounds(manager: &PhysicsTileManagerData) -> Vec<(TileId, WorldRect)> {
    let mut bounds: Vec<(TileId, WorldRect)> = manager
        .tiles
        .values()
        .map(|tile| (tile.id, tile_world_bounds(&manager.grid, tile.id)))
        .collect();
    bounds.sort_by_key(|(id, _)| *id);
    bounds
}

pub fn active_physics_tile_count(manager: &PhysicsTileManagerData) -> usize {
    manager.tiles.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::SourceSampleProvider;
    use crate::tiles::{rect_area, MemoryTileSource, TileFileSource};
    use std::sync::Arc;

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
            min_altitude: 0.0,
            max_altitude: 100.0,
            meters_per_pixel: 1.0,
        }
    }

    fn provider(metadata: &TerrainMetadata) -> SourceSampleProvider {
        let grid = tile_grid(metadata);
        let mut source = MemoryTileSource::new();
        for lod in 0..grid.num_lod_levels {
            for id in all_tiles_at_lod(&grid, lod) {
                source.insert_with(id, RESOLUTION, |_, _| 0.5);
            }
        }
        let source: Arc<dyn TileFileSource> = Arc::new(source);
        SourceSampleProvider::new(source, RESOLUTION)
    }

    /// Records bodies; refuses tiles listed in `reject`
    #[derive(Default)]
    struct MockWorld {
        next_id: u64,
        bodies: FxHashMap<BodyId, TileId>,
        removed: Vec<BodyId>,
        reject: Vec<TileId>,
        last_desc: Option<(TileId, f32, f32)>,
    }

    impl PhysicsWorld for MockWorld {
        fn create_heightfield_body(&mut self, desc: &HeightfieldDesc) -> TerrainResult<BodyId> {
            if self.reject.contains(&desc.tile) {
                return Err(TerrainError::physics_body(desc.tile, "rejected"));
            }
            assert_eq!(desc.samples.len(), (desc.resolution * desc.resolution) as usize);
            self.last_desc = Some((desc.tile, desc.world_min_x, desc.world_min_z));
            self.next_id += 1;
            let body = BodyId(self.next_id);
            self.bodies.insert(body, desc.tile);
            Ok(body)
        }

        fn remove_body(&mut self, body: BodyId) {
            self.bodies.remove(&body);
            self.removed.push(body);
        }
    }

    fn assert_exact_cover(grid: &TileGrid, tiles: &[TileId]) {
        let bounds: Vec<WorldRect> = tiles.iter().map(|id| tile_world_bounds(grid, *id)).collect();
        for (i, a) in bounds.iter().enumerate() {
            for b in bounds.iter().skip(i + 1) {
                assert!(!rect_overlaps(a, b), "{:?} overlaps {:?}", a, b);
            }
        }
        let area: f64 = bounds.iter().map(|b| rect_area(b) as f64).sum();
        let terrain = (grid.terrain_size as f64).powi(2);
        assert!((area - terrain).abs() < 1.0, "covered {} of {}", area, terrain);
    }

    #[test]
    fn test_desired_set_covers_terrain_once() {
        let grid = tile_grid(&reference_metadata());
        for viewer in [
            Vec2::ZERO,
            Vec2::new(333.0, -1200.0),
            Vec2::new(-8192.0, -8192.0),
            Vec2::new(8100.0, 40.0),
            Vec2::new(50000.0, 50000.0),
        ] {
            let desired = compute_physics_desired_tiles(&grid, 0, 3, viewer, 512.0);
            assert_exact_cover(&grid, &desired);
        }
    }

    #[test]
    fn test_cover_with_intermediate_tiers() {
        let grid = tile_grid(&reference_metadata());
        let desired = compute_physics_desired_tiles(&grid, 1, 2, Vec2::new(700.0, 700.0), 1500.0);
        assert!(desired.iter().all(|id| id.lod == 1 || id.lod == 2));
        assert_exact_cover(&grid, &desired);
    }

    #[test]
    fn test_desired_at_origin() {
        let grid = tile_grid(&reference_metadata());
        let desired = compute_physics_desired_tiles(&grid, 0, 3, Vec2::ZERO, 512.0);
        // 4 near tiles, 3+3+3 refinements per centre quadrant, 12 untouched base tiles
        assert_eq!(desired.len(), 4 + 36 + 12);
        assert_eq!(desired.iter().take(4).filter(|id| id.lod == 0).count(), 4);
    }

    #[test]
    fn test_update_respects_body_cap() {
        let metadata = reference_metadata();
        let mut manager = create_physics_tile_manager(&metadata, PhysicsConfig::default());
        let mut provider = provider(&metadata);
        let mut world = MockWorld::default();

        let report = update_physics_tiles(&mut manager, Vec3::ZERO, &mut provider, &mut world);
        assert_eq!(report.created, 2);
        assert_eq!(report.deferred, report.desired - 2);
        assert_eq!(active_physics_tile_count(&manager), 2);

        // Near tiles come first
        assert!(physics_tile_bounds(&manager).iter().all(|(id, _)| id.lod == 0));

        let mut updates = 1;
        while update_physics_tiles(&mut manager, Vec3::ZERO, &mut provider, &mut world).created > 0 {
            updates += 1;
        }
        assert_eq!(updates, 26);
        assert_eq!(active_physics_tile_count(&manager), 52);
        assert_eq!(world.bodies.len(), 52);
    }

    #[test]
    fn test_failed_body_retried() {
        let metadata = reference_metadata();
        let mut manager = create_physics_tile_manager(&metadata, PhysicsConfig::default());
        let mut provider = provider(&metadata);
        let rejected = TileId { x: 15, z: 15, lod: 0 };
        let mut world = MockWorld {
            reject: vec![rejected],
            ..Default::default()
        };

        let first = preload_physics_tiles(&mut manager, Vec3::ZERO, &mut provider, &mut world);
        assert_eq!(first.failed, 1);
        assert_eq!(first.created, 51);

        world.reject.clear();
        let retry = update_physics_tiles(&mut manager, Vec3::ZERO, &mut provider, &mut world);
        assert_eq!(retry.created, 1);
        assert!(manager.tiles.contains_key(&pack_tile_key(rejected)));
    }

    #[test]
    fn test_missing_samples_skipped() {
        let metadata = reference_metadata();
        let mut manager = create_physics_tile_manager(&metadata, PhysicsConfig::default());
        let source: Arc<dyn TileFileSource> = Arc::new(MemoryTileSource::new());
        let mut provider = SourceSampleProvider::new(source, RESOLUTION);
        let mut world = MockWorld::default();

        let report = update_physics_tiles(&mut manager, Vec3::ZERO, &mut provider, &mut world);
        assert_eq!(report.failed, 2);
        assert_eq!(report.created, 0);
        assert_eq!(active_physics_tile_count(&manager), 0);
    }

    #[test]
    fn test_moving_viewer_replaces_bodies() {
        let metadata = reference_metadata();
        let mut manager = create_physics_tile_manager(&metadata, PhysicsConfig::default());
        let mut provider = provider(&metadata);
        let mut world = MockWorld::default();

        preload_physics_tiles(&mut manager, Vec3::ZERO, &mut provider, &mut world);
        let report =
            preload_physics_tiles(&mut manager, Vec3::new(5000.0, 0.0, 5000.0), &mut provider, &mut world);

        assert!(report.removed > 0);
        assert_eq!(world.removed.len() as u32, report.removed);
        assert_eq!(world.bodies.len(), active_physics_tile_count(&manager));
        assert_eq!(active_physics_tile_count(&manager) as u32, report.desired);
        assert!(!manager
            .tiles
            .contains_key(&pack_tile_key(TileId { x: 15, z: 15, lod: 0 })));
        assert!(manager
            .tiles
            .contains_key(&pack_tile_key(TileId { x: 25, z: 25, lod: 0 })));
    }

    #[test]
    fn test_body_placement_matches_tile_bounds() {
        let metadata = reference_metadata();
        let mut manager = create_physics_tile_manager(&metadata, PhysicsConfig::default());
        let mut provider = provider(&metadata);
        let mut world = MockWorld::default();

        update_physics_tiles(&mut manager, Vec3::ZERO, &mut provider, &mut world);
        let (id, min_x, min_z) = world.last_desc.expect("body created");
        let bounds = tile_world_bounds(&manager.grid, id);
        assert_eq!((min_x, min_z), (bounds.min_x, bounds.min_z));
        assert!(physics_tile_bounds(&manager).contains(&(id, bounds)));
    }

    #[test]
    fn test_clear_removes_everything() {
        let metadata = reference_metadata();
        let mut manager = create_physics_tile_manager(&metadata, PhysicsConfig::default());
        let mut provider = provider(&metadata);
        let mut world = MockWorld::default();

        preload_physics_tiles(&mut manager, Vec3::ZERO, &mut provider, &mut world);
        clear_physics_tiles(&mut manager, &mut world);
        assert_eq!(active_physics_tile_count(&manager), 0);
        assert!(world.bodies.is_empty());
    }

    #[test]
    fn test_tier_levels_clamped() {
        let metadata = reference_metadata();
        let config = PhysicsConfig {
            high_detail_lod: 5,
            coarse_lod: Some(9),
            ..PhysicsConfig::default()
        };
        let manager = create_physics_tile_manager(&metadata, config);
        assert_eq!(coarse_lod(&manager), 3);
        assert_eq!(high_detail_lod(&manager), 3);
    }
}
