//! Distance-based LOD selection
//!
//! Decides which tiles the viewer wants right now. A tile is wanted at level
//! `L` only when `L` is the ideal level for the tile's own centre distance,
//! so each region is requested at a single LOD.

use crate::tiles::{
    rect_overlaps, tile_center, tile_range_in_radius, tile_world_bounds, tiles_in_range, TileGrid,
    TileId, WorldRect,
};
use glam::Vec2;

/// Ideal LOD for a centre distance
///
/// `thresholds[i]` is the exclusive upper distance of LOD `i`. Distances past
/// every usable threshold return `None` (fallback only).
pub fn lod_for_distance(distance: f32, thresholds: &[f32], num_levels: u32) -> Option<u32> {
    thresholds
        .iter()
        .take(num_levels as usize)
        .position(|threshold| distance < *threshold)
        .map(|lod| lod as u32)
}

/// Tiles that should be resident for a viewer, in discovery order
///
/// Levels are scanned finest first over `0..num_levels-1`; the base level is
/// always resident through the fallback and never streamed. Within a level
/// tiles come row by row. A coarser candidate that shares area with a finer
/// one is dropped, so no point is claimed by two levels.
pub fn compute_desired_tiles(
    grid: &TileGrid,
    thresholds: &[f32],
    viewer: Vec2,
    load_radius: f32,
) -> Vec<TileId> {
    let streamed_levels = grid.num_lod_levels.saturating_sub(1);
    let mut desired: Vec<TileId> = Vec::new();
    let mut claimed: Vec<WorldRect> = Vec::new();

    for lod in 0..streamed_levels {
        let Some(range) = tile_range_in_radius(grid, viewer, load_radius, lod) else {
            continue;
        };

        let mut level_bounds = Vec::new();
        for id in tiles_in_range(&range) {
            let distance = tile_center(grid, id).distance(viewer);
            if distance >= load_radius {
                continue;
            }
            if lod_for_distance(distance, thresholds, grid.num_lod_levels) != Some(lod) {
                continue;
            }

            let bounds = tile_world_bounds(grid, id);
            if claimed.iter().any(|finer| rect_overlaps(finer, &bounds)) {
                continue;
            }

            desired.push(id);
            level_bounds.push(bounds);
        }
        claimed.extend(level_bounds);
    }

    desired
}
