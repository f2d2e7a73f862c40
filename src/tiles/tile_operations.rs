//! Tile Operations - Pure DOP Functions
//!
//! Identity packing, grid geometry and height sampling.
//! No methods, no self, just transformations.

use super::tile_data::{Tile, TileGrid, TileId, TileKey, TileRange, WorldRect};
use super::world_rect::{create_rect, rect_center, rect_contains_point};
use glam::Vec2;

const KEY_COORD_MASK: u64 = 0x00FF_FFFF;

// ============================================================================
// IDENTITY
// ============================================================================

/// Pack a tile identity into a single lookup key
///
/// Injective for every valid grid coordinate (x, z < 2^24).
pub fn pack_tile_key(id: TileId) -> TileKey {
    ((id.lod as u64) << 48) | ((id.x as u32 as u64) << 24) | (id.z as u32 as u64)
}

/// Recover the tile identity from a packed key
pub fn unpack_tile_key(key: TileKey) -> TileId {
    TileId {
        x: ((key >> 24) & KEY_COORD_MASK) as i32,
        z: (key & KEY_COORD_MASK) as i32,
        lod: (key >> 48) as u32,
    }
}

// ============================================================================
// GRID GEOMETRY
// ============================================================================

/// Coarsest LOD level; its tiles cover the whole terrain
pub fn base_lod(grid: &TileGrid) -> u32 {
    grid.num_lod_levels.saturating_sub(1)
}

/// Tile count per axis at a LOD level (never below 1)
pub fn tiles_at_lod(grid: &TileGrid, lod: u32) -> (u32, u32) {
    let shift = lod.min(31);
    ((grid.tiles_x >> shift).max(1), (grid.tiles_z >> shift).max(1))
}

/// World-space size of one tile at a LOD level
pub fn tile_world_size(grid: &TileGrid, lod: u32) -> Vec2 {
    let (tiles_x, tiles_z) = tiles_at_lod(grid, lod);
    Vec2::new(
        grid.terrain_size / tiles_x as f32,
        grid.terrain_size / tiles_z as f32,
    )
}

/// World bounds of a tile (terrain centred on the origin)
pub fn tile_world_bounds(grid: &TileGrid, id: TileId) -> WorldRect {
    let (tiles_x, tiles_z) = tiles_at_lod(grid, id.lod);
    let size = tile_world_size(grid, id.lod);
    let min_x = (id.x as f32 / tiles_x as f32 - 0.5) * grid.terrain_size;
    let min_z = (id.z as f32 / tiles_z as f32 - 0.5) * grid.terrain_size;
    create_rect(min_x, min_z, min_x + size.x, min_z + size.y)
}

pub fn tile_center(grid: &TileGrid, id: TileId) -> Vec2 {
    rect_center(&tile_world_bounds(grid, id))
}

/// Check if a tile coordinate exists at its LOD
pub fn is_valid_tile(grid: &TileGrid, id: TileId) -> bool {
    let (tiles_x, tiles_z) = tiles_at_lod(grid, id.lod);
    id.lod < grid.num_lod_levels
        && id.x >= 0
        && id.z >= 0
        && id.x < tiles_x as i32
        && id.z < tiles_z as i32
}

/// Tile covering a world position at a LOD, clamped to the grid
pub fn world_to_tile_coord(grid: &TileGrid, world_x: f32, world_z: f32, lod: u32) -> TileId {
    let (tiles_x, tiles_z) = tiles_at_lod(grid, lod);
    let size = tile_world_size(grid, lod);
    let half = grid.terrain_size * 0.5;

    let x = ((world_x + half) / size.x).floor() as i32;
    let z = ((world_z + half) / size.y).floor() as i32;

    TileId {
        x: x.clamp(0, tiles_x as i32 - 1),
        z: z.clamp(0, tiles_z as i32 - 1),
        lod,
    }
}

/// Tile-index rectangle that could fall within `radius` of `center`
///
/// Returns `None` when the square around the centre misses the grid.
pub fn tile_range_in_radius(
    grid: &TileGrid,
    center: Vec2,
    radius: f32,
    lod: u32,
) -> Option<TileRange> {
    let (tiles_x, tiles_z) = tiles_at_lod(grid, lod);
    let size = tile_world_size(grid, lod);
    let half = grid.terrain_size * 0.5;

    let min_x = ((center.x - radius + half) / size.x).floor() as i32;
    let max_x = ((center.x + radius + half) / size.x).floor() as i32;
    let min_z = ((center.y - radius + half) / size.y).floor() as i32;
    let max_z = ((center.y + radius + half) / size.y).floor() as i32;

    let range = TileRange {
        lod,
        min_x: min_x.max(0),
        max_x: max_x.min(tiles_x as i32 - 1),
        min_z: min_z.max(0),
        max_z: max_z.min(tiles_z as i32 - 1),
    };

    if range.min_x > range.max_x || range.min_z > range.max_z {
        None
    } else {
        Some(range)
    }
}

/// Every tile in a range, row by row (z outer, x inner)
pub fn tiles_in_range(range: &TileRange) -> impl Iterator<Item = TileId> {
    let TileRange {
        lod,
        min_x,
        max_x,
        min_z,
        max_z,
    } = *range;
    (min_z..=max_z).flat_map(move |z| (min_x..=max_x).map(move |x| TileId { x, z, lod }))
}

/// Every tile at one LOD level
pub fn all_tiles_at_lod(grid: &TileGrid, lod: u32) -> impl Iterator<Item = TileId> {
    let (tiles_x, tiles_z) = tiles_at_lod(grid, lod);
    tiles_in_range(&TileRange {
        lod,
        min_x: 0,
        max_x: tiles_x as i32 - 1,
        min_z: 0,
        max_z: tiles_z as i32 - 1,
    })
}

/// The four tiles one LOD finer that subdivide `id`
///
/// Requires nested grids (tile counts divisible by 2 per level), which
/// metadata validation enforces. Returns an empty list at LOD0.
pub fn child_tiles(grid: &TileGrid, id: TileId) -> Vec<TileId> {
    if id.lod == 0 {
        return Vec::new();
    }

    let lod = id.lod - 1;
    let mut children = Vec::with_capacity(4);
    for dz in 0..2 {
        for dx in 0..2 {
            let child = TileId {
                x: id.x * 2 + dx,
                z: id.z * 2 + dz,
                lod,
            };
            if is_valid_tile(grid, child) {
                children.push(child);
            }
        }
    }
    children
}

// ============================================================================
// HEIGHT SAMPLING
// ============================================================================

/// Bilinearly sample a square grid of samples at unit UV
///
/// UV is clamped to [0, 1]; u=0 is the first column, u=1 the last.
pub fn sample_bilinear(heights: &[f32], resolution: u32, u: f32, v: f32) -> f32 {
    if resolution < 2 {
        return heights.first().copied().unwrap_or(0.0);
    }

    let max_index = resolution as usize - 1;
    let fx = u.clamp(0.0, 1.0) * max_index as f32;
    let fy = v.clamp(0.0, 1.0) * max_index as f32;

    let x0 = (fx as usize).min(max_index);
    let y0 = (fy as usize).min(max_index);
    let x1 = (x0 + 1).min(max_index);
    let y1 = (y0 + 1).min(max_index);

    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let row = resolution as usize;
    let at = |x: usize, y: usize| heights.get(y * row + x).copied().unwrap_or(0.0);

    let h0 = at(x0, y0) * (1.0 - tx) + at(x1, y0) * tx;
    let h1 = at(x0, y1) * (1.0 - tx) + at(x1, y1) * tx;
    h0 * (1.0 - ty) + h1 * ty
}

/// Normalized sample to world altitude
pub fn to_world_height(normalized: f32, height_scale: f32, min_altitude: f32) -> f32 {
    normalized * height_scale + min_altitude
}

/// Normalized height of a tile at a world position, if the tile covers it
pub fn sample_tile_normalized(tile: &Tile, resolution: u32, world_x: f32, world_z: f32) -> Option<f32> {
    if tile.heights.is_empty() || !rect_contains_point(&tile.bounds, world_x, world_z) {
        return None;
    }

    let u = (world_x - tile.bounds.min_x) / (tile.bounds.max_x - tile.bounds.min_x);
    let v = (world_z - tile.bounds.min_z) / (tile.bounds.max_z - tile.bounds.min_z);
    Some(sample_bilinear(&tile.heights, resolution, u, v))
}
