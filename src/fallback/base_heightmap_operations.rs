//! Base Heightmap Operations - Pure DOP Functions
//!
//! Loading of the base LOD and fallback height sampling.

use super::base_heightmap_data::{BaseHeightmapData, CombinedSurface};
use crate::error::{TerrainError, TerrainResult};
use crate::tiles::{
    all_tiles_at_lod, base_lod, sample_bilinear, sample_tile_normalized, tile_world_bounds,
    tiles_at_lod, world_to_tile_coord, Tile, TileGrid, TileId,
};

/// Load every base LOD tile through `loader`
///
/// Partial failure is tolerated with a warning. Fails only when no base tile
/// loads at all.
pub fn load_base_tiles<F>(grid: TileGrid, mut loader: F) -> TerrainResult<BaseHeightmapData>
where
    F: FnMut(TileId) -> TerrainResult<Vec<f32>>,
{
    let lod = base_lod(&grid);
    let (tiles_x, tiles_z) = tiles_at_lod(&grid, lod);
    let attempted = tiles_x * tiles_z;

    let mut tiles = Vec::with_capacity(attempted as usize);
    let mut loaded_count = 0;

    for id in all_tiles_at_lod(&grid, lod) {
        match loader(id) {
            Ok(heights) => {
                tiles.push(Some(Tile {
                    id,
                    heights,
                    bounds: tile_world_bounds(&grid, id),
                    slot_index: None,
                }));
                loaded_count += 1;
            }
            Err(e) => {
                log::warn!("[base_heightmap::load_base_tiles] {}", e);
                tiles.push(None);
            }
        }
    }

    if loaded_count == 0 {
        return Err(TerrainError::NoBaseTiles { lod, attempted });
    }

    if loaded_count < attempted {
        log::warn!(
            "[base_heightmap::load_base_tiles] Only {}/{} base tiles loaded at LOD{}, gaps read as height 0",
            loaded_count,
            attempted,
            lod
        );
    } else {
        log::info!(
            "[base_heightmap::load_base_tiles] Loaded {} base tiles at LOD{}",
            loaded_count,
            lod
        );
    }

    Ok(BaseHeightmapData {
        grid,
        base_lod: lod,
        tiles_x,
        tiles_z,
        tiles,
        loaded_count,
        combined: None,
    })
}

/// Base tile by identity, if it loaded
pub fn base_tile(data: &BaseHeightmapData, id: TileId) -> Option<&Tile> {
    if id.lod != data.base_lod
        || id.x < 0
        || id.z < 0
        || id.x >= data.tiles_x as i32
        || id.z >= data.tiles_z as i32
    {
        return None;
    }
    let index = id.z as usize * data.tiles_x as usize + id.x as usize;
    data.tiles.get(index)?.as_ref()
}

/// Normalized height from the base tile covering a world point
///
/// Points off the terrain read the nearest edge tile. `None` only when that
/// cell's base tile never loaded.
pub fn sample_fallback(data: &BaseHeightmapData, world_x: f32, world_z: f32) -> Option<f32> {
    let id = world_to_tile_coord(&data.grid, world_x, world_z, data.base_lod);
    let tile = base_tile(data, id)?;

    sample_tile_normalized(tile, data.grid.tile_resolution, world_x, world_z).or_else(|| {
        // Off-terrain or exactly on the far edge: clamp into the tile
        let bounds = &tile.bounds;
        let u = (world_x - bounds.min_x) / (bounds.max_x - bounds.min_x);
        let v = (world_z - bounds.min_z) / (bounds.max_z - bounds.min_z);
        Some(sample_bilinear(&tile.heights, data.grid.tile_resolution, u, v))
    })
}

/// Resample the base tiles into one capped-resolution surface
pub fn build_combined_surface(data: &mut BaseHeightmapData, max_resolution: u32) {
    let full_resolution = data.tiles_x.max(data.tiles_z) * data.grid.tile_resolution;
    let resolution = full_resolution.min(max_resolution).max(2);
    let terrain_size = data.grid.terrain_size;
    let step = 1.0 / (resolution - 1) as f32;

    let mut samples = Vec::with_capacity(resolution as usize * resolution as usize);
    for row in 0..resolution {
        let world_z = (row as f32 * step - 0.5) * terrain_size;
        for col in 0..resolution {
            let world_x = (col as f32 * step - 0.5) * terrain_size;
            samples.push(sample_fallback(data, world_x, world_z).unwrap_or(0.0));
        }
    }

    log::info!(
        "[base_heightmap::build_combined_surface] Built {}x{} fallback surface (full resolution {})",
        resolution,
        resolution,
        full_resolution
    );

    data.combined = Some(CombinedSurface {
        resolution,
        terrain_size,
        samples,
    });
}

/// Bilinear sample of the combined surface, as the GPU fallback texture sees it
pub fn sample_combined_surface(surface: &CombinedSurface, world_x: f32, world_z: f32) -> f32 {
    let u = world_x / surface.terrain_size + 0.5;
    let v = world_z / surface.terrain_size + 0.5;
    sample_bilinear(&surface.samples, surface.resolution, u, v)
}
