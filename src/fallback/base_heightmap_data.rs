//! Base Heightmap Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in base_heightmap_operations.rs

use crate::tiles::{Tile, TileGrid};

/// Every tile of the coarsest LOD, loaded once and never evicted
///
/// `tiles` is row-major over the base level's grid; `None` marks a base tile
/// that failed to load (its cells answer height 0 in the combined surface).
#[derive(Debug, Clone)]
pub struct BaseHeightmapData {
    pub grid: TileGrid,
    pub base_lod: u32,
    pub tiles_x: u32,
    pub tiles_z: u32,
    pub tiles: Vec<Option<Tile>>,
    pub loaded_count: u32,
    pub combined: Option<CombinedSurface>,
}

/// One resampled height field over the whole terrain
///
/// Normalized samples, row-major, `resolution²` of them. Pixel `(0, 0)` sits
/// on the terrain's minimum corner and pixel `(res-1, res-1)` on its maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedSurface {
    pub resolution: u32,
    pub terrain_size: f32,
    pub samples: Vec<f32>,
}
