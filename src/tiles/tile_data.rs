//! Tile Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in tile_operations.rs

/// Grid coordinate of one tile at one LOD
///
/// `x` and `z` are tile-grid indices, not world coordinates, and are always
/// within `[0, tiles_at_lod)` for the tile's LOD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub x: i32,
    pub z: i32,
    pub lod: u32,
}

/// Packed `(lod << 48) | (x << 24) | z` lookup key
pub type TileKey = u64;

/// Axis-aligned world-space rectangle on the XZ plane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldRect {
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
}

/// Tile grid geometry shared by every consumer
///
/// The terrain is centred on the world origin and spans
/// `[-terrain_size / 2, terrain_size / 2]` on both axes. LOD0 has
/// `tiles_x * tiles_z` tiles; each coarser level halves the count per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub terrain_size: f32,
    pub tiles_x: u32,
    pub tiles_z: u32,
    pub num_lod_levels: u32,
    pub tile_resolution: u32,
}

/// A resident terrain tile
///
/// `heights` holds `tile_resolution²` normalized samples in `[0, 1]`.
/// `slot_index` is `None` until the tile is uploaded to the tile array pool;
/// such a tile still answers CPU height queries.
#[derive(Debug, Clone)]
pub struct Tile {
    pub id: TileId,
    pub heights: Vec<f32>,
    pub bounds: WorldRect,
    pub slot_index: Option<u32>,
}

/// Decoded samples straight from a tile source, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct RawTileSamples {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<f32>,
}

/// Inclusive tile-index rectangle at one LOD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub lod: u32,
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}
