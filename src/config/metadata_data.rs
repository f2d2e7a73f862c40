//! Metadata Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in metadata_operations.rs

/// Terrain description read from `terrain_tiles.meta`
///
/// Written once by the tile baker; the streaming core only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMetadata {
    pub tile_resolution: u32,
    pub num_lod_levels: u32,
    pub tiles_x: u32,
    pub tiles_z: u32,
    pub terrain_size: f32,
    pub source_width: u32,
    pub source_height: u32,
    pub min_altitude: f32,
    pub max_altitude: f32,
    pub meters_per_pixel: f32,
}
