//! Tile identity, grid geometry and tile sources

pub mod tile_data;
pub mod tile_operations;
pub mod tile_source;
pub mod world_rect;

pub use tile_data::{RawTileSamples, Tile, TileGrid, TileId, TileKey, TileRange, WorldRect};
pub use tile_operations::{
    all_tiles_at_lod, base_lod, child_tiles, is_valid_tile, pack_tile_key, sample_bilinear,
    sample_tile_normalized, tile_center, tile_range_in_radius, tile_world_bounds,
    tile_world_size, tiles_at_lod, tiles_in_range, to_world_height, unpack_tile_key,
    world_to_tile_coord,
};
pub use tile_source::{
    decode_tile, tile_file_name, tile_path, MemoryTileSource, PngTileSource, TileFileSource,
};
pub use world_rect::{
    create_rect, rect_area, rect_center, rect_contains_point, rect_distance_to_point,
    rect_intersection_area, rect_overlaps, rect_size,
};
