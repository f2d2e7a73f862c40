//! Tile streaming cache
//!
//! Keeps the resident tile set matched to the viewer under a per-update
//! load budget, feeds the GPU slot pool and tile info ring, answers height
//! queries and owns the hole overlay.

pub mod hole_data;
pub mod hole_operations;
pub mod lod_policy;
pub mod tile_cache_data;
pub mod tile_cache_operations;

pub use hole_data::{HoleCircle, HoleMask, HoleOverlayData};
pub use hole_operations::{mask_is_hole, rasterize_holes};
pub use lod_policy::{compute_desired_tiles, lod_for_distance};
pub use tile_cache_data::{StreamingStats, TileStreamingCacheData, UpdateReport};
pub use tile_cache_operations::{
    active_tiles, add_hole_circle, create_tile_cache, fallback_surface, get_fallback_height_at,
    get_height_at, is_hole, is_tile_resident, open_tile_cache, preload_tiles_around,
    publish_frame, refresh_hole_mask, remove_hole_circle, request_tile_cpu, resident_tile,
    resident_tile_count, set_frame_index, slotted_tile_count, streaming_stats, terrain_bounds,
    tile_info_buffer, tiles_touched_by_hole, update_tile_cache, update_tile_cache_with_radii,
};
