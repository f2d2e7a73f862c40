//! Permanently resident base LOD and the combined fallback surface

pub mod base_heightmap_data;
pub mod base_heightmap_operations;

pub use base_heightmap_data::{BaseHeightmapData, CombinedSurface};
pub use base_heightmap_operations::{
    base_tile, build_combined_surface, load_base_tiles, sample_combined_surface, sample_fallback,
};
