//! Tile Array Pool Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in tile_array_pool_operations.rs

use super::slot_uploader::GpuSlotUploader;

/// Fixed-capacity set of GPU array slots
///
/// `occupied[i]` is true while some resident tile holds slot `i`. Tiles store
/// the index, never a reference into the pool.
pub struct TileArrayPoolData {
    pub occupied: Vec<bool>,
    /// Samples per slot (`tile_resolution²`)
    pub slot_sample_count: usize,
    pub tile_resolution: u32,
    pub uploader: Box<dyn GpuSlotUploader>,
}
