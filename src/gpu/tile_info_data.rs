//! Tile Info Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in tile_info_operations.rs

use bytemuck::{Pod, Zeroable};

/// Buffer header; padded to 16 bytes for storage buffer alignment
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TileInfoHeader {
    pub count: u32,
    pub _padding: [u32; 3],
}

/// One slotted tile as the sampling shader sees it
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TileInfoGpu {
    /// min_x, min_z, max_x, max_z
    pub world_bounds: [f32; 4],
    /// scale_u, scale_v, offset_u, offset_v: `uv = world * scale + offset`
    pub uv_scale_offset: [f32; 4],
    /// x = array layer, rest unused
    pub layer_index: [i32; 4],
}

/// Ring of per-frame tile info buffers
///
/// Buffer `f % frames.len()` belongs to frame `f`. The caller publishes into
/// the frame about to be submitted, never one the GPU may still be reading.
#[derive(Debug, Clone)]
pub struct TileInfoPublisherData {
    pub frames: Vec<Vec<u8>>,
    /// Records each buffer can hold (the slot capacity)
    pub capacity: u32,
    pub last_published_frame: Option<u32>,
}
