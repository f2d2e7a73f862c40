//! Hole Data - Pure DOP
//!
//! NO METHODS. Just data.
//! All transformations happen in hole_operations.rs

use crate::tiles::WorldRect;

/// Circular region with no ground
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoleCircle {
    pub center_x: f32,
    pub center_z: f32,
    pub radius: f32,
}

/// Rasterized holes over a rectangle (255 = hole, 0 = solid), row-major
#[derive(Debug, Clone, PartialEq)]
pub struct HoleMask {
    pub bounds: WorldRect,
    pub resolution: u32,
    pub texels: Vec<u8>,
}

/// Hole list plus its lazily rebuilt mask
///
/// The list is authoritative. The mask is only a GPU cue and may lag behind
/// it while `mask_dirty` is set.
#[derive(Debug, Clone, Default)]
pub struct HoleOverlayData {
    pub holes: Vec<HoleCircle>,
    pub mask_dirty: bool,
    pub mask: Option<HoleMask>,
}
