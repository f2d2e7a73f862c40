//! Data-Oriented World Rectangle Operations
//!
//! Pure functions on `WorldRect` - no methods, just data transformations.

use super::tile_data::WorldRect;
use glam::Vec2;

/// Create rectangle from min/max corners
pub fn create_rect(min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> WorldRect {
    WorldRect {
        min_x,
        min_z,
        max_x,
        max_z,
    }
}

/// Centre point of a rectangle
pub fn rect_center(rect: &WorldRect) -> Vec2 {
    Vec2::new(
        (rect.min_x + rect.max_x) * 0.5,
        (rect.min_z + rect.max_z) * 0.5,
    )
}

/// Width and depth of a rectangle
pub fn rect_size(rect: &WorldRect) -> Vec2 {
    Vec2::new(rect.max_x - rect.min_x, rect.max_z - rect.min_z)
}

pub fn rect_area(rect: &WorldRect) -> f32 {
    let size = rect_size(rect);
    size.x.max(0.0) * size.y.max(0.0)
}

/// Half-open containment test: min edges inclusive, max edges exclusive
///
/// Neighbouring tiles share an edge, so exactly one of them owns any point
/// on it.
pub fn rect_contains_point(rect: &WorldRect, x: f32, z: f32) -> bool {
    x >= rect.min_x && x < rect.max_x && z >= rect.min_z && z < rect.max_z
}

/// Test if two rectangles share interior area
///
/// Touching edges do not count as overlap.
pub fn rect_overlaps(a: &WorldRect, b: &WorldRect) -> bool {
    a.min_x < b.max_x && a.max_x > b.min_x && a.min_z < b.max_z && a.max_z > b.min_z
}

/// Area shared by two rectangles (0 when disjoint)
pub fn rect_intersection_area(a: &WorldRect, b: &WorldRect) -> f32 {
    let width = a.max_x.min(b.max_x) - a.min_x.max(b.min_x);
    let depth = a.max_z.min(b.max_z) - a.min_z.max(b.min_z);
    if width <= 0.0 || depth <= 0.0 {
        0.0
    } else {
        width * depth
    }
}

/// Distance from a point to the nearest point of the rectangle (0 inside)
pub fn rect_distance_to_point(rect: &WorldRect, x: f32, z: f32) -> f32 {
    let clamped_x = x.clamp(rect.min_x, rect.max_x);
    let clamped_z = z.clamp(rect.min_z, rect.max_z);
    Vec2::new(x - clamped_x, z - clamped_z).length()
}
