//! Hole Operations - Pure DOP Functions

use super::hole_data::{HoleCircle, HoleMask, HoleOverlayData};
use crate::constants::HOLE_MATCH_TOLERANCE;
use crate::tiles::{rect_distance_to_point, WorldRect};

pub fn add_hole(overlay: &mut HoleOverlayData, center_x: f32, center_z: f32, radius: f32) {
    overlay.holes.push(HoleCircle {
        center_x,
        center_z,
        radius,
    });
    overlay.mask_dirty = true;
}

/// Remove every hole matching centre and radius within tolerance
pub fn remove_hole(overlay: &mut HoleOverlayData, center_x: f32, center_z: f32, radius: f32) -> bool {
    let before = overlay.holes.len();
    overlay.holes.retain(|hole| {
        !((hole.center_x - center_x).abs() < HOLE_MATCH_TOLERANCE
            && (hole.center_z - center_z).abs() < HOLE_MATCH_TOLERANCE
            && (hole.radius - radius).abs() < HOLE_MATCH_TOLERANCE)
    });

    let removed = overlay.holes.len() != before;
    if removed {
        overlay.mask_dirty = true;
    }
    removed
}

pub fn circle_contains(hole: &HoleCircle, x: f32, z: f32) -> bool {
    let dx = x - hole.center_x;
    let dz = z - hole.center_z;
    dx * dx + dz * dz <= hole.radius * hole.radius
}

/// Analytic hole test, independent of the mask
pub fn point_in_hole(overlay: &HoleOverlayData, x: f32, z: f32) -> bool {
    overlay.holes.iter().any(|hole| circle_contains(hole, x, z))
}

/// Rasterize holes over a rectangle at texel centres
///
/// Each radius is grown by half a texel so a hole never vanishes between
/// texel centres.
pub fn rasterize_holes(bounds: &WorldRect, resolution: u32, holes: &[HoleCircle]) -> HoleMask {
    let texel_x = (bounds.max_x - bounds.min_x) / resolution as f32;
    let texel_z = (bounds.max_z - bounds.min_z) / resolution as f32;
    let inflate = 0.5 * texel_x.max(texel_z);

    let mut texels = vec![0u8; resolution as usize * resolution as usize];

    for hole in holes {
        let grown = HoleCircle {
            radius: hole.radius + inflate,
            ..*hole
        };

        // Only visit texels under the circle's bounding box
        let to_col = |x: f32| ((x - bounds.min_x) / texel_x).floor() as i64;
        let to_row = |z: f32| ((z - bounds.min_z) / texel_z).floor() as i64;
        let max_index = resolution as i64 - 1;
        let col_start = to_col(grown.center_x - grown.radius).clamp(0, max_index);
        let col_end = to_col(grown.center_x + grown.radius).clamp(0, max_index);
        let row_start = to_row(grown.center_z - grown.radius).clamp(0, max_index);
        let row_end = to_row(grown.center_z + grown.radius).clamp(0, max_index);

        for row in row_start..=row_end {
            let z = bounds.min_z + (row as f32 + 0.5) * texel_z;
            for col in col_start..=col_end {
                let x = bounds.min_x + (col as f32 + 0.5) * texel_x;
                if circle_contains(&grown, x, z) {
                    texels[row as usize * resolution as usize + col as usize] = 255;
                }
            }
        }
    }

    HoleMask {
        bounds: *bounds,
        resolution,
        texels,
    }
}

/// Mask texel at a world point (false off the mask)
pub fn mask_is_hole(mask: &HoleMask, x: f32, z: f32) -> bool {
    let u = (x - mask.bounds.min_x) / (mask.bounds.max_x - mask.bounds.min_x);
    let v = (z - mask.bounds.min_z) / (mask.bounds.max_z - mask.bounds.min_z);
    if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
        return false;
    }
    let col = (u * mask.resolution as f32) as usize;
    let row = (v * mask.resolution as f32) as usize;
    mask.texels
        .get(row * mask.resolution as usize + col)
        .map(|texel| *texel > 127)
        .unwrap_or(false)
}

/// Rebuild the mask if the hole list changed since the last rebuild
pub fn refresh_mask<'a>(
    overlay: &'a mut HoleOverlayData,
    bounds: &WorldRect,
    resolution: u32,
) -> &'a HoleMask {
    let stale = overlay.mask_dirty
        || overlay
            .mask
            .as_ref()
            .map(|mask| mask.bounds != *bounds || mask.resolution != resolution)
            .unwrap_or(true);

    if stale {
        log::debug!(
            "[holes::refresh_mask] Rasterizing {} holes at {}x{}",
            overlay.holes.len(),
            resolution,
            resolution
        );
        overlay.mask = Some(rasterize_holes(bounds, resolution, &overlay.holes));
        overlay.mask_dirty = false;
    }

    overlay
        .mask
        .get_or_insert_with(|| rasterize_holes(bounds, resolution, &[]))
}

/// Whether a hole reaches into a rectangle
pub fn hole_touches_rect(hole: &HoleCircle, rect: &WorldRect) -> bool {
    rect_distance_to_point(rect, hole.center_x, hole.center_z) <= hole.radius
}
