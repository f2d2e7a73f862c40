//! Tile Info Operations - Pure DOP Functions
//!
//! Serializes the slotted part of the resident set into the per-frame ring.

use super::tile_info_data::{TileInfoGpu, TileInfoHeader, TileInfoPublisherData};
use crate::tiles::Tile;

pub const HEADER_SIZE: usize = std::mem::size_of::<TileInfoHeader>();
pub const RECORD_SIZE: usize = std::mem::size_of::<TileInfoGpu>();

/// Bytes needed for one frame's buffer
pub fn tile_info_buffer_size(capacity: u32) -> usize {
    HEADER_SIZE + RECORD_SIZE * capacity as usize
}

/// Create the ring; every buffer starts as an empty list
pub fn create_tile_info_publisher(frames_in_flight: u32, capacity: u32) -> TileInfoPublisherData {
    let frames_in_flight = frames_in_flight.max(1);
    let size = tile_info_buffer_size(capacity);

    TileInfoPublisherData {
        frames: vec![vec![0u8; size]; frames_in_flight as usize],
        capacity,
        last_published_frame: None,
    }
}

/// Ring position for a frame index
pub fn frame_slot(publisher: &TileInfoPublisherData, frame_index: u32) -> usize {
    frame_index as usize % publisher.frames.len()
}

/// Shader record for a tile, or `None` if the tile has no slot
pub fn build_tile_info(tile: &Tile) -> Option<TileInfoGpu> {
    let slot = tile.slot_index?;
    let bounds = &tile.bounds;
    let size_x = bounds.max_x - bounds.min_x;
    let size_z = bounds.max_z - bounds.min_z;

    Some(TileInfoGpu {
        world_bounds: [bounds.min_x, bounds.min_z, bounds.max_x, bounds.max_z],
        uv_scale_offset: [
            1.0 / size_x,
            1.0 / size_z,
            -bounds.min_x / size_x,
            -bounds.min_z / size_z,
        ],
        layer_index: [slot as i32, 0, 0, 0],
    })
}

/// Write the frame's buffer from the active tiles
///
/// Tiles without a slot are skipped; their absence tells the shader to use
/// the fallback texture. Returns the record count written.
pub fn publish_tile_info(
    publisher: &mut TileInfoPublisherData,
    frame_index: u32,
    active_tiles: &[&Tile],
) -> u32 {
    let capacity = publisher.capacity as usize;
    let slot = frame_slot(publisher, frame_index);
    let buffer = &mut publisher.frames[slot];

    let mut count = 0usize;
    for info in active_tiles.iter().filter_map(|tile| build_tile_info(tile)) {
        if count == capacity {
            log::warn!(
                "[tile_info::publish] More slotted tiles than buffer capacity {}, truncating",
                capacity
            );
            break;
        }
        let offset = HEADER_SIZE + count * RECORD_SIZE;
        buffer[offset..offset + RECORD_SIZE].copy_from_slice(bytemuck::bytes_of(&info));
        count += 1;
    }

    let header = TileInfoHeader {
        count: count as u32,
        _padding: [0; 3],
    };
    buffer[..HEADER_SIZE].copy_from_slice(bytemuck::bytes_of(&header));

    publisher.last_published_frame = Some(frame_index);
    count as u32
}

/// Bytes of the buffer owned by a frame
pub fn frame_buffer(publisher: &TileInfoPublisherData, frame_index: u32) -> &[u8] {
    &publisher.frames[frame_slot(publisher, frame_index)]
}

/// Read a tile info buffer back into records
pub fn decode_tile_info(bytes: &[u8]) -> Vec<TileInfoGpu> {
    if bytes.len() < HEADER_SIZE {
        return Vec::new();
    }

    let header: TileInfoHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_SIZE]);
    let available = (bytes.len() - HEADER_SIZE) / RECORD_SIZE;
    let count = (header.count as usize).min(available);

    (0..count)
        .map(|i| {
            let offset = HEADER_SIZE + i * RECORD_SIZE;
            bytemuck::pod_read_unaligned(&bytes[offset..offset + RECORD_SIZE])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::{create_rect, TileId};

    fn tile(x: i32, slot: Option<u32>) -> Tile {
        let min_x = x as f32 * 100.0;
        Tile {
            id: TileId { x, z: 0, lod: 0 },
            heights: Vec::new(),
            bounds: create_rect(min_x, 0.0, min_x + 100.0, 50.0),
            slot_index: slot,
        }
    }

    #[test]
    fn test_record_layout() {
        assert_eq!(HEADER_SIZE, 16);
        assert_eq!(RECORD_SIZE, 48);
        assert_eq!(tile_info_buffer_size(64), 16 + 48 * 64);
    }

    #[test]
    fn test_ring_starts_empty() {
        let publisher = create_tile_info_publisher(3, 8);
        for frame in 0..3 {
            assert!(decode_tile_info(frame_buffer(&publisher, frame)).is_empty());
        }
    }

    #[test]
    fn test_uv_transform_maps_bounds_to_unit() {
        let info = build_tile_info(&tile(2, Some(5))).expect("slotted tile");
        let [scale_u, scale_v, offset_u, offset_v] = info.uv_scale_offset;
        assert!((200.0 * scale_u + offset_u).abs() < 1e-6);
        assert!((300.0 * scale_u + offset_u - 1.0).abs() < 1e-6);
        assert!((50.0 * scale_v + offset_v - 1.0).abs() < 1e-6);
        assert_eq!(info.layer_index, [5, 0, 0, 0]);
    }

    #[test]
    fn test_publish_skips_unslotted() {
        let mut publisher = create_tile_info_publisher(3, 8);
        let a = tile(0, Some(3));
        let b = tile(1, None);
        let c = tile(2, Some(0));

        let count = publish_tile_info(&mut publisher, 7, &[&a, &b, &c]);
        assert_eq!(count, 2);

        let records = decode_tile_info(frame_buffer(&publisher, 7));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].layer_index[0], 3);
        assert_eq!(records[1].world_bounds, [200.0, 0.0, 300.0, 50.0]);
    }

    #[test]
    fn test_publish_leaves_other_frames_untouched() {
        let mut publisher = create_tile_info_publisher(3, 8);
        let a = tile(0, Some(0));
        publish_tile_info(&mut publisher, 0, &[&a]);
        publish_tile_info(&mut publisher, 1, &[]);

        assert_eq!(decode_tile_info(frame_buffer(&publisher, 0)).len(), 1);
        assert_eq!(decode_tile_info(frame_buffer(&publisher, 1)).len(), 0);
        // Frame 3 shares frame 0's buffer
        assert_eq!(decode_tile_info(frame_buffer(&publisher, 3)).len(), 1);
        assert_eq!(publisher.last_published_frame, Some(1));
    }

    #[test]
    fn test_publish_truncates_at_capacity() {
        let mut publisher = create_tile_info_publisher(2, 1);
        let a = tile(0, Some(0));
        let b = tile(1, Some(1));
        assert_eq!(publish_tile_info(&mut publisher, 0, &[&a, &b]), 1);
    }
}
