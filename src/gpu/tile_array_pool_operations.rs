//! Tile Array Pool Operations - Pure DOP Functions
//!
//! Slot allocation is a linear scan over the occupancy table; the pool is
//! small and allocation happens at most a few times per frame.

use super::slot_uploader::GpuSlotUploader;
use super::tile_array_pool_data::TileArrayPoolData;
use crate::error::{TerrainError, TerrainResult};

/// Create a pool with every slot free
pub fn create_tile_array_pool(
    capacity: u32,
    tile_resolution: u32,
    uploader: Box<dyn GpuSlotUploader>,
) -> TileArrayPoolData {
    let capacity = match uploader.capacity() {
        Some(limit) if limit < capacity => {
            log::warn!(
                "[tile_array_pool::create] Uploader holds {} slots, pool shrunk from {}",
                limit,
                capacity
            );
            limit
        }
        _ => capacity,
    };

    log::info!(
        "[tile_array_pool::create] {} slots of {}x{} samples",
        capacity,
        tile_resolution,
        tile_resolution
    );

    TileArrayPoolData {
        occupied: vec![false; capacity as usize],
        slot_sample_count: tile_resolution as usize * tile_resolution as usize,
        tile_resolution,
        uploader,
    }
}

pub fn pool_capacity(pool: &TileArrayPoolData) -> u32 {
    pool.occupied.len() as u32
}

/// Claim the lowest free slot, or `None` when the pool is full
pub fn allocate_slot(pool: &mut TileArrayPoolData) -> Option<u32> {
    let index = pool.occupied.iter().position(|occupied| !occupied)?;
    pool.occupied[index] = true;
    Some(index as u32)
}

/// Release a slot
///
/// Freeing an out-of-range or already-free slot is a caller bug and is
/// reported rather than ignored.
pub fn free_slot(pool: &mut TileArrayPoolData, index: u32) -> TerrainResult<()> {
    let capacity = pool_capacity(pool);
    match pool.occupied.get_mut(index as usize) {
        None => Err(TerrainError::InvalidSlot {
            index,
            capacity,
            reason: "index out of range",
        }),
        Some(occupied) if !*occupied => Err(TerrainError::InvalidSlot {
            index,
            capacity,
            reason: "slot already free",
        }),
        Some(occupied) => {
            *occupied = false;
            Ok(())
        }
    }
}

/// Copy a tile's samples into an occupied slot
pub fn upload_slot(pool: &mut TileArrayPoolData, index: u32, samples: &[f32]) -> TerrainResult<()> {
    if samples.len() != pool.slot_sample_count {
        return Err(TerrainError::SizeMismatch {
            expected: pool.slot_sample_count,
            found: samples.len(),
        });
    }
    if !is_slot_occupied(pool, index) {
        return Err(TerrainError::InvalidSlot {
            index,
            capacity: pool_capacity(pool),
            reason: "upload into unallocated slot",
        });
    }

    pool.uploader.upload(index, samples)
}

pub fn is_slot_occupied(pool: &TileArrayPoolData, index: u32) -> bool {
    pool.occupied.get(index as usize).copied().unwrap_or(false)
}

pub fn occupied_slot_count(pool: &TileArrayPoolData) -> u32 {
    pool.occupied.iter().filter(|occupied| **occupied).count() as u32
}

pub fn free_slot_count(pool: &TileArrayPoolData) -> u32 {
    pool_capacity(pool) - occupied_slot_count(pool)
}

/// Read back a slot's contents through the uploader, when it supports it
pub fn read_slot(pool: &TileArrayPoolData, index: u32) -> Option<&[f32]> {
    if !is_slot_occupied(pool, index) {
        return None;
    }
    pool.uploader.read_slot(index)
}
