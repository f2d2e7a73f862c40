//! Slot uploader seam
//!
//! The only path from CPU tile samples into GPU-visible memory. The wgpu
//! backend implements it with a texture array; `MemorySlotUploader` keeps the
//! bytes on the CPU for headless runs and readback tests.

use crate::error::TerrainResult;

/// Copies one tile's samples into one array slot
///
/// An `Err` means the slot holds no valid data and must not be published.
pub trait GpuSlotUploader {
    fn upload(&mut self, slot: u32, samples: &[f32]) -> TerrainResult<()>;

    /// Slots the backing store can hold, when it has a hard limit
    fn capacity(&self) -> Option<u32> {
        None
    }

    /// Test-only readback; GPU backends return `None`
    fn read_slot(&self, _slot: u32) -> Option<&[f32]> {
        None
    }
}

/// CPU-side slot storage
#[derive(Debug, Default)]
pub struct MemorySlotUploader {
    pub slots: Vec<Vec<f32>>,
    pub upload_count: u32,
}

impl MemorySlotUploader {
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: vec![Vec::new(); capacity as usize],
            upload_count: 0,
        }
    }
}

impl GpuSlotUploader for MemorySlotUploader {
    fn upload(&mut self, slot: u32, samples: &[f32]) -> TerrainResult<()> {
        let index = slot as usize;
        if index >= self.slots.len() {
            self.slots.resize(index + 1, Vec::new());
        }
        self.slots[index].clear();
        self.slots[index].extend_from_slice(samples);
        self.upload_count += 1;
        Ok(())
    }

    fn read_slot(&self, slot: u32) -> Option<&[f32]> {
        self.slots
            .get(slot as usize)
            .filter(|samples| !samples.is_empty())
            .map(|samples| samples.as_slice())
    }
}
