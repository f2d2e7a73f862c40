//! GPU-facing state: slot pool, uploader seam and per-frame tile info ring

pub mod slot_uploader;
pub mod tile_array_pool_data;
pub mod tile_array_pool_operations;
pub mod tile_info_data;
pub mod tile_info_operations;

#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use slot_uploader::{GpuSlotUploader, MemorySlotUploader};
pub use tile_array_pool_data::TileArrayPoolData;
pub use tile_array_pool_operations::{
    allocate_slot, create_tile_array_pool, free_slot, free_slot_count, is_slot_occupied,
    occupied_slot_count, pool_capacity, read_slot, upload_slot,
};
pub use tile_info_data::{TileInfoGpu, TileInfoHeader, TileInfoPublisherData};
pub use tile_info_operations::{
    build_tile_info, create_tile_info_publisher, decode_tile_info, frame_buffer, frame_slot,
    publish_tile_info, tile_info_buffer_size,
};

#[cfg(feature = "gpu")]
pub use wgpu_backend::{
    create_fallback_texture, create_hole_mask_texture, create_tile_info_buffers,
    create_wgpu_tile_array, request_headless_device, write_tile_info_buffer, WgpuTileArray,
};
