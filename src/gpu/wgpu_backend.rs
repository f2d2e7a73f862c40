//! wgpu backend
//!
//! GPU resources behind the streaming core: the tile array texture (one
//! `R32Float` layer per slot), the per-frame tile info storage buffers, the
//! fallback texture and the hole mask.

use super::slot_uploader::GpuSlotUploader;
use super::tile_info_data::TileInfoPublisherData;
use super::tile_info_operations::{frame_buffer, frame_slot, tile_info_buffer_size};
use crate::error::{TerrainError, TerrainResult};
use crate::fallback::CombinedSurface;
use crate::streaming::HoleMask;
use std::sync::Arc;
use wgpu::{Device, Queue};

/// Tile array texture implementing the slot uploader
pub struct WgpuTileArray {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub queue: Arc<Queue>,
    pub layers: u32,
    pub tile_resolution: u32,
}

/// Create the tile array, clamped to the device's array layer limit
pub fn create_wgpu_tile_array(
    device: &Device,
    queue: Arc<Queue>,
    capacity: u32,
    tile_resolution: u32,
) -> WgpuTileArray {
    let max_layers = device.limits().max_texture_array_layers;
    let layers = capacity.min(max_layers);
    if layers != capacity {
        log::warn!(
            "[wgpu_backend::create_tile_array] Slot capacity clamped from {} to {} due to GPU limits",
            capacity,
            layers
        );
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Terrain Tile Array"),
        size: wgpu::Extent3d {
            width: tile_resolution,
            height: tile_resolution,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::R32Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Terrain Tile Array View"),
        dimension: Some(wgpu::TextureViewDimension::D2Array),
        ..Default::default()
    });

    // R32Float is not filterable everywhere; the shader filters manually
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Terrain Tile Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    WgpuTileArray {
        texture,
        view,
        sampler,
        queue,
        layers,
        tile_resolution,
    }
}

impl GpuSlotUploader for WgpuTileArray {
    fn upload(&mut self, slot: u32, samples: &[f32]) -> TerrainResult<()> {
        if slot >= self.layers {
            return Err(TerrainError::InvalidSlot {
                index: slot,
                capacity: self.layers,
                reason: "beyond texture array layers",
            });
        }

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: slot,
                },
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(samples),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.tile_resolution),
                rows_per_image: Some(self.tile_resolution),
            },
            wgpu::Extent3d {
                width: self.tile_resolution,
                height: self.tile_resolution,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn capacity(&self) -> Option<u32> {
        Some(self.layers)
    }
}

/// One STORAGE buffer per frame in flight, sized for the publisher's capacity
pub fn create_tile_info_buffers(
    device: &Device,
    publisher: &TileInfoPublisherData,
) -> Vec<wgpu::Buffer> {
    let size = tile_info_buffer_size(publisher.capacity) as u64;
    (0..publisher.frames.len())
        .map(|frame| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Terrain Tile Info {}", frame)),
                size,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })
        .collect()
}

/// Copy the frame's CPU-side tile info into its GPU buffer
pub fn write_tile_info_buffer(
    queue: &Queue,
    buffers: &[wgpu::Buffer],
    publisher: &TileInfoPublisherData,
    frame_index: u32,
) -> TerrainResult<()> {
    let slot = frame_slot(publisher, frame_index);
    let buffer = buffers.get(slot).ok_or_else(|| TerrainError::SizeMismatch {
        expected: publisher.frames.len(),
        found: buffers.len(),
    })?;

    queue.write_buffer(buffer, 0, frame_buffer(publisher, frame_index));
    Ok(())
}

/// Upload a single-channel surface as a 2D texture
fn create_r_texture(
    device: &Device,
    queue: &Queue,
    label: &str,
    format: wgpu::TextureFormat,
    resolution: u32,
    bytes: &[u8],
    bytes_per_texel: u32,
) -> (wgpu::Texture, wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width: resolution,
        height: resolution,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytes,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(bytes_per_texel * resolution),
            rows_per_image: Some(resolution),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// Fallback texture sampled wherever no slotted tile covers a point
pub fn create_fallback_texture(
    device: &Device,
    queue: &Queue,
    surface: &CombinedSurface,
) -> (wgpu::Texture, wgpu::TextureView) {
    create_r_texture(
        device,
        queue,
        "Terrain Fallback Heightmap",
        wgpu::TextureFormat::R32Float,
        surface.resolution,
        bytemuck::cast_slice(&surface.samples),
        4,
    )
}

/// Terrain-wide hole mask (255 = hole)
pub fn create_hole_mask_texture(
    device: &Device,
    queue: &Queue,
    mask: &HoleMask,
) -> (wgpu::Texture, wgpu::TextureView) {
    create_r_texture(
        device,
        queue,
        "Terrain Hole Mask",
        wgpu::TextureFormat::R8Unorm,
        mask.resolution,
        &mask.texels,
        1,
    )
}

/// Headless device for tools and demos
pub fn request_headless_device() -> TerrainResult<(Arc<Device>, Arc<Queue>)> {
    let instance = wgpu::Instance::default();
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        ..Default::default()
    }))
    .ok_or_else(|| TerrainError::Io {
        path: "wgpu adapter".to_string(),
        error: "no compatible adapter found".to_string(),
    })?;

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("Terrain Streaming Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        },
        None,
    ))
    .map_err(|e| TerrainError::Io {
        path: "wgpu device".to_string(),
        error: e.to_string(),
    })?;

    Ok((Arc::new(device), Arc::new(queue)))
}
