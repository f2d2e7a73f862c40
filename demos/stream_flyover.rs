//! Streaming flyover
//!
//! Bakes a small synthetic terrain into a temporary tile directory, then flies
//! a viewer across it while the tile cache and the physics tile manager
//! follow. With the `gpu` feature the tile array lives in a real wgpu texture,
//! otherwise slots are kept in memory.

use anyhow::Result;
use glam::Vec3;
use image::{ImageBuffer, Luma};
use terrain_tile_stream::{
    config::{format_metadata, tile_grid},
    constants::layout::{HEIGHT_SAMPLE_MAX, METADATA_FILE_NAME},
    create_physics_tile_manager, get_height_at, is_hole, load_metadata, open_tile_cache,
    physics::HeightfieldDesc,
    streaming::{preload_tiles_around, set_frame_index, streaming_stats, tile_info_buffer},
    tiles::{tile_path, tile_world_bounds, tiles_at_lod},
    update_physics_tiles, update_tile_cache, BodyId, GpuSlotUploader, MemorySlotUploader,
    PhysicsWorld, StreamingConfig, TerrainMetadata, TerrainResult, TileId,
};
use std::path::Path;

const TILE_RESOLUTION: u32 = 33;
const LOD_LEVELS: u32 = 3;
const TILES_PER_AXIS: u32 = 16;
const TERRAIN_SIZE: f32 = 4096.0;
const FLIGHT_STEPS: u32 = 120;

/// Rolling hills in normalized height
fn terrain_height(world_x: f32, world_z: f32) -> f32 {
    let hills = (world_x * 0.004).sin() * (world_z * 0.003).cos();
    let ridges = (world_x * 0.011 + world_z * 0.007).sin() * 0.25;
    (0.5 + 0.35 * hills + 0.1 * ridges).clamp(0.0, 1.0)
}

fn bake_tiles(directory: &Path, metadata: &TerrainMetadata) -> Result<u32> {
    let grid = tile_grid(metadata);

    let step = (TILE_RESOLUTION - 1) as f32;
    let mut written = 0;
    for lod in 0..LOD_LEVELS {
        let (tiles_x, tiles_z) = tiles_at_lod(&grid, lod);
        for z in 0..tiles_z as i32 {
            for x in 0..tiles_x as i32 {
                let id = TileId { x, z, lod };
                let bounds = tile_world_bounds(&grid, id);
                let image = ImageBuffer::from_fn(TILE_RESOLUTION, TILE_RESOLUTION, |col, row| {
                    let world_x = bounds.min_x + (bounds.max_x - bounds.min_x) * col as f32 / step;
                    let world_z = bounds.min_z + (bounds.max_z - bounds.min_z) * row as f32 / step;
                    Luma([(terrain_height(world_x, world_z) * HEIGHT_SAMPLE_MAX) as u16])
                });
                image.save(tile_path(directory, id))?;
                written += 1;
            }
        }
    }

    std::fs::write(directory.join(METADATA_FILE_NAME), format_metadata(metadata))?;
    Ok(written)
}

/// Physics world that only counts and logs bodies
#[derive(Default)]
struct LoggingWorld {
    next_id: u64,
    live: u32,
}

impl PhysicsWorld for LoggingWorld {
    fn create_heightfield_body(&mut self, desc: &HeightfieldDesc) -> TerrainResult<BodyId> {
        self.next_id += 1;
        self.live += 1;
        log::debug!(
            "body {} for {:?} at ({:.0}, {:.0}), {} samples",
            self.next_id,
            desc.tile,
            desc.world_min_x,
            desc.world_min_z,
            desc.samples.len()
        );
        Ok(BodyId(self.next_id))
    }

    fn remove_body(&mut self, body: BodyId) {
        self.live = self.live.saturating_sub(1);
        log::debug!("removed body {}", body.0);
    }
}

#[cfg(feature = "gpu")]
fn create_uploader(capacity: u32) -> Box<dyn GpuSlotUploader> {
    use terrain_tile_stream::gpu::{create_wgpu_tile_array, request_headless_device};

    match request_headless_device() {
        Ok((device, queue)) => {
            println!("Using wgpu tile array");
            Box::new(create_wgpu_tile_array(&device, queue, capacity, TILE_RESOLUTION))
        }
        Err(e) => {
            println!("No GPU available ({}), keeping slots in memory", e);
            Box::new(MemorySlotUploader::new(capacity))
        }
    }
}

#[cfg(not(feature = "gpu"))]
fn create_uploader(capacity: u32) -> Box<dyn GpuSlotUploader> {
    Box::new(MemorySlotUploader::new(capacity))
}

fn main() -> Result<()> {
    env_logger::init();

    println!("Terrain Tile Streaming Flyover");
    println!("==============================");

    let metadata = TerrainMetadata {
        tile_resolution: TILE_RESOLUTION,
        num_lod_levels: LOD_LEVELS,
        tiles_x: TILES_PER_AXIS,
        tiles_z: TILES_PER_AXIS,
        terrain_size: TERRAIN_SIZE,
        source_width: TILES_PER_AXIS * (TILE_RESOLUTION - 1) + 1,
        source_height: TILES_PER_AXIS * (TILE_RESOLUTION - 1) + 1,
        min_altitude: -50.0,
        max_altitude: 450.0,
        meters_per_pixel: TERRAIN_SIZE / (TILES_PER_AXIS * (TILE_RESOLUTION - 1)) as f32,
    };

    let directory = tempfile::tempdir()?;
    let written = bake_tiles(directory.path(), &metadata)?;
    println!("Baked {} tiles into {}", written, directory.path().display());

    let config = StreamingConfig {
        load_radius: 1500.0,
        unload_radius: 1800.0,
        lod_thresholds: vec![600.0, 1200.0, 2400.0],
        ..StreamingConfig::default()
    };
    let physics_config = config.physics.clone();
    let capacity = config.slot_capacity;

    let mut cache = open_tile_cache(directory.path(), config, create_uploader(capacity))?;
    let mut physics = create_physics_tile_manager(&load_metadata(directory.path())?, physics_config);
    let mut world = LoggingWorld::default();

    let start = Vec3::new(-1800.0, 0.0, -1200.0);
    let end = Vec3::new(1800.0, 0.0, 1200.0);
    let preloaded = preload_tiles_around(&mut cache, start.x, start.z, 300.0);
    println!("Preloaded {} tiles at the start point", preloaded);

    terrain_tile_stream::add_hole_circle(&mut cache, 0.0, 0.0, 40.0);

    for step in 0..FLIGHT_STEPS {
        let t = step as f32 / (FLIGHT_STEPS - 1) as f32;
        let viewer = start.lerp(end, t);

        set_frame_index(&mut cache, step);
        let report = update_tile_cache(&mut cache, viewer);
        let physics_report = update_physics_tiles(&mut physics, viewer, &mut cache, &mut world);

        if step % 10 == 0 {
            let ground = get_height_at(&cache, viewer.x, viewer.z);
            let info_bytes = tile_info_buffer(&cache, step).len();
            println!(
                "step {:3} ({:7.1}, {:7.1}): ground {:?}, hole {}, desired {}, loaded {}, evicted {}, slotted {}, bodies {} (+{}), tile info {} bytes",
                step,
                viewer.x,
                viewer.z,
                ground,
                is_hole(&cache, viewer.x, viewer.z),
                report.desired,
                report.loaded,
                report.evicted,
                report.published,
                world.live,
                physics_report.created,
                info_bytes
            );
        }
    }

    let stats = streaming_stats(&cache);
    println!();
    println!("Totals: {:?}", stats);
    Ok(())
}
