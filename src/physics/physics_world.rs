//! Physics seams
//!
//! The physics manager never owns a physics engine. It talks to one through
//! `PhysicsWorld` and gets tile samples through `TileSampleProvider`.

use crate::error::TerrainResult;
use crate::tiles::{decode_tile, TileFileSource, TileId};
use glam::Vec2;
use std::sync::Arc;

/// Handle to a body owned by the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub u64);

/// Everything needed to build one static heightfield collider
#[derive(Debug, Clone, Copy)]
pub struct HeightfieldDesc<'a> {
    pub tile: TileId,
    /// Normalized samples, row-major, `resolution²`
    pub samples: &'a [f32],
    pub resolution: u32,
    pub world_min_x: f32,
    pub world_min_z: f32,
    /// World extent of the tile on X and Z
    pub tile_world_size: Vec2,
    pub height_scale: f32,
    pub min_altitude: f32,
}

pub trait PhysicsWorld {
    fn create_heightfield_body(&mut self, desc: &HeightfieldDesc) -> TerrainResult<BodyId>;
    fn remove_body(&mut self, body: BodyId);
}

/// CPU samples for a tile, loading them if needed
pub trait TileSampleProvider {
    fn tile_samples(&mut self, id: TileId) -> TerrainResult<&[f32]>;
}

/// Uncached provider reading straight from a tile source
pub struct SourceSampleProvider {
    pub source: Arc<dyn TileFileSource>,
    pub tile_resolution: u32,
    pub scratch: Vec<f32>,
}

impl SourceSampleProvider {
    pub fn new(source: Arc<dyn TileFileSource>, tile_resolution: u32) -> Self {
        Self {
            source,
            tile_resolution,
            scratch: Vec::new(),
        }
    }
}

impl TileSampleProvider for SourceSampleProvider {
    fn tile_samples(&mut self, id: TileId) -> TerrainResult<&[f32]> {
        self.scratch = decode_tile(self.source.as_ref(), id, self.tile_resolution)?;
        Ok(&self.scratch)
    }
}
