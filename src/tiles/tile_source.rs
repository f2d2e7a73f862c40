//! Tile sources
//!
//! Where raw tile samples come from. The cache and the physics manager share
//! one source through `Arc<dyn TileFileSource>`; `load` has no side effects
//! beyond reading, so both may request the same tile independently.

use super::tile_data::{RawTileSamples, TileId, TileKey};
use super::tile_operations::pack_tile_key;
use crate::constants::layout::HEIGHT_SAMPLE_MAX;
use crate::error::{TerrainError, TerrainResult, TileErrorContext};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// Decodes one tile's height samples from storage
pub trait TileFileSource: Send + Sync {
    fn load(&self, id: TileId) -> TerrainResult<RawTileSamples>;
}

/// Load a tile and enforce the configured resolution
///
/// Mismatched tiles are rejected rather than resampled.
pub fn decode_tile(
    source: &dyn TileFileSource,
    id: TileId,
    resolution: u32,
) -> TerrainResult<Vec<f32>> {
    let raw = source.load(id)?;

    if raw.width != resolution || raw.height != resolution {
        return Err(TerrainError::tile_load(
            id,
            format!(
                "resolution {}x{} does not match expected {}x{}, refusing to resample",
                raw.width, raw.height, resolution, resolution
            ),
        ));
    }

    let expected = resolution as usize * resolution as usize;
    if raw.samples.len() != expected {
        return Err(TerrainError::tile_load(
            id,
            format!("{} samples, expected {}", raw.samples.len(), expected),
        ));
    }

    Ok(raw.samples)
}

// ============================================================================
// PNG FILES
// ============================================================================

/// Reads `tile_{x}_{z}_lod{lod}.png` files (16-bit grayscale) from a directory
#[derive(Debug, Clone)]
pub struct PngTileSource {
    pub directory: PathBuf,
}

impl PngTileSource {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

/// File name of a tile inside the tile directory
pub fn tile_file_name(id: TileId) -> String {
    format!("tile_{}_{}_lod{}.png", id.x, id.z, id.lod)
}

pub fn tile_path(directory: &Path, id: TileId) -> PathBuf {
    directory.join(tile_file_name(id))
}

impl TileFileSource for PngTileSource {
    fn load(&self, id: TileId) -> TerrainResult<RawTileSamples> {
        let path = tile_path(&self.directory, id);
        if !path.exists() {
            return Err(TerrainError::tile_load(
                id,
                format!("file not found: {}", path.display()),
            ));
        }

        let image = image::open(&path).tile_context(id)?.to_luma16();
        let (width, height) = image.dimensions();
        let samples = image
            .into_raw()
            .into_iter()
            .map(|value| value as f32 / HEIGHT_SAMPLE_MAX)
            .collect();

        Ok(RawTileSamples {
            width,
            height,
            samples,
        })
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// In-memory tile store for headless use
///
/// Counts every `load` call so callers can observe redundant reads.
#[derive(Debug, Default)]
pub struct MemoryTileSource {
    pub tiles: FxHashMap<TileKey, RawTileSamples>,
    pub load_count: AtomicU32,
}

impl MemoryTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TileId, samples: RawTileSamples) {
        self.tiles.insert(pack_tile_key(id), samples);
    }

    /// Insert a square tile of `resolution²` samples produced by `height_fn(col, row)`
    pub fn insert_with(
        &mut self,
        id: TileId,
        resolution: u32,
        height_fn: impl Fn(u32, u32) -> f32,
    ) {
        let mut samples = Vec::with_capacity(resolution as usize * resolution as usize);
        for row in 0..resolution {
            for col in 0..resolution {
                samples.push(height_fn(col, row));
            }
        }
        self.insert(
            id,
            RawTileSamples {
                width: resolution,
                height: resolution,
                samples,
            },
        );
    }

    pub fn loads(&self) -> u32 {
        self.load_count.load(Ordering::Relaxed)
    }
}

impl TileFileSource for MemoryTileSource {
    fn load(&self, id: TileId) -> TerrainResult<RawTileSamples> {
        self.load_count.fetch_add(1, Ordering::Relaxed);
        self.tiles
            .get(&pack_tile_key(id))
            .cloned()
            .ok_or_else(|| TerrainError::tile_load(id, "tile not present in memory source"))
    }
}
