//! Metadata Operations - Pure DOP Functions
//!
//! Parsing and validation of the key=value terrain metadata file.

use super::metadata_data::TerrainMetadata;
use crate::constants::layout::{MAX_TILE_RESOLUTION, METADATA_FILE_NAME};
use crate::error::{TerrainError, TerrainResult};
use crate::tiles::TileGrid;
use std::path::Path;
use std::str::FromStr;

/// Read and validate the metadata file inside a tile directory
pub fn load_metadata(tile_directory: &Path) -> TerrainResult<TerrainMetadata> {
    let path = tile_directory.join(METADATA_FILE_NAME);
    let path_name = path.display().to_string();

    let text = std::fs::read_to_string(&path).map_err(|e| TerrainError::Config {
        path: path_name.clone(),
        reason: format!("cannot open metadata: {}", e),
    })?;

    let metadata = parse_metadata(&text, &path_name)?;
    log::info!(
        "[metadata::load_metadata] {}: {}x{} tiles of {}² samples, {} LOD levels, altitude {}..{}",
        path_name,
        metadata.tiles_x,
        metadata.tiles_z,
        metadata.tile_resolution,
        metadata.num_lod_levels,
        metadata.min_altitude,
        metadata.max_altitude
    );
    Ok(metadata)
}

/// Parse metadata text
///
/// `path` only labels errors. Blank lines and `#` comments are skipped,
/// unknown keys are ignored.
pub fn parse_metadata(text: &str, path: &str) -> TerrainResult<TerrainMetadata> {
    let mut tile_resolution = None;
    let mut num_lod_levels = None;
    let mut tiles_x = None;
    let mut tiles_z = None;
    let mut terrain_size = None;
    let mut source_width = None;
    let mut source_height = None;
    let mut min_altitude = None;
    let mut max_altitude = None;
    let mut meters_per_pixel = None;

    for (line_number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(config_error(
                path,
                format!("line {}: expected key=value, found '{}'", line_number + 1, line),
            ));
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "tileResolution" => tile_resolution = Some(parse_value(path, key, value)?),
            "numLODLevels" => num_lod_levels = Some(parse_value(path, key, value)?),
            "tilesX" => tiles_x = Some(parse_value(path, key, value)?),
            "tilesZ" => tiles_z = Some(parse_value(path, key, value)?),
            "terrainSize" => terrain_size = Some(parse_value(path, key, value)?),
            "sourceWidth" => source_width = Some(parse_value(path, key, value)?),
            "sourceHeight" => source_height = Some(parse_value(path, key, value)?),
            "minAltitude" => min_altitude = Some(parse_value(path, key, value)?),
            "maxAltitude" => max_altitude = Some(parse_value(path, key, value)?),
            "metersPerPixel" => meters_per_pixel = Some(parse_value(path, key, value)?),
            _ => log::debug!("[metadata::parse_metadata] Ignoring key '{}'", key),
        }
    }

    let tile_resolution: u32 = require(path, "tileResolution", tile_resolution)?;
    let num_lod_levels = require(path, "numLODLevels", num_lod_levels)?;
    let tiles_x: u32 = require(path, "tilesX", tiles_x)?;
    let tiles_z: u32 = require(path, "tilesZ", tiles_z)?;
    let min_altitude = require(path, "minAltitude", min_altitude)?;
    let max_altitude = require(path, "maxAltitude", max_altitude)?;
    let meters_per_pixel: f32 = meters_per_pixel.unwrap_or(1.0);

    // Older bakes omit the world size; LOD0 tiles cover tileResolution pixels
    let terrain_size = terrain_size
        .unwrap_or_else(|| tiles_x as f32 * tile_resolution as f32 * meters_per_pixel);
    let source_width = match source_width {
        Some(width) => width,
        None => source_extent(path, "sourceWidth", tiles_x, tile_resolution)?,
    };
    let source_height = match source_height {
        Some(height) => height,
        None => source_extent(path, "sourceHeight", tiles_z, tile_resolution)?,
    };

    let metadata = TerrainMetadata {
        tile_resolution,
        num_lod_levels,
        tiles_x,
        tiles_z,
        terrain_size,
        source_width,
        source_height,
        min_altitude,
        max_altitude,
        meters_per_pixel,
    };

    validate_metadata(&metadata, path)?;
    Ok(metadata)
}

/// Reject metadata the streaming core cannot work with
pub fn validate_metadata(metadata: &TerrainMetadata, path: &str) -> TerrainResult<()> {
    if metadata.tile_resolution < 2 {
        return Err(config_error(path, "tileResolution must be at least 2"));
    }
    if metadata.tile_resolution > MAX_TILE_RESOLUTION {
        return Err(config_error(
            path,
            format!("tileResolution must not exceed {}", MAX_TILE_RESOLUTION),
        ));
    }
    if metadata.num_lod_levels == 0 {
        return Err(config_error(path, "numLODLevels must be at least 1"));
    }
    if metadata.num_lod_levels > 16 {
        return Err(config_error(path, "numLODLevels must not exceed 16"));
    }
    if metadata.tiles_x == 0 || metadata.tiles_z == 0 {
        return Err(config_error(path, "tilesX and tilesZ must be at least 1"));
    }
    if metadata.tiles_x >= 1 << 24 || metadata.tiles_z >= 1 << 24 {
        return Err(config_error(path, "tile counts must fit in 24 bits"));
    }

    // Every coarser level must tile the same area exactly
    let nesting = 1u32 << (metadata.num_lod_levels - 1);
    if metadata.tiles_x % nesting != 0 || metadata.tiles_z % nesting != 0 {
        return Err(config_error(
            path,
            format!(
                "tile counts {}x{} are not divisible by {} for {} LOD levels",
                metadata.tiles_x, metadata.tiles_z, nesting, metadata.num_lod_levels
            ),
        ));
    }

    if !(metadata.terrain_size > 0.0) {
        return Err(config_error(path, "terrainSize must be positive"));
    }
    if !(metadata.max_altitude > metadata.min_altitude) {
        return Err(config_error(
            path,
            format!(
                "maxAltitude ({}) must exceed minAltitude ({})",
                metadata.max_altitude, metadata.min_altitude
            ),
        ));
    }

    Ok(())
}

/// World height covered by a normalized sample range of [0, 1]
pub fn height_scale(metadata: &TerrainMetadata) -> f32 {
    metadata.max_altitude - metadata.min_altitude
}

/// Grid geometry derived from the metadata
pub fn tile_grid(metadata: &TerrainMetadata) -> TileGrid {
    TileGrid {
        terrain_size: metadata.terrain_size,
        tiles_x: metadata.tiles_x,
        tiles_z: metadata.tiles_z,
        num_lod_levels: metadata.num_lod_levels,
        tile_resolution: metadata.tile_resolution,
    }
}

/// Render metadata back to the file format (used by tile bakers and tests)
pub fn format_metadata(metadata: &TerrainMetadata) -> String {
    format!(
        "tileResolution={}\nnumLODLevels={}\ntilesX={}\ntilesZ={}\nterrainSize={}\n\
         sourceWidth={}\nsourceHeight={}\nminAltitude={}\nmaxAltitude={}\nmetersPerPixel={}\n",
        metadata.tile_resolution,
        metadata.num_lod_levels,
        metadata.tiles_x,
        metadata.tiles_z,
        metadata.terrain_size,
        metadata.source_width,
        metadata.source_height,
        metadata.min_altitude,
        metadata.max_altitude,
        metadata.meters_per_pixel
    )
}

fn parse_value<T: FromStr>(path: &str, key: &str, value: &str) -> TerrainResult<T> {
    value
        .parse()
        .map_err(|_| config_error(path, format!("invalid value '{}' for {}", value, key)))
}

fn require<T>(path: &str, key: &str, value: Option<T>) -> TerrainResult<T> {
    value.ok_or_else(|| config_error(path, format!("missing key {}", key)))
}

/// Source pixels along one axis when the bake did not record them
fn source_extent(path: &str, key: &str, tiles: u32, tile_resolution: u32) -> TerrainResult<u32> {
    tiles.checked_mul(tile_resolution).ok_or_else(|| {
        config_error(
            path,
            format!("{} missing and {} x {} does not fit in 32 bits", key, tiles, tile_resolution),
        )
    })
}

fn config_error(path: &str, reason: impl Into<String>) -> TerrainError {
    TerrainError::Config {
        path: path.to_string(),
        reason: reason.into(),
    }
}
