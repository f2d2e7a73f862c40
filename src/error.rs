//! Error handling for terrain tile streaming
//!
//! One error type for the whole crate. Init-time failures (metadata, zero
//! base tiles) are fatal; every per-tile failure is logged by the caller and
//! recovered by falling back to coarser data.

use crate::tiles::TileId;

/// Main error type for terrain streaming
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    // Configuration Errors
    #[error("Config error in {path}: {reason}")]
    Config { path: String, reason: String },

    // Tile Errors
    #[error("Tile ({x}, {z}) LOD{lod} failed to load: {reason}")]
    TileLoad {
        x: i32,
        z: i32,
        lod: u32,
        reason: String,
    },

    #[error("No base LOD tiles could be loaded (LOD{lod}, {attempted} attempted)")]
    NoBaseTiles { lod: u32, attempted: u32 },

    // Slot Pool Errors
    #[error("Tile array pool exhausted: all {capacity} slots occupied")]
    SlotPoolExhausted { capacity: u32 },

    #[error("Invalid slot {index} (capacity {capacity}): {reason}")]
    InvalidSlot {
        index: u32,
        capacity: u32,
        reason: &'static str,
    },

    #[error("Sample count mismatch: expected {expected}, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    // Physics Errors
    #[error("Physics body creation failed for tile ({x}, {z}) LOD{lod}: {reason}")]
    PhysicsBodyCreation {
        x: i32,
        z: i32,
        lod: u32,
        reason: String,
    },

    // System Errors
    #[error("IO error for {path}: {error}")]
    Io { path: String, error: String },
}

/// Type alias for Results in terrain streaming
pub type TerrainResult<T> = Result<T, TerrainError>;

impl TerrainError {
    /// Build a tile load error for a tile identity
    pub fn tile_load(id: TileId, reason: impl Into<String>) -> Self {
        TerrainError::TileLoad {
            x: id.x,
            z: id.z,
            lod: id.lod,
            reason: reason.into(),
        }
    }

    /// Build a physics body error for a tile identity
    pub fn physics_body(id: TileId, reason: impl Into<String>) -> Self {
        TerrainError::PhysicsBodyCreation {
            x: id.x,
            z: id.z,
            lod: id.lod,
            reason: reason.into(),
        }
    }

    /// Whether this error must abort cache construction
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TerrainError::Config { .. } | TerrainError::NoBaseTiles { .. }
        )
    }
}

/// Convert Option to Result with context
pub trait OptionExt<T> {
    fn ok_or_terrain<F>(self, f: F) -> TerrainResult<T>
    where
        F: FnOnce() -> TerrainError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_terrain<F>(self, f: F) -> TerrainResult<T>
    where
        F: FnOnce() -> TerrainError,
    {
        self.ok_or_else(f)
    }
}

/// Attach a tile identity to any displayable error
pub trait TileErrorContext<T> {
    fn tile_context(self, id: TileId) -> TerrainResult<T>;
}

impl<T, E> TileErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn tile_context(self, id: TileId) -> TerrainResult<T> {
        self.map_err(|e| TerrainError::tile_load(id, e.to_string()))
    }
}
