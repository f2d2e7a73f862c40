// Terrain Tile Stream - Data-Oriented Programming (DOP) Architecture
//
// Multi-resolution heightfield tile streaming: a bounded GPU slot pool, a
// distance-driven LOD policy with a per-update load budget, a permanently
// resident base LOD for fallback heights, and a physics tile manager that
// follows the same tiles independently.
//
// Data lives in *_data modules, behaviour in *_operations modules:
// - tiles for identity, grid math and tile sources
// - streaming for the cache orchestrator, LOD policy and holes
// - physics for collision tiles

// Constants module
pub mod constants;

pub mod error;

// Core systems
pub mod config;
pub mod fallback;
pub mod gpu;
pub mod physics;
pub mod streaming;
pub mod tiles;

pub use config::{load_metadata, PhysicsConfig, StreamingConfig, TerrainMetadata};
pub use error::{OptionExt, TerrainError, TerrainResult, TileErrorContext};
pub use gpu::{GpuSlotUploader, MemorySlotUploader};
pub use physics::{
    active_physics_tile_count, create_physics_tile_manager, update_physics_tiles, BodyId,
    HeightfieldDesc, PhysicsTileManagerData, PhysicsWorld, TileSampleProvider,
};
pub use streaming::{
    add_hole_circle, create_tile_cache, get_height_at, is_hole, open_tile_cache,
    remove_hole_circle, update_tile_cache, TileStreamingCacheData, UpdateReport,
};
pub use tiles::{
    MemoryTileSource, PngTileSource, Tile, TileFileSource, TileGrid, TileId, WorldRect,
};
