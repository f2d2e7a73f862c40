//! Collision bodies for the terrain around the player

pub mod physics_tiles_data;
pub mod physics_tiles_operations;
pub mod physics_world;

pub use physics_tiles_data::{PhysicsTile, PhysicsTileManagerData, PhysicsUpdateReport};
pub use physics_tiles_operations::{
    active_physics_tile_count, clear_physics_tiles, coarse_lod, compute_physics_desired_tiles,
    create_physics_tile_manager, high_detail_lod, physics_tile_bounds, preload_physics_tiles,
    update_physics_tiles,
};
pub use physics_world::{
    BodyId, HeightfieldDesc, PhysicsWorld, SourceSampleProvider, TileSampleProvider,
};
