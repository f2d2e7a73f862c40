//! Terrain metadata and streaming policy

pub mod metadata_data;
pub mod metadata_operations;
pub mod streaming_config;

pub use metadata_data::TerrainMetadata;
pub use metadata_operations::{
    format_metadata, height_scale, load_metadata, parse_metadata, tile_grid, validate_metadata,
};
pub use streaming_config::{
    load_streaming_config, streaming_config_from_toml, validate_streaming_config, PhysicsConfig,
    StreamingConfig,
};
