//! Terrain streaming constants
//!
//! Defaults for the streaming policy and the fixed layout of the on-disk tile
//! cache. Runtime overrides live in `config::StreamingConfig`.

/// Tile cache directory layout
pub mod layout {
    /// Metadata file inside the tile directory
    pub const METADATA_FILE_NAME: &str = "terrain_tiles.meta";

    /// Largest accepted tile edge in samples
    pub const MAX_TILE_RESOLUTION: u32 = 8192;

    /// Largest value stored in a 16-bit heightmap texel
    pub const HEIGHT_SAMPLE_MAX: f32 = 65535.0;
}

/// Streaming policy defaults
pub mod streaming {
    /// Distance at which tiles are requested
    pub const DEFAULT_LOAD_RADIUS: f32 = 1000.0;

    /// Distance beyond which resident tiles are evicted
    pub const DEFAULT_UNLOAD_RADIUS: f32 = 1200.0;

    /// Upper distance bound of each LOD level (LOD0 first)
    pub const DEFAULT_LOD_THRESHOLDS: [f32; 4] = [1000.0, 2000.0, 4000.0, 8000.0];

    /// Smallest unload/load radius gap, as a fraction of the load radius
    pub const HYSTERESIS_MIN_GAP: f32 = 0.2;

    /// Tile loads attempted per update before the rest wait a frame
    pub const MAX_LOADS_PER_UPDATE: u32 = 4;
}

/// GPU-facing limits
pub mod gpu {
    /// Layers in the tile array texture
    pub const MAX_ACTIVE_TILES: u32 = 64;

    /// Tile info ring depth (matches a triple-buffered renderer)
    pub const FRAMES_IN_FLIGHT: u32 = 3;

    /// Cap on the combined fallback surface, independent of terrain size
    pub const FALLBACK_MAX_RESOLUTION: u32 = 1024;

    /// Terrain-wide hole mask resolution
    pub const HOLE_MASK_RESOLUTION: u32 = 1024;
}

/// Physics tile defaults
pub mod physics {
    pub const DEFAULT_HIGH_DETAIL_RADIUS: f32 = 512.0;
    pub const DEFAULT_HIGH_DETAIL_LOD: u32 = 0;
    pub const MAX_BODIES_PER_UPDATE: u32 = 2;
}

/// Holes closer than this on centre and radius are considered the same hole
pub const HOLE_MATCH_TOLERANCE: f32 = 0.1;
