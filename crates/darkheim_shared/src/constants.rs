//! # World Constants
//!
//! **CRITICAL:** chunk geometry is baked into every save file and every
//! client. Changing `TILE_SIZE` or `CHUNK_SIZE` invalidates the world.

// =============================================================================
// CHUNK GEOMETRY
// =============================================================================

/// Size of one tile in world pixels.
pub const TILE_SIZE: i32 = 32;

/// Chunk side length in tiles.
pub const CHUNK_SIZE: usize = 16;

/// Tiles per chunk (flat array length).
pub const TILES_PER_CHUNK: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Chunk side length in world pixels.
pub const CHUNK_PIXEL_SIZE: i32 = TILE_SIZE * CHUNK_SIZE as i32;

// =============================================================================
// STREAMING
// =============================================================================

/// Chunks loaded around a player in each direction.
pub const VIEW_DISTANCE: i32 = 3;

/// Largest view distance a world accepts.
pub const MAX_VIEW_DISTANCE: i32 = 32;

// =============================================================================
// TOWN
// =============================================================================

/// Town wall distance from the town center, in world pixels.
pub const TOWN_WALL_RADIUS: f64 = 2400.0;

/// Width of each of the four gate openings, in world pixels.
pub const TOWN_GATE_WIDTH: f64 = 96.0;

// =============================================================================
// GENERATION
// =============================================================================

/// Seed used when the world configuration does not name one.
pub const DEFAULT_SEED: u64 = 42;
