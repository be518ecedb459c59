//! # Darkheim Shared
//!
//! Types used by both the world generator and the chunk lifecycle layer.
//!
//! ## CRITICAL RULE
//!
//! Tile ids in [`tile::Tile`] are persisted to disk and sent to clients.
//! Adding a tile is fine. Renumbering one corrupts every saved world.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod coord;
pub mod gradient;
pub mod tile;

pub use constants::{
    CHUNK_PIXEL_SIZE, CHUNK_SIZE, DEFAULT_SEED, MAX_VIEW_DISTANCE, TILES_PER_CHUNK, TILE_SIZE,
    TOWN_GATE_WIDTH, TOWN_WALL_RADIUS, VIEW_DISTANCE,
};
pub use coord::ChunkCoord;
pub use gradient::GradientCurve;
pub use tile::Tile;
