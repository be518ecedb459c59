//! Chunk-space coordinates.

use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_PIXEL_SIZE, CHUNK_SIZE, TILE_SIZE};

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not tiles).
    pub x: i32,
    /// Y coordinate (in chunks, not tiles).
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Converts world tile coordinates to the owning chunk.
    #[inline]
    #[must_use]
    pub const fn from_tile_pos(tile_x: i64, tile_y: i64) -> Self {
        Self {
            x: tile_x.div_euclid(CHUNK_SIZE as i64) as i32,
            y: tile_y.div_euclid(CHUNK_SIZE as i64) as i32,
        }
    }

    /// Converts a world pixel position to the owning chunk.
    ///
    /// Returns `None` for non-finite input.
    #[must_use]
    pub fn from_world_pos(world_x: f64, world_y: f64) -> Option<Self> {
        if !world_x.is_finite() || !world_y.is_finite() {
            return None;
        }
        let size = f64::from(CHUNK_PIXEL_SIZE);
        let cx = (world_x / size).floor();
        let cy = (world_y / size).floor();
        let range = f64::from(i32::MIN)..=f64::from(i32::MAX);
        if !range.contains(&cx) || !range.contains(&cy) {
            return None;
        }
        Some(Self::new(cx as i32, cy as i32))
    }

    /// World pixel X of the chunk's origin (top-left corner).
    #[inline]
    #[must_use]
    pub const fn world_x(self) -> i64 {
        self.x as i64 * CHUNK_PIXEL_SIZE as i64
    }

    /// World pixel Y of the chunk's origin.
    #[inline]
    #[must_use]
    pub const fn world_y(self) -> i64 {
        self.y as i64 * CHUNK_PIXEL_SIZE as i64
    }

    /// World pixel position of the top-left corner of a local tile.
    #[inline]
    #[must_use]
    pub const fn tile_origin(self, local_x: usize, local_y: usize) -> (i64, i64) {
        (
            self.world_x() + local_x as i64 * TILE_SIZE as i64,
            self.world_y() + local_y as i64 * TILE_SIZE as i64,
        )
    }

    /// World pixel position of the center of a local tile.
    #[inline]
    #[must_use]
    pub const fn tile_center(self, local_x: usize, local_y: usize) -> (i64, i64) {
        let (x, y) = self.tile_origin(local_x, local_y);
        (x + TILE_SIZE as i64 / 2, y + TILE_SIZE as i64 / 2)
    }

    /// Squared chunk-space distance to another chunk.
    #[inline]
    #[must_use]
    pub const fn distance_sq(self, other: Self) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        dx * dx + dy * dy
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.x, self.y)
    }
}

/// Flat index of a local tile within a chunk's tile arrays.
#[inline]
#[must_use]
pub const fn tile_index(local_x: usize, local_y: usize) -> usize {
    local_y * CHUNK_SIZE + local_x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tile_pos_negative() {
        assert_eq!(ChunkCoord::from_tile_pos(0, 0), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_tile_pos(15, 15), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_tile_pos(16, 16), ChunkCoord::new(1, 1));
        assert_eq!(ChunkCoord::from_tile_pos(-1, -1), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_tile_pos(-16, -16), ChunkCoord::new(-1, -1));
        assert_eq!(ChunkCoord::from_tile_pos(-17, -17), ChunkCoord::new(-2, -2));
    }

    #[test]
    fn test_from_world_pos() {
        assert_eq!(ChunkCoord::from_world_pos(0.0, 0.0), Some(ChunkCoord::new(0, 0)));
        assert_eq!(ChunkCoord::from_world_pos(511.9, 512.0), Some(ChunkCoord::new(0, 1)));
        assert_eq!(ChunkCoord::from_world_pos(-0.5, -513.0), Some(ChunkCoord::new(-1, -2)));
        assert_eq!(ChunkCoord::from_world_pos(f64::NAN, 0.0), None);
        assert_eq!(ChunkCoord::from_world_pos(0.0, f64::INFINITY), None);
        assert_eq!(ChunkCoord::from_world_pos(1e300, 0.0), None);
    }

    #[test]
    fn test_tile_center() {
        let coord = ChunkCoord::new(1, -1);
        assert_eq!(coord.tile_origin(0, 0), (512, -512));
        assert_eq!(coord.tile_center(2, 3), (512 + 64 + 16, -512 + 96 + 16));
    }
}
