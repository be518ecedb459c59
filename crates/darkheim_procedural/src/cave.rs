//! # Cave Carving
//!
//! Two passes over a chunk that already has base terrain:
//!
//! 1. Mark interior tiles: zone gate open, elevation inside the cave band,
//!    cave noise below the threshold.
//! 2. Interior edge tiles low in the band become entrances, the rest become
//!    floor variants. Non-interior tiles touching the interior become walls.
//!
//! Both neighbourhood checks use all eight neighbours. A 4-neighbourhood
//! lets diagonal gaps leak out of the cave.

use std::sync::Arc;

use darkheim_shared::coord::tile_index;
use darkheim_shared::{ChunkCoord, Tile, CHUNK_SIZE, TILES_PER_CHUNK};

use crate::config::{BiomeData, CaveConfig, ZoneConfig};
use crate::noise::NoiseField;
use crate::terrain::{tile_center_f64, TileGrid};

/// Elevation band above `min_elevation` where edge tiles open as entrances.
const ENTRANCE_BAND: f64 = 0.05;

/// Offset decorrelating floor-variant rolls from other position hashes.
const FLOOR_ROLL_OFFSET: i64 = 7777;

/// Carves caves into chunks of biomes that have a cave config.
pub struct CaveGenerator {
    noise: Arc<NoiseField>,
}

impl CaveGenerator {
    /// Creates a cave generator over a shared noise field.
    #[must_use]
    pub fn new(noise: Arc<NoiseField>) -> Self {
        Self { noise }
    }

    /// Carves caves in place. Biomes without a cave config are untouched.
    pub fn carve(&self, coord: ChunkCoord, biome: &BiomeData, grid: &mut TileGrid) {
        let Some(cave) = biome.document.cave.as_ref() else {
            return;
        };
        let scales = &biome.document.terrain;
        let zones = ZoneConfig::active(scales.zones.as_ref());

        // Pass 1: interior mask, keeping the elevation for pass 2.
        let mut interior = [false; TILES_PER_CHUNK];
        let mut elevation = [0.0f64; TILES_PER_CHUNK];
        for ly in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let (wx, wy) = tile_center_f64(coord, lx, ly);
                let i = tile_index(lx, ly);

                if let Some(z) = zones {
                    if self.noise.detail(wx, wy, z.scale) <= z.threshold {
                        continue;
                    }
                }

                let e = self.noise.elevation(wx, wy, scales.elevation_scale);
                elevation[i] = e;
                if e < cave.min_elevation || e > cave.max_elevation {
                    continue;
                }

                interior[i] = self.noise.detail(wx, wy, cave.scale) < cave.threshold;
            }
        }

        // Pass 2: classify.
        for ly in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let i = tile_index(lx, ly);
                if interior[i] {
                    let e = elevation[i];
                    let entrance = is_edge(&interior, lx, ly)
                        && e >= cave.min_elevation
                        && e <= cave.min_elevation + ENTRANCE_BAND;
                    let tile = if entrance {
                        Tile::CaveEntrance
                    } else {
                        let (wx, wy) = coord.tile_center(lx, ly);
                        let roll = self
                            .noise
                            .seeded_random(wx + FLOOR_ROLL_OFFSET, wy + FLOOR_ROLL_OFFSET);
                        floor_variant(cave, roll)
                    };
                    grid.set(i, tile);
                } else if touches_interior(&interior, lx, ly) {
                    grid.set(i, Tile::CaveWall);
                }
            }
        }
    }
}

/// Picks a floor tile for a roll in `[0, 1)`.
#[must_use]
pub fn floor_variant(cave: &CaveConfig, roll: f64) -> Tile {
    if cave.crystal_chance > 0.0 && roll < cave.crystal_chance {
        Tile::CaveCrystal
    } else if cave.moss_chance > 0.0 && roll < cave.moss_chance + cave.crystal_chance {
        Tile::CaveMoss
    } else {
        Tile::CaveFloor
    }
}

/// Neighbours of a local tile, `None` where they fall outside the chunk.
fn neighbours(lx: usize, ly: usize) -> impl Iterator<Item = Option<usize>> {
    (-1i32..=1)
        .flat_map(|dy| (-1i32..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .map(move |(dx, dy)| {
            let nx = lx as i32 + dx;
            let ny = ly as i32 + dy;
            let size = CHUNK_SIZE as i32;
            if nx < 0 || ny < 0 || nx >= size || ny >= size {
                None
            } else {
                Some(tile_index(nx as usize, ny as usize))
            }
        })
}

/// Interior tile on the chunk border or next to a non-interior tile.
fn is_edge(interior: &[bool], lx: usize, ly: usize) -> bool {
    neighbours(lx, ly).any(|n| n.map_or(true, |i| !interior[i]))
}

/// Tile with at least one interior neighbour inside the chunk.
fn touches_interior(interior: &[bool], lx: usize, ly: usize) -> bool {
    neighbours(lx, ly).any(|n| n.is_some_and(|i| interior[i]))
}
