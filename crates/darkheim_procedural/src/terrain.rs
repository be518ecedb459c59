//! # Terrain Rules
//!
//! Base terrain for a chunk: sample the four noise channels at each tile
//! center and take the first authored rule that matches.

use std::sync::Arc;

use darkheim_shared::coord::tile_index;
use darkheim_shared::{ChunkCoord, Tile, CHUNK_SIZE, TILES_PER_CHUNK};

use crate::config::{BiomeData, TerrainScales, TileRules, TileSample, ZoneConfig};
use crate::noise::NoiseField;

/// A chunk's tile grid and its parallel solidity grid.
///
/// Every write goes through [`set`](Self::set), so `solids[i]` always
/// equals `tiles[i].is_solid()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileGrid {
    tiles: Vec<Tile>,
    solids: Vec<bool>,
}

impl TileGrid {
    /// A grid filled with one tile.
    #[must_use]
    pub fn filled(tile: Tile) -> Self {
        Self {
            tiles: vec![tile; TILES_PER_CHUNK],
            solids: vec![tile.is_solid(); TILES_PER_CHUNK],
        }
    }

    /// Tile at a flat index.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Tile {
        self.tiles[index]
    }

    /// Solidity at a flat index.
    #[inline]
    #[must_use]
    pub fn is_solid(&self, index: usize) -> bool {
        self.solids[index]
    }

    /// Writes a tile and its solidity together.
    #[inline]
    pub fn set(&mut self, index: usize, tile: Tile) {
        self.tiles[index] = tile;
        self.solids[index] = tile.is_solid();
    }

    /// The tile array.
    #[inline]
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// The solidity array.
    #[inline]
    #[must_use]
    pub fn solids(&self) -> &[bool] {
        &self.solids
    }

    /// Splits into `(tiles, solids)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Tile>, Vec<bool>) {
        (self.tiles, self.solids)
    }
}

/// Zone gate value at a position: gate noise when a gate is active,
/// otherwise 1.0 (open).
#[inline]
#[must_use]
pub fn zone_value(noise: &NoiseField, world_x: f64, world_y: f64, zones: Option<&ZoneConfig>) -> f64 {
    match ZoneConfig::active(zones) {
        Some(z) => noise.detail(world_x, world_y, z.scale),
        None => 1.0,
    }
}

/// World pixel center of a local tile, as floats.
#[inline]
#[must_use]
pub fn tile_center_f64(coord: ChunkCoord, local_x: usize, local_y: usize) -> (f64, f64) {
    let (x, y) = coord.tile_center(local_x, local_y);
    (x as f64, y as f64)
}

/// Evaluates per-biome terrain rules.
pub struct TerrainGenerator {
    noise: Arc<NoiseField>,
}

impl TerrainGenerator {
    /// Creates a terrain generator over a shared noise field.
    #[must_use]
    pub fn new(noise: Arc<NoiseField>) -> Self {
        Self { noise }
    }

    /// The four rule inputs at a world position.
    #[must_use]
    pub fn sample(&self, world_x: f64, world_y: f64, scales: &TerrainScales) -> TileSample {
        TileSample {
            elevation: self.noise.elevation(world_x, world_y, scales.elevation_scale),
            moisture: self.noise.moisture(world_x, world_y, scales.moisture_scale),
            detail: self.noise.detail(world_x, world_y, scales.detail_scale),
            zone: zone_value(&self.noise, world_x, world_y, scales.zones.as_ref()),
        }
    }

    /// First matching rule's tile, or the base tile.
    #[must_use]
    pub fn classify(rules: &TileRules, sample: &TileSample) -> Tile {
        rules
            .rules
            .iter()
            .find(|rule| rule.condition.matches(sample))
            .map_or(rules.base_tile, |rule| rule.tile)
    }

    /// Generates base terrain for a chunk.
    #[must_use]
    pub fn generate(&self, coord: ChunkCoord, biome: &BiomeData) -> TileGrid {
        let mut grid = TileGrid::filled(biome.tiles.base_tile);
        let scales = &biome.document.terrain;

        for ly in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let (wx, wy) = tile_center_f64(coord, lx, ly);
                let sample = self.sample(wx, wy, scales);
                grid.set(tile_index(lx, ly), Self::classify(&biome.tiles, &sample));
            }
        }

        grid
    }
}
