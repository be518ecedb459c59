//! # River Network
//!
//! World-spanning water features, traced once at startup into a sparse
//! per-chunk overlay:
//!
//! - Rivers flowing west from the mountains, widening as they go, with the
//!   occasional lake along the way
//! - Swamp ponds (marsh water ringed by bog)
//! - Narrow lava streams in the volcanic biome
//! - Frozen lakes in the mountains
//!
//! Features are traced in world tile coordinates; a feature that crosses a
//! chunk border simply lands in the neighbouring chunk's overlay. Every
//! write goes through [`RiverNetwork::insert_tile`], where the higher
//! priority tile wins (see [`Tile::overlay_priority`]), so the result does
//! not depend on which feature was traced first.

use std::collections::HashMap;

use darkheim_shared::coord::tile_index;
use darkheim_shared::{ChunkCoord, Tile, CHUNK_SIZE, TILES_PER_CHUNK, TILE_SIZE};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::{BiomeBounds, BiomeIndex, RiverConfig};
use crate::noise::{purpose, NoiseField};
use crate::terrain::TileGrid;

/// Meander noise frequency for rivers (per pixel).
const RIVER_MEANDER_SCALE: f64 = 0.005;
/// Maximum lateral drift per river step, in tiles.
const RIVER_MEANDER_AMPLITUDE: f64 = 3.0;
/// Meander noise frequency for lava.
const LAVA_MEANDER_SCALE: f64 = 0.008;
/// Maximum lateral drift per lava step, in tiles.
const LAVA_MEANDER_AMPLITUDE: f64 = 2.0;
/// Lake radius = `LAKE_MIN_RADIUS + floor(roll * LAKE_RADIUS_FACTOR)`.
const LAKE_MIN_RADIUS: i64 = 3;
const LAKE_RADIUS_FACTOR: f64 = 600.0;

const CHUNK: i64 = CHUNK_SIZE as i64;

type ChunkOverlay = Box<[Option<Tile>; TILES_PER_CHUNK]>;

/// Sparse water overlay keyed by chunk.
#[derive(Clone, Debug, Default)]
pub struct RiverNetwork {
    overlay: HashMap<ChunkCoord, ChunkOverlay>,
}

impl RiverNetwork {
    /// A network with no features.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Traces every feature for the world.
    #[must_use]
    pub fn build(noise: &NoiseField, index: &BiomeIndex) -> Self {
        let mut tracer = Tracer {
            network: Self::empty(),
            noise,
            config: &index.rivers,
            rng: ChaCha8Rng::seed_from_u64(noise.seed().derive(purpose::RIVERS).value()),
        };

        for source in &index.rivers.sources {
            let range = source.lateral_range.saturating_abs();
            let start_cy = tracer.rng.gen_range(-range..=range);
            tracer.river(source.start_chunk_x, start_cy);
        }
        if let Some(swamp) = index.biome(&index.rivers.pond_biome) {
            tracer.swamp_ponds(swamp);
        }
        if let Some(volcanic) = index.biome(&index.rivers.lava_biome) {
            tracer.lava_streams(volcanic);
        }
        if let Some(mountain) = index.biome(&index.rivers.frozen_biome) {
            tracer.frozen_lakes(mountain);
        }

        let network = tracer.network;
        tracing::info!("River network built: {} chunks touched", network.chunk_count());
        network
    }

    /// Writes one overlay cell at a world tile position, keeping whichever
    /// of the old and new tile has the higher overlay priority.
    pub fn insert_tile(&mut self, tile_x: i64, tile_y: i64, tile: Tile) {
        let coord = ChunkCoord::from_tile_pos(tile_x, tile_y);
        let index = tile_index(tile_x.rem_euclid(CHUNK) as usize, tile_y.rem_euclid(CHUNK) as usize);
        let cell = &mut self
            .overlay
            .entry(coord)
            .or_insert_with(|| Box::new([None; TILES_PER_CHUNK]))[index];
        match *cell {
            Some(existing) if existing.overlay_priority() >= tile.overlay_priority() => {}
            _ => *cell = Some(tile),
        }
    }

    /// Copies the chunk's overlay onto its grid, leaving cave and town
    /// tiles alone.
    pub fn apply(&self, coord: ChunkCoord, grid: &mut TileGrid) {
        let Some(cells) = self.overlay.get(&coord) else {
            return;
        };
        for (i, cell) in cells.iter().enumerate() {
            if let Some(tile) = *cell {
                if !grid.get(i).is_overlay_protected() {
                    grid.set(i, tile);
                }
            }
        }
    }

    /// Overlay tile at a local position, if any.
    #[must_use]
    pub fn tile_at(&self, coord: ChunkCoord, local_x: usize, local_y: usize) -> Option<Tile> {
        if local_x >= CHUNK_SIZE || local_y >= CHUNK_SIZE {
            return None;
        }
        self.overlay.get(&coord).and_then(|c| c[tile_index(local_x, local_y)])
    }

    /// Returns true if the chunk has any overlay cells.
    #[inline]
    #[must_use]
    pub fn touches(&self, coord: ChunkCoord) -> bool {
        self.overlay.contains_key(&coord)
    }

    /// Number of chunks with overlay cells.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.overlay.len()
    }
}

struct Tracer<'a> {
    network: RiverNetwork,
    noise: &'a NoiseField,
    config: &'a RiverConfig,
    rng: ChaCha8Rng,
}

impl Tracer<'_> {
    /// One river from the middle of chunk `(start_cx, start_cy)` west to
    /// the configured limit.
    fn river(&mut self, start_cx: i32, start_cy: i32) {
        let west = self.config.west_limit_chunk_x;
        let span = f64::from(start_cx) - f64::from(west);
        if span <= 0.0 {
            return;
        }

        let mut tile_x = i64::from(start_cx) * CHUNK + CHUNK / 2;
        let mut tile_y = (i64::from(start_cy) * CHUNK + CHUNK / 2) as f64;

        while tile_x.div_euclid(CHUNK) > i64::from(west) {
            let cx = tile_x.div_euclid(CHUNK) as f64;
            let progress = (f64::from(start_cx) - cx) / span;
            let width = ((1.0 + progress * self.config.max_width_growth).floor() as i64).max(1);

            let px = (tile_x * i64::from(TILE_SIZE)) as f64;
            let py = tile_y * f64::from(TILE_SIZE);
            tile_y += (self.noise.detail(px, py, RIVER_MEANDER_SCALE) - 0.5) * RIVER_MEANDER_AMPLITUDE;
            tile_x -= 1;

            let row = tile_y.round() as i64;
            self.channel(tile_x, row, width);

            let roll = self.noise.seeded_random(tile_x * 3, (tile_y * 3.0) as i64);
            if roll < self.config.lake_chance {
                self.lake(tile_x, row, LAKE_MIN_RADIUS + (roll * LAKE_RADIUS_FACTOR).floor() as i64);
            }
        }
    }

    /// Rounded square of water `width` across, deep in the middle, with a
    /// one-tile sand border.
    fn channel(&mut self, x: i64, y: i64, width: i64) {
        let half = width / 2;
        for dy in -half..=half {
            for dx in -half..=half {
                if width > 2 && dx.abs() == half && dy.abs() == half {
                    continue;
                }
                let center = (dx == 0 && dy == 0) || (width >= 3 && dx.abs() <= 1 && dy.abs() <= 1);
                let tile = if center { Tile::DeepWater } else { Tile::Water };
                self.network.insert_tile(x + dx, y + dy, tile);
            }
        }

        let ring = half + 1;
        for dy in -ring..=ring {
            for dx in -ring..=ring {
                if dx.abs() <= half && dy.abs() <= half {
                    continue;
                }
                self.network.insert_tile(x + dx, y + dy, Tile::Sand);
            }
        }
    }

    /// Circular lake, deep inside half the radius, ringed with sand.
    fn lake(&mut self, x: i64, y: i64, radius: i64) {
        let r = radius as f64;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let dist = ((dx * dx + dy * dy) as f64).sqrt();
                if dist > r {
                    continue;
                }
                let tile = if dist < r * 0.5 { Tile::DeepWater } else { Tile::Water };
                self.network.insert_tile(x + dx, y + dy, tile);

                if dist > r - 1.5 {
                    for by in -1..=1 {
                        for bx in -1..=1 {
                            let (ox, oy) = (dx + bx, dy + by);
                            if ((ox * ox + oy * oy) as f64).sqrt() > r {
                                self.network.insert_tile(x + ox, y + oy, Tile::Sand);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Filled disc; `inner` inside `inner_fraction` of the radius.
    fn disc(&mut self, x: i64, y: i64, radius: i64, inner: Tile, outer: Tile, inner_fraction: f64) {
        let r = radius as f64;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let dist = ((dx * dx + dy * dy) as f64).sqrt();
                if dist > r {
                    continue;
                }
                let tile = if dist < r * inner_fraction { inner } else { outer };
                self.network.insert_tile(x + dx, y + dy, tile);
            }
        }
    }

    /// Random world tile inside a biome, `margin` chunks from its edges and
    /// `tile_margin` tiles from its chunk's edges.
    fn pick_site(&mut self, biome: &BiomeBounds, margin: i32, tile_margin: i64) -> (i64, i64) {
        let cx = pick(&mut self.rng, biome.start_chunk_x + margin, biome.end_chunk_x - margin);
        let cy = pick(&mut self.rng, biome.start_chunk_y + margin, biome.end_chunk_y - margin);
        let tx = self.rng.gen_range(tile_margin..=CHUNK - tile_margin);
        let ty = self.rng.gen_range(tile_margin..=CHUNK - tile_margin);
        (i64::from(cx) * CHUNK + tx, i64::from(cy) * CHUNK + ty)
    }

    fn swamp_ponds(&mut self, swamp: &BiomeBounds) {
        for _ in 0..self.config.swamp_ponds {
            let (x, y) = self.pick_site(swamp, 5, 3);
            let radius = self.rng.gen_range(2..=5);
            self.disc(x, y, radius, Tile::MarshWater, Tile::Bog, 0.4);
        }
    }

    fn frozen_lakes(&mut self, mountain: &BiomeBounds) {
        for _ in 0..self.config.frozen_lakes {
            let (x, y) = self.pick_site(mountain, 5, 4);
            let radius = self.rng.gen_range(2..=6);
            self.disc(x, y, radius, Tile::Ice, Tile::Ice, 0.0);
        }
    }

    /// Lava flows east from `start + 10 + 15 * n`, one or two tiles wide.
    fn lava_streams(&mut self, volcanic: &BiomeBounds) {
        for s in 0..self.config.lava_streams {
            let start_cx = volcanic.start_chunk_x.saturating_add(10).saturating_add((s as i32).saturating_mul(15));
            let mut tile_x = i64::from(start_cx) * CHUNK;
            let mut tile_y = (i64::from(self.rng.gen_range(-15..=15)) * CHUNK) as f64;

            for step in 0..self.config.lava_length {
                let px = (tile_x * i64::from(TILE_SIZE)) as f64;
                let py = tile_y * f64::from(TILE_SIZE);
                tile_y += (self.noise.detail(px, py, LAVA_MEANDER_SCALE) - 0.5) * LAVA_MEANDER_AMPLITUDE;

                let row = tile_y.round() as i64;
                self.network.insert_tile(tile_x, row, Tile::Lava);
                if step % 3 == 0 {
                    self.network.insert_tile(tile_x, row + 1, Tile::Lava);
                }
                tile_x += 1;
            }
        }
    }
}

/// Uniform pick in `[lo, hi]`, or the midpoint if the range is empty.
fn pick(rng: &mut ChaCha8Rng, lo: i32, hi: i32) -> i32 {
    if lo <= hi {
        rng.gen_range(lo..=hi)
    } else {
        lo + (hi - lo) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiverSource;
    use crate::noise::WorldSeed;

    fn index() -> BiomeIndex {
        BiomeIndex::from_toml_str(
            r#"
                [[biomes]]
                id = "meadow"
                start_chunk_x = -40
                start_chunk_y = -40
                end_chunk_x = 80
                end_chunk_y = 40

                [[biomes]]
                id = "swamp"
                start_chunk_x = 80
                start_chunk_y = -40
                end_chunk_x = 110
                end_chunk_y = 40

                [[biomes]]
                id = "mountain"
                start_chunk_x = 110
                start_chunk_y = -40
                end_chunk_x = 150
                end_chunk_y = 40

                [[biomes]]
                id = "volcanic"
                start_chunk_x = 150
                start_chunk_y = -40
                end_chunk_x = 190
                end_chunk_y = 40
            "#,
        )
        .unwrap()
    }

    fn build() -> RiverNetwork {
        RiverNetwork::build(&NoiseField::new(WorldSeed::new(42)), &index())
    }

    #[test]
    fn test_priority_is_order_independent() {
        let mut a = RiverNetwork::empty();
        a.insert_tile(5, -3, Tile::DeepWater);
        a.insert_tile(5, -3, Tile::Lava);

        let mut b = RiverNetwork::empty();
        b.insert_tile(5, -3, Tile::Lava);
        b.insert_tile(5, -3, Tile::DeepWater);

        let coord = ChunkCoord::new(0, -1);
        assert_eq!(a.tile_at(coord, 5, 13), Some(Tile::Lava));
        assert_eq!(b.tile_at(coord, 5, 13), Some(Tile::Lava));

        b.insert_tile(5, -3, Tile::Sand);
        assert_eq!(b.tile_at(coord, 5, 13), Some(Tile::Lava));
    }

    #[test]
    fn test_negative_tiles_land_in_right_chunk() {
        let mut net = RiverNetwork::empty();
        net.insert_tile(-1, -1, Tile::Water);
        assert_eq!(net.tile_at(ChunkCoord::new(-1, -1), 15, 15), Some(Tile::Water));
        assert_eq!(net.tile_at(ChunkCoord::new(0, 0), 0, 0), None);
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = build();
        let b = build();
        assert_eq!(a.chunk_count(), b.chunk_count());
        for (coord, cells) in &a.overlay {
            assert_eq!(Some(cells), b.overlay.get(coord), "chunk {coord} differs");
        }
    }

    #[test]
    fn test_rivers_reach_west_limit() {
        let net = build();
        assert!(net.chunk_count() > 100, "rivers should cross many chunks");
        let west = net.overlay.keys().map(|c| c.x).min().unwrap();
        assert!(west <= -7, "rivers stop near the west limit, got {west}");
        let has_deep = net
            .overlay
            .values()
            .any(|cells| cells.iter().any(|c| *c == Some(Tile::DeepWater)));
        assert!(has_deep);
    }

    #[test]
    fn test_biome_features_present() {
        let net = build();
        let count = |tile: Tile| {
            net.overlay
                .values()
                .flat_map(|cells| cells.iter())
                .filter(|c| **c == Some(tile))
                .count()
        };
        assert!(count(Tile::MarshWater) > 0);
        assert!(count(Tile::Bog) > 0);
        assert!(count(Tile::Ice) > 0);
        assert!(count(Tile::Lava) >= 160, "two lava streams");
    }

    #[test]
    fn test_extreme_lateral_range_does_not_panic() {
        let mut index = index();
        index.rivers.sources = vec![RiverSource { start_chunk_x: 5, lateral_range: i32::MIN }];
        let net = RiverNetwork::build(&NoiseField::new(WorldSeed::new(7)), &index);
        assert!(net.chunk_count() > 0);
    }

    #[test]
    fn test_apply_respects_protected_tiles() {
        let mut net = RiverNetwork::empty();
        for x in 0..16 {
            for y in 0..16 {
                net.insert_tile(x, y, Tile::DeepWater);
            }
        }
        let mut grid = TileGrid::filled(Tile::Grass);
        let protected = [Tile::CaveFloor, Tile::CaveWall, Tile::CaveEntrance, Tile::CaveMoss, Tile::CaveCrystal, Tile::Wall, Tile::Path, Tile::FloorWood, Tile::FloorStone, Tile::Door, Tile::MarketStall];
        for (i, tile) in protected.iter().enumerate() {
            grid.set(i, *tile);
        }
        net.apply(ChunkCoord::new(0, 0), &mut grid);

        for (i, tile) in protected.iter().enumerate() {
            assert_eq!(grid.get(i), *tile, "protected tile {tile:?} was overwritten");
        }
        for i in protected.len()..TILES_PER_CHUNK {
            assert_eq!(grid.get(i), Tile::DeepWater);
            assert!(!grid.is_solid(i));
        }
    }

    #[test]
    fn test_lava_is_solid_after_apply() {
        let mut net = RiverNetwork::empty();
        net.insert_tile(2, 2, Tile::Lava);
        let mut grid = TileGrid::filled(Tile::Ash);
        net.apply(ChunkCoord::new(0, 0), &mut grid);
        let i = tile_index(2, 2);
        assert_eq!(grid.get(i), Tile::Lava);
        assert!(grid.is_solid(i));
    }
}
