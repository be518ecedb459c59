//! # World Generator
//!
//! Runs the pipeline for one chunk, strictly in this order:
//!
//! ```text
//! terrain rules
//!   -> caves          (outside the town safe radius)
//!   -> river overlay  (outside the town safe radius, never over caves)
//!   -> town overlay   (chunks near the town center)
//!   -> resources      (outside the town safe radius)
//!   -> enemy spawns   (outside the town safe radius)
//! ```
//!
//! Later layers read the tiles earlier layers produced, so reordering
//! changes the world.

use std::sync::Arc;

use darkheim_shared::{ChunkCoord, Tile};

use crate::cave::CaveGenerator;
use crate::config::BiomeCatalog;
use crate::error::ConfigResult;
use crate::gradient::GradientResolver;
use crate::noise::{NoiseField, WorldSeed};
use crate::placement::{EnemySpawner, ResourceNode, ResourcePlacer, SpawnPoint};
use crate::river::RiverNetwork;
use crate::terrain::{TerrainGenerator, TileGrid};
use crate::town::TownOverlay;

/// The finished payload for one chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedChunk {
    /// Chunk coordinate.
    pub coord: ChunkCoord,
    /// Owning biome.
    pub biome_id: String,
    /// Tile ids, row-major.
    pub tiles: Vec<Tile>,
    /// Solidity, parallel to `tiles`.
    pub solids: Vec<bool>,
    /// Resource nodes.
    pub resources: Vec<ResourceNode>,
    /// Enemy spawn hints.
    pub spawn_points: Vec<SpawnPoint>,
    /// True if the biome had no data and flat terrain was used.
    pub fallback: bool,
}

impl GeneratedChunk {
    fn from_grid(coord: ChunkCoord, biome_id: &str, grid: TileGrid) -> Self {
        let (tiles, solids) = grid.into_parts();
        Self {
            coord,
            biome_id: biome_id.to_string(),
            tiles,
            solids,
            resources: Vec::new(),
            spawn_points: Vec::new(),
            fallback: false,
        }
    }
}

/// Owns every generation layer.
pub struct WorldGenerator {
    seed: WorldSeed,
    catalog: BiomeCatalog,
    noise: Arc<NoiseField>,
    resolver: Arc<GradientResolver>,
    terrain: TerrainGenerator,
    caves: CaveGenerator,
    rivers: RiverNetwork,
    town: TownOverlay,
    resources: ResourcePlacer,
    enemies: EnemySpawner,
}

impl WorldGenerator {
    /// Builds the generator, tracing the river network up front.
    pub fn new(seed: WorldSeed, catalog: BiomeCatalog) -> ConfigResult<Self> {
        let noise = NoiseField::new(seed);
        let rivers = RiverNetwork::build(&noise, catalog.index());
        Self::assemble(seed, catalog, noise, rivers)
    }

    /// Builds the generator around a prepared river network.
    pub fn with_rivers(seed: WorldSeed, catalog: BiomeCatalog, rivers: RiverNetwork) -> ConfigResult<Self> {
        Self::assemble(seed, catalog, NoiseField::new(seed), rivers)
    }

    fn assemble(
        seed: WorldSeed,
        catalog: BiomeCatalog,
        noise: NoiseField,
        rivers: RiverNetwork,
    ) -> ConfigResult<Self> {
        let noise = Arc::new(noise);
        let resolver = Arc::new(GradientResolver::new(catalog.index())?);
        let town = TownOverlay::new(catalog.index().town_chunk_x, catalog.index().town_chunk_y);
        Ok(Self {
            seed,
            terrain: TerrainGenerator::new(Arc::clone(&noise)),
            caves: CaveGenerator::new(Arc::clone(&noise)),
            resources: ResourcePlacer::new(Arc::clone(&noise), Arc::clone(&resolver)),
            enemies: EnemySpawner::new(Arc::clone(&noise), Arc::clone(&resolver)),
            catalog,
            noise,
            resolver,
            rivers,
            town,
        })
    }

    /// Generates one chunk. Never fails: a biome without data yields a
    /// flat fallback chunk.
    #[must_use]
    pub fn generate_chunk(&self, coord: ChunkCoord) -> GeneratedChunk {
        let bounds = self.resolver.biome_at(coord.x, coord.y);
        let Some(biome) = self.catalog.get(&bounds.id) else {
            tracing::warn!("No data for biome {} at chunk {}, using fallback", bounds.id, coord);
            return Self::fallback_chunk(coord, &bounds.id);
        };

        let mut grid = self.terrain.generate(coord, biome);
        let in_town = self.is_in_town(coord.x, coord.y);

        if !in_town {
            self.caves.carve(coord, biome, &mut grid);
            self.rivers.apply(coord, &mut grid);
        }
        if self.town.chunk_needs_overlay(coord) {
            self.town.apply(coord, &mut grid);
        }

        let (resources, spawn_points) = if in_town {
            (Vec::new(), Vec::new())
        } else {
            (
                self.resources.place(coord, bounds, &biome.resources, &grid),
                self.enemies.spawn_points(coord, bounds, &biome.enemies, &grid),
            )
        };

        GeneratedChunk {
            resources,
            spawn_points,
            ..GeneratedChunk::from_grid(coord, &bounds.id, grid)
        }
    }

    /// Flat grass, no features.
    #[must_use]
    pub fn fallback_chunk(coord: ChunkCoord, biome_id: &str) -> GeneratedChunk {
        GeneratedChunk {
            fallback: true,
            ..GeneratedChunk::from_grid(coord, biome_id, TileGrid::filled(Tile::Grass))
        }
    }

    /// Returns true if the chunk is within the town's safe radius
    /// (chunk-space distance, inclusive).
    #[must_use]
    pub fn is_in_town(&self, chunk_x: i32, chunk_y: i32) -> bool {
        let index = self.catalog.index();
        let dx = i64::from(chunk_x) - i64::from(index.town_chunk_x);
        let dy = i64::from(chunk_y) - i64::from(index.town_chunk_y);
        let r = i64::from(index.town_radius);
        dx * dx + dy * dy <= r * r
    }

    /// The world seed.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// The loaded biome catalog.
    #[inline]
    #[must_use]
    pub const fn catalog(&self) -> &BiomeCatalog {
        &self.catalog
    }

    /// The biome resolver.
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &GradientResolver {
        &self.resolver
    }

    /// The noise field.
    #[inline]
    #[must_use]
    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// The river network.
    #[inline]
    #[must_use]
    pub const fn rivers(&self) -> &RiverNetwork {
        &self.rivers
    }

    /// The town overlay.
    #[inline]
    #[must_use]
    pub const fn town(&self) -> &TownOverlay {
        &self.town
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BiomeData, BiomeIndex};

    fn catalog(with_data: bool) -> BiomeCatalog {
        let index = BiomeIndex::from_toml_str(
            r#"
                town_chunk_x = 0
                town_chunk_y = 0
                town_radius = 5

                [[biomes]]
                id = "meadow"
                start_chunk_x = 0
                start_chunk_y = -50
                end_chunk_x = 100
                end_chunk_y = 50
            "#,
        )
        .unwrap();
        let data = if with_data {
            vec![BiomeData::from_toml_strs(
                "meadow",
                "",
                r#"
                    base_tile = "GRASS"
                    [[rules]]
                    condition = "elevation < 0.3"
                    tile = "WATER"
                "#,
                "",
                "",
            )
            .unwrap()]
        } else {
            Vec::new()
        };
        BiomeCatalog::from_parts(index, data).unwrap()
    }

    #[test]
    fn test_is_in_town() {
        let gen = WorldGenerator::with_rivers(WorldSeed::new(42), catalog(true), RiverNetwork::empty()).unwrap();
        assert!(gen.is_in_town(3, 3), "9 + 9 <= 25");
        assert!(!gen.is_in_town(4, 4), "16 + 16 > 25");
        assert!(gen.is_in_town(-5, 0));
        assert!(!gen.is_in_town(i32::MIN, i32::MIN));
    }

    #[test]
    fn test_missing_biome_data_falls_back() {
        let gen = WorldGenerator::with_rivers(WorldSeed::new(42), catalog(false), RiverNetwork::empty()).unwrap();
        let chunk = gen.generate_chunk(ChunkCoord::new(20, 0));
        assert!(chunk.fallback);
        assert_eq!(chunk.biome_id, "meadow");
        assert!(chunk.tiles.iter().all(|t| *t == Tile::Grass));
        assert!(chunk.solids.iter().all(|s| !s));
        assert!(chunk.resources.is_empty() && chunk.spawn_points.is_empty());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = WorldGenerator::new(WorldSeed::new(42), catalog(true)).unwrap();
        let b = WorldGenerator::new(WorldSeed::new(42), catalog(true)).unwrap();
        for coord in [ChunkCoord::new(10, 0), ChunkCoord::new(0, 0), ChunkCoord::new(-3, 7)] {
            assert_eq!(a.generate_chunk(coord), b.generate_chunk(coord), "chunk {coord}");
        }
    }

    #[test]
    fn test_town_chunk_gets_overlay_and_no_features() {
        let gen = WorldGenerator::with_rivers(WorldSeed::new(42), catalog(true), RiverNetwork::empty()).unwrap();
        let chunk = gen.generate_chunk(ChunkCoord::new(0, 0));
        assert!(chunk.tiles.contains(&Tile::Path), "main roads cross the town chunk");
        assert!(chunk.resources.is_empty());
        assert!(chunk.spawn_points.is_empty());
    }
}
