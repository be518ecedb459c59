//! # Darkheim Procedural Generation
//!
//! Deterministic tile-world generation, one 16x16 chunk at a time.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed and biome data always produce the same chunk
//! 2. **Data-driven**: Biomes, tile rules, resources and enemies come from TOML
//! 3. **Layered**: Each chunk runs the fixed pipeline in [`generator`]
//! 4. **Infallible at runtime**: Broken biome data degrades to flat terrain
//!
//! ## Core Components
//!
//! - `NoiseField`: seeded simplex channels plus position hashing
//! - `BiomeCatalog`: the world index and every biome's documents
//! - `GradientResolver`: chunk to biome, and spawn density along a biome
//! - `TerrainGenerator`, `CaveGenerator`: per-chunk base layers
//! - `RiverNetwork`: world-wide water and lava, traced once at startup
//! - `TownOverlay`: the hand-authored town
//! - `ResourcePlacer`, `EnemySpawner`: feature scatter
//! - `WorldGenerator`: runs all of the above in order
//!
//! ## Example
//!
//! ```rust,ignore
//! use darkheim_procedural::{BiomeCatalog, WorldGenerator, WorldSeed};
//! use darkheim_shared::ChunkCoord;
//!
//! let catalog = BiomeCatalog::load_dir(std::path::Path::new("data/biomes"))?;
//! let generator = WorldGenerator::new(WorldSeed::new(42), catalog)?;
//! let chunk = generator.generate_chunk(ChunkCoord::new(12, -3));
//! assert_eq!(chunk.tiles.len(), 256);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod cave;
pub mod config;
pub mod error;
pub mod generator;
pub mod gradient;
pub mod noise;
pub mod placement;
pub mod river;
pub mod terrain;
pub mod town;

pub use cave::CaveGenerator;
pub use config::{
    BiomeBounds, BiomeCatalog, BiomeData, BiomeDocument, BiomeIndex, CaveConfig, Condition,
    EnemyEntry, ResourceDrop, ResourceEntry, RiverConfig, SpawnDensity, TileRules, ZoneConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use generator::{GeneratedChunk, WorldGenerator};
pub use gradient::GradientResolver;
pub use noise::{NoiseField, SimplexNoise, WorldSeed};
pub use placement::{EnemySpawner, ResourceNode, ResourcePlacer, SpawnPoint};
pub use river::RiverNetwork;
pub use terrain::{TerrainGenerator, TileGrid};
pub use town::TownOverlay;
