//! # World Manager
//!
//! Composition root: one generator, one store, one chunk manager, and a
//! maintenance thread that checkpoints and evicts on fixed intervals.
//!
//! ```text
//! maintenance thread
//!   every checkpoint_interval: save_all + respawn due resources
//!   every eviction_interval:   unload_stale
//!   on shutdown signal:        exit
//! shutdown(): stop thread, join, final save_all
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, select, tick, Sender};
use darkheim_procedural::{BiomeBounds, BiomeCatalog, SpawnDensity, WorldGenerator, WorldSeed};
use darkheim_shared::{ChunkCoord, Tile};
use parking_lot::Mutex;

use crate::config::WorldConfig;
use crate::error::WorldResult;
use crate::manager::{ChunkManager, ChunkRef, ManagerStats};
use crate::store::{ChunkStore, FileChunkStore};

struct Maintenance {
    shutdown_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// The running world.
pub struct WorldManager {
    config: WorldConfig,
    generator: Arc<WorldGenerator>,
    chunks: Arc<ChunkManager>,
    maintenance: Mutex<Option<Maintenance>>,
}

impl WorldManager {
    /// Loads biome data, opens the chunk store and starts maintenance.
    pub fn init(config: WorldConfig) -> WorldResult<Self> {
        let catalog = BiomeCatalog::load_dir(&config.biome_dir)?;
        let generator = WorldGenerator::new(WorldSeed::new(config.seed), catalog)?;
        let store = FileChunkStore::open(&config.save_dir)?;
        tracing::info!(
            "World ready: seed {}, {} biomes, saves in {}",
            config.seed,
            generator.catalog().loaded_count(),
            config.save_dir.display()
        );
        Ok(Self::with_parts(config, Arc::new(generator), Arc::new(store)))
    }

    /// Assembles a world from prepared parts and starts maintenance.
    #[must_use]
    pub fn with_parts(config: WorldConfig, generator: Arc<WorldGenerator>, store: Arc<dyn ChunkStore>) -> Self {
        let chunks = Arc::new(ChunkManager::new(
            Arc::clone(&generator),
            store,
            config.view_distance(),
            config.unload_timeout(),
        ));
        let maintenance = Self::start_maintenance(&config, Arc::clone(&chunks));
        Self { config, generator, chunks, maintenance: Mutex::new(Some(maintenance)) }
    }

    fn start_maintenance(config: &WorldConfig, chunks: Arc<ChunkManager>) -> Maintenance {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let checkpoint = tick(config.checkpoint_interval());
        let eviction = tick(config.eviction_interval());

        let handle = thread::spawn(move || loop {
            select! {
                recv(shutdown_rx) -> _ => break,
                recv(checkpoint) -> _ => {
                    chunks.save_all();
                    chunks.respawn_resources(unix_now());
                }
                recv(eviction) -> _ => {
                    chunks.unload_stale();
                }
            }
        });

        Maintenance { shutdown_tx, handle }
    }

    /// Stops maintenance and saves every dirty chunk.
    ///
    /// The world stays usable afterwards without periodic maintenance.
    /// Later edits are saved by the next call or when the world is dropped.
    pub fn shutdown(&self) {
        if let Some(maintenance) = self.maintenance.lock().take() {
            let _ = maintenance.shutdown_tx.send(());
            if maintenance.handle.join().is_err() {
                tracing::warn!("World maintenance thread panicked");
            }
            let saved = self.chunks.save_all();
            tracing::info!("World shut down, {} chunks saved", saved);
        } else {
            let saved = self.chunks.save_all();
            if saved > 0 {
                tracing::info!("Saved {} chunks edited after shutdown", saved);
            }
        }
    }

    // =========================================================================
    // CHUNKS
    // =========================================================================

    /// Chunk at a coordinate, loading or generating it.
    pub fn get_chunk(&self, chunk_x: i32, chunk_y: i32) -> ChunkRef {
        self.chunks.load_or_generate(ChunkCoord::new(chunk_x, chunk_y))
    }

    /// The view square around a chunk.
    pub fn get_chunks_around(&self, chunk_x: i32, chunk_y: i32) -> Vec<ChunkRef> {
        self.chunks.get_chunks_around(chunk_x, chunk_y)
    }

    /// Authoritative single-tile edit.
    pub fn update_tile(&self, chunk_x: i32, chunk_y: i32, local_x: usize, local_y: usize, tile: Tile) -> bool {
        self.chunks.update_tile(chunk_x, chunk_y, local_x, local_y, tile)
    }

    /// Solidity at a world pixel position; unknown is solid.
    #[must_use]
    pub fn is_solid(&self, world_x: f64, world_y: f64) -> bool {
        self.chunks.is_solid(world_x, world_y)
    }

    /// Saves every dirty chunk now.
    pub fn save_all(&self) -> usize {
        self.chunks.save_all()
    }

    /// Cache counters.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        self.chunks.stats()
    }

    /// The chunk cache.
    #[must_use]
    pub fn chunks(&self) -> &ChunkManager {
        &self.chunks
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Returns true if the chunk is inside the town's safe radius.
    #[must_use]
    pub fn is_in_town(&self, chunk_x: i32, chunk_y: i32) -> bool {
        self.generator.is_in_town(chunk_x, chunk_y)
    }

    /// Biome owning a chunk.
    #[must_use]
    pub fn biome_at_chunk(&self, chunk_x: i32, chunk_y: i32) -> &BiomeBounds {
        self.generator.resolver().biome_at(chunk_x, chunk_y)
    }

    /// Biome owning a world pixel position.
    #[must_use]
    pub fn biome_at_world(&self, world_x: f64, world_y: f64) -> &BiomeBounds {
        self.generator.resolver().biome_at_world(world_x, world_y)
    }

    /// Spawn density of an entry at a gradient position.
    #[must_use]
    pub fn density(&self, gradient: f64, entry: &SpawnDensity) -> f64 {
        self.generator.resolver().density(gradient, entry)
    }

    /// The generator.
    #[must_use]
    pub fn generator(&self) -> &WorldGenerator {
        &self.generator
    }

    /// World settings.
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }
}

impl Drop for WorldManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
}
