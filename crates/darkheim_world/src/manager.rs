//! # Chunk Manager
//!
//! In-memory chunk cache over a [`ChunkStore`] and a [`WorldGenerator`].
//!
//! ## Lifecycle
//!
//! ```text
//! absent --load_or_generate--> resident --idle > timeout--> evicted
//!              |                   |                          |
//!      store hit: clean     reads touch, edits dirty    dirty: save first
//!      store miss: generate, dirty                      save failed: stay
//! ```
//!
//! ## Locking
//!
//! Each chunk key owns a slot. The slot mutex is held for the whole
//! load-or-generate, so a key is built at most once while it is resident,
//! and every caller gets the same chunk. Edits and flushes also run under
//! the slot mutex, so eviction never races a write. Lock order is slot
//! then cache map; the map lock is never held while waiting on a slot.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use darkheim_procedural::WorldGenerator;
use darkheim_shared::{ChunkCoord, Tile, CHUNK_SIZE, MAX_VIEW_DISTANCE};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::chunk::Chunk;
use crate::error::StoreResult;
use crate::store::ChunkStore;

/// Read handle to a resident chunk.
///
/// Handles stay valid after eviction but no longer see edits. Mutate
/// through the manager.
#[derive(Clone, Debug)]
pub struct ChunkRef {
    coord: ChunkCoord,
    chunk: Arc<RwLock<Chunk>>,
}

impl ChunkRef {
    /// Locks the chunk for reading. Tiles and solids are always consistent
    /// under the guard.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, Chunk> {
        self.chunk.read()
    }

    /// Chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns true if both handles point at the same in-memory chunk.
    #[inline]
    #[must_use]
    pub fn same_chunk(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.chunk, &other.chunk)
    }
}

enum SlotState {
    Empty,
    Resident(Arc<RwLock<Chunk>>),
    Evicted,
}

struct Slot {
    state: Mutex<SlotState>,
    last_access: AtomicU64,
}

impl Slot {
    fn new(now_ms: u64) -> Self {
        Self { state: Mutex::new(SlotState::Empty), last_access: AtomicU64::new(now_ms) }
    }

    #[inline]
    fn touch(&self, now_ms: u64) {
        self.last_access.fetch_max(now_ms, Ordering::Relaxed);
    }

    #[inline]
    fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_access.load(Ordering::Relaxed))
    }
}

/// Cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Chunks currently resident.
    pub resident: usize,
    /// Chunks produced by the pipeline.
    pub generated: u64,
    /// Chunks read back from the store.
    pub loaded: u64,
    /// Successful chunk saves.
    pub saved: u64,
    /// Chunks dropped from the cache.
    pub evicted: u64,
}

#[derive(Default)]
struct Counters {
    generated: AtomicU64,
    loaded: AtomicU64,
    saved: AtomicU64,
    evicted: AtomicU64,
}

/// Load-or-generate cache with checkpointing and idle eviction.
pub struct ChunkManager {
    generator: Arc<WorldGenerator>,
    store: Arc<dyn ChunkStore>,
    slots: Mutex<HashMap<ChunkCoord, Arc<Slot>>>,
    epoch: Instant,
    view_distance: i32,
    unload_timeout: Duration,
    counters: Counters,
}

impl ChunkManager {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(
        generator: Arc<WorldGenerator>,
        store: Arc<dyn ChunkStore>,
        view_distance: i32,
        unload_timeout: Duration,
    ) -> Self {
        Self {
            generator,
            store,
            slots: Mutex::new(HashMap::new()),
            epoch: Instant::now(),
            view_distance: view_distance.clamp(0, MAX_VIEW_DISTANCE),
            unload_timeout,
            counters: Counters::default(),
        }
    }

    // =========================================================================
    // ACCESS
    // =========================================================================

    /// Returns the chunk, loading or generating it on first use.
    pub fn load_or_generate(&self, coord: ChunkCoord) -> ChunkRef {
        self.with_chunk(coord, |chunk| ChunkRef { coord, chunk: Arc::clone(chunk) })
    }

    /// Returns the chunk only if it is already resident.
    #[must_use]
    pub fn get_chunk(&self, coord: ChunkCoord) -> Option<ChunkRef> {
        self.with_resident(coord, |chunk| ChunkRef { coord, chunk: Arc::clone(chunk) })
    }

    /// Every chunk in the view square around a chunk, loading as needed.
    pub fn get_chunks_around(&self, chunk_x: i32, chunk_y: i32) -> Vec<ChunkRef> {
        self.required_chunks(chunk_x, chunk_y)
            .into_iter()
            .map(|coord| self.load_or_generate(coord))
            .collect()
    }

    /// The view square around a chunk, row by row.
    #[must_use]
    pub fn required_chunks(&self, chunk_x: i32, chunk_y: i32) -> Vec<ChunkCoord> {
        let d = self.view_distance;
        let side = (2 * d + 1) as usize;
        let mut coords = Vec::with_capacity(side * side);
        for dy in -d..=d {
            for dx in -d..=d {
                coords.push(ChunkCoord::new(chunk_x.saturating_add(dx), chunk_y.saturating_add(dy)));
            }
        }
        coords
    }

    /// Replaces one tile, loading the chunk if needed.
    ///
    /// Returns false if the local position is outside a chunk.
    pub fn update_tile(&self, chunk_x: i32, chunk_y: i32, local_x: usize, local_y: usize, tile: Tile) -> bool {
        if local_x >= CHUNK_SIZE || local_y >= CHUNK_SIZE {
            return false;
        }
        self.with_chunk(ChunkCoord::new(chunk_x, chunk_y), |chunk| {
            chunk.write().set_tile(local_x, local_y, tile)
        })
    }

    /// Marks a resource node in a resident chunk harvested.
    pub fn deplete_resource(&self, coord: ChunkCoord, index: usize, now_secs: u64) -> bool {
        self.with_resident(coord, |chunk| chunk.write().deplete_resource(index, now_secs))
            .unwrap_or(false)
    }

    /// Solidity at a world pixel position. Anything not resident, or not a
    /// finite position, is solid.
    #[must_use]
    pub fn is_solid(&self, world_x: f64, world_y: f64) -> bool {
        let Some(coord) = ChunkCoord::from_world_pos(world_x, world_y) else {
            return true;
        };
        self.with_resident(coord, |chunk| {
            let chunk = chunk.read();
            chunk.world_to_local(world_x, world_y).map_or(true, |(lx, ly)| chunk.is_solid(lx, ly))
        })
        .unwrap_or(true)
    }

    /// Returns true if the chunk is cached.
    #[must_use]
    pub fn is_resident(&self, coord: ChunkCoord) -> bool {
        self.with_resident(coord, |_| ()).is_some()
    }

    /// Number of cached chunks.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.slots.lock().len()
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            resident: self.loaded_count(),
            generated: self.counters.generated.load(Ordering::Relaxed),
            loaded: self.counters.loaded.load(Ordering::Relaxed),
            saved: self.counters.saved.load(Ordering::Relaxed),
            evicted: self.counters.evicted.load(Ordering::Relaxed),
        }
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Saves every dirty resident chunk without evicting it.
    ///
    /// Failed saves are logged and stay dirty for the next checkpoint.
    /// Returns how many chunks were saved.
    pub fn save_all(&self) -> usize {
        let mut saved = 0;
        for (coord, slot) in self.snapshot() {
            let state = slot.state.lock();
            if let SlotState::Resident(chunk) = &*state {
                if matches!(self.flush(coord, chunk), Ok(true)) {
                    saved += 1;
                }
            }
        }
        if saved > 0 {
            tracing::info!("Checkpoint saved {} chunks", saved);
        }
        saved
    }

    /// Evicts chunks idle longer than the configured timeout.
    pub fn unload_stale(&self) -> usize {
        self.unload_idle(self.unload_timeout)
    }

    /// Evicts chunks idle longer than `timeout`, saving dirty ones first.
    ///
    /// A chunk whose save fails stays resident. Returns how many were
    /// evicted.
    pub fn unload_idle(&self, timeout: Duration) -> usize {
        let timeout_ms = timeout.as_millis() as u64;
        let now = self.now_ms();
        let candidates: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|(_, slot)| slot.idle_ms(now) > timeout_ms)
            .collect();

        let mut evicted = 0;
        for (coord, slot) in candidates {
            let mut state = slot.state.lock();
            // Touched while we waited for the slot.
            if slot.idle_ms(self.now_ms()) <= timeout_ms {
                continue;
            }
            if let SlotState::Resident(chunk) = &*state {
                if self.flush(coord, chunk).is_err() {
                    continue;
                }
            }
            *state = SlotState::Evicted;

            let mut slots = self.slots.lock();
            if slots.get(&coord).is_some_and(|s| Arc::ptr_eq(s, &slot)) {
                slots.remove(&coord);
            }
            evicted += 1;
        }

        if evicted > 0 {
            self.counters.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::info!("Evicted {} idle chunks", evicted);
        }
        evicted
    }

    /// Regrows due resource nodes in every resident chunk.
    pub fn respawn_resources(&self, now_secs: u64) -> usize {
        let mut count = 0;
        for (_, slot) in self.snapshot() {
            let state = slot.state.lock();
            if let SlotState::Resident(chunk) = &*state {
                count += chunk.write().respawn_due(now_secs);
            }
        }
        if count > 0 {
            tracing::debug!("Respawned {} resource nodes", count);
        }
        count
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Runs `f` on the resident chunk under its slot lock, loading or
    /// generating it first if needed.
    fn with_chunk<R>(&self, coord: ChunkCoord, f: impl FnOnce(&Arc<RwLock<Chunk>>) -> R) -> R {
        loop {
            let slot = self.slot(coord);
            let mut state = slot.state.lock();
            let chunk = match std::mem::replace(&mut *state, SlotState::Empty) {
                SlotState::Resident(chunk) => chunk,
                SlotState::Empty => Arc::new(RwLock::new(self.build(coord))),
                SlotState::Evicted => {
                    // Removed from the map while we waited; take a fresh slot.
                    *state = SlotState::Evicted;
                    continue;
                }
            };
            *state = SlotState::Resident(Arc::clone(&chunk));
            slot.touch(self.now_ms());
            return f(&chunk);
        }
    }

    /// Runs `f` on a resident chunk under its slot lock. `None` if the
    /// chunk is not resident. Waits for an in-flight load.
    fn with_resident<R>(&self, coord: ChunkCoord, f: impl FnOnce(&Arc<RwLock<Chunk>>) -> R) -> Option<R> {
        let slot = self.slots.lock().get(&coord).cloned()?;
        let state = slot.state.lock();
        let SlotState::Resident(chunk) = &*state else {
            return None;
        };
        slot.touch(self.now_ms());
        Some(f(chunk))
    }

    fn slot(&self, coord: ChunkCoord) -> Arc<Slot> {
        let now = self.now_ms();
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(coord).or_insert_with(|| Arc::new(Slot::new(now))))
    }

    fn snapshot(&self) -> Vec<(ChunkCoord, Arc<Slot>)> {
        self.slots.lock().iter().map(|(c, s)| (*c, Arc::clone(s))).collect()
    }

    /// Store first; a failed or unusable load falls through to generation.
    fn build(&self, coord: ChunkCoord) -> Chunk {
        match self.store.load(coord) {
            Ok(Some(data)) => match Chunk::from_save_data(data) {
                Ok(chunk) => {
                    self.counters.loaded.fetch_add(1, Ordering::Relaxed);
                    return chunk;
                }
                Err(err) => tracing::warn!("Chunk {} save unusable, regenerating: {}", coord, err),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("Chunk {} load failed, regenerating: {}", coord, err),
        }
        self.counters.generated.fetch_add(1, Ordering::Relaxed);
        Chunk::from_generated(self.generator.generate_chunk(coord))
    }

    /// Saves a dirty chunk. `Ok(false)` if it was clean.
    fn flush(&self, coord: ChunkCoord, chunk: &RwLock<Chunk>) -> StoreResult<bool> {
        let data = {
            let chunk = chunk.read();
            if !chunk.is_modified() {
                return Ok(false);
            }
            chunk.to_save_data()
        };
        match self.store.save(&data) {
            Ok(()) => {
                chunk.write().mark_saved();
                self.counters.saved.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(err) => {
                tracing::warn!("Chunk {} save failed, retrying next checkpoint: {}", coord, err);
                Err(err)
            }
        }
    }

    #[inline]
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkSaveData;
    use crate::error::StoreError;
    use crate::store::MemoryChunkStore;
    use darkheim_procedural::{BiomeCatalog, BiomeData, BiomeIndex, RiverNetwork, WorldSeed};
    use darkheim_shared::coord::tile_index;
    use std::sync::atomic::AtomicBool;

    fn generator() -> Arc<WorldGenerator> {
        let index = BiomeIndex::from_toml_str(
            r#"
                town_chunk_x = 100
                town_chunk_y = 100
                [[biomes]]
                id = "meadow"
                start_chunk_x = -50
                start_chunk_y = -50
                end_chunk_x = 50
                end_chunk_y = 50
            "#,
        )
        .unwrap();
        let meadow = BiomeData::from_toml_strs(
            "meadow",
            "",
            "base_tile = \"GRASS\"\n[[rules]]\ncondition = \"elevation > 0.7\"\ntile = \"CLIFF\"\nsolid = true\n",
            "",
            "",
        )
        .unwrap();
        let catalog = BiomeCatalog::from_parts(index, vec![meadow]).unwrap();
        Arc::new(WorldGenerator::with_rivers(WorldSeed::new(42), catalog, RiverNetwork::empty()).unwrap())
    }

    fn manager(store: Arc<dyn ChunkStore>) -> ChunkManager {
        ChunkManager::new(generator(), store, 1, Duration::from_secs(60))
    }

    /// Store whose saves can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryChunkStore,
        failing: AtomicBool,
        saves: AtomicU64,
    }

    impl ChunkStore for FlakyStore {
        fn load(&self, coord: ChunkCoord) -> StoreResult<Option<ChunkSaveData>> {
            self.inner.load(coord)
        }

        fn save(&self, data: &ChunkSaveData) -> StoreResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Io {
                    path: "flaky".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            self.inner.save(data)
        }

        fn exists(&self, coord: ChunkCoord) -> bool {
            self.inner.exists(coord)
        }
    }

    #[test]
    fn test_generate_once_then_cache() {
        let manager = manager(Arc::new(MemoryChunkStore::new()));
        let coord = ChunkCoord::new(3, -2);
        assert!(manager.get_chunk(coord).is_none());

        let a = manager.load_or_generate(coord);
        let b = manager.load_or_generate(coord);
        assert!(a.same_chunk(&b));
        assert!(a.read().is_modified(), "never saved");
        assert_eq!(manager.stats().generated, 1);
        assert!(manager.get_chunk(coord).is_some_and(|c| c.same_chunk(&a)));
    }

    #[test]
    fn test_concurrent_requests_generate_once() {
        let manager = Arc::new(manager(Arc::new(MemoryChunkStore::new())));
        let coord = ChunkCoord::new(7, 7);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = Arc::clone(&manager);
                std::thread::spawn(move || m.load_or_generate(coord))
            })
            .collect();
        let refs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(refs.iter().all(|r| r.same_chunk(&refs[0])));
        assert_eq!(manager.stats().generated, 1);
    }

    #[test]
    fn test_store_wins_over_generation() {
        let store = Arc::new(MemoryChunkStore::new());
        let coord = ChunkCoord::new(1, 1);
        {
            let first = manager(store.clone());
            assert!(first.update_tile(1, 1, 4, 4, Tile::Path));
            assert_eq!(first.save_all(), 1);
        }
        let second = manager(store);
        let chunk = second.load_or_generate(coord);
        assert_eq!(chunk.read().tile(4, 4), Some(Tile::Path));
        assert!(!chunk.read().is_modified());
        assert_eq!(second.stats().loaded, 1);
        assert_eq!(second.stats().generated, 0);
    }

    #[test]
    fn test_update_tile_keeps_invariant() {
        let manager = manager(Arc::new(MemoryChunkStore::new()));
        assert!(manager.update_tile(0, 0, 2, 3, Tile::Wall));
        assert!(!manager.update_tile(0, 0, 16, 3, Tile::Wall));

        let chunk = manager.get_chunk(ChunkCoord::new(0, 0)).unwrap();
        let chunk = chunk.read();
        assert_eq!(chunk.tile(2, 3), Some(Tile::Wall));
        assert!(chunk.solids()[tile_index(2, 3)]);
        for (tile, solid) in chunk.tiles().iter().zip(chunk.solids()) {
            assert_eq!(tile.is_solid(), *solid);
        }
    }

    #[test]
    fn test_is_solid_fails_closed() {
        let manager = manager(Arc::new(MemoryChunkStore::new()));
        assert!(manager.is_solid(10.0, 10.0), "not resident");
        assert!(manager.is_solid(f64::NAN, 0.0));
        assert!(manager.is_solid(f64::INFINITY, 0.0));

        manager.update_tile(0, 0, 0, 0, Tile::Path);
        manager.update_tile(0, 0, 1, 0, Tile::Wall);
        assert!(!manager.is_solid(10.0, 10.0));
        assert!(manager.is_solid(40.0, 10.0));
    }

    #[test]
    fn test_checkpoint_keeps_chunks_resident() {
        let store = Arc::new(MemoryChunkStore::new());
        let manager = manager(store.clone());
        let refs = manager.get_chunks_around(0, 0);
        assert_eq!(refs.len(), 9);
        assert_eq!(manager.save_all(), 9);
        assert_eq!(store.len(), 9);
        assert_eq!(manager.loaded_count(), 9);
        assert_eq!(manager.save_all(), 0, "nothing dirty");
    }

    #[test]
    fn test_eviction_saves_dirty_first() {
        let store = Arc::new(FlakyStore::default());
        let manager = manager(store.clone());
        let coord = ChunkCoord::new(2, 2);
        manager.update_tile(2, 2, 0, 0, Tile::Sand);

        assert_eq!(manager.unload_stale(), 0, "not idle yet");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(manager.unload_idle(Duration::ZERO), 1);
        assert!(!manager.is_resident(coord));
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);

        let back = manager.load_or_generate(coord);
        assert_eq!(back.read().tile(0, 0), Some(Tile::Sand));
    }

    #[test]
    fn test_failed_save_blocks_eviction() {
        let store = Arc::new(FlakyStore::default());
        let manager = manager(store.clone());
        let coord = ChunkCoord::new(-4, 0);
        manager.load_or_generate(coord);

        store.failing.store(true, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(manager.save_all(), 0);
        assert_eq!(manager.unload_idle(Duration::ZERO), 0);
        assert!(manager.is_resident(coord));
        assert!(manager.get_chunk(coord).unwrap().read().is_modified());

        store.failing.store(false, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(manager.unload_idle(Duration::ZERO), 1);
        assert!(store.exists(coord));
    }

    #[test]
    fn test_eviction_needs_idle_past_timeout() {
        let manager = manager(Arc::new(MemoryChunkStore::new()));
        let coord = ChunkCoord::new(3, 3);
        manager.load_or_generate(coord);
        assert_eq!(manager.unload_idle(Duration::from_secs(3600)), 0);
        assert!(manager.is_resident(coord));

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(manager.unload_idle(Duration::from_millis(1)), 1);
        assert!(!manager.is_resident(coord));
    }

    #[test]
    fn test_view_distance_is_clamped() {
        let store: Arc<dyn ChunkStore> = Arc::new(MemoryChunkStore::new());
        let wide = ChunkManager::new(generator(), Arc::clone(&store), i32::MAX, Duration::from_secs(60));
        let side = (2 * MAX_VIEW_DISTANCE + 1) as usize;
        assert_eq!(wide.required_chunks(0, 0).len(), side * side);

        let negative = ChunkManager::new(generator(), store, -7, Duration::from_secs(60));
        assert_eq!(negative.required_chunks(4, 4), vec![ChunkCoord::new(4, 4)]);
    }

    #[test]
    fn test_required_chunks_square() {
        let manager = manager(Arc::new(MemoryChunkStore::new()));
        let coords = manager.required_chunks(10, -10);
        assert_eq!(coords.len(), 9);
        assert_eq!(coords[0], ChunkCoord::new(9, -11));
        assert_eq!(coords[8], ChunkCoord::new(11, -9));
    }

    #[test]
    fn test_respawn_sweep() {
        let manager = manager(Arc::new(MemoryChunkStore::new()));
        let coord = ChunkCoord::new(0, 0);
        manager.load_or_generate(coord);
        assert_eq!(manager.respawn_resources(1_000), 0);
        assert!(!manager.deplete_resource(coord, 0, 1_000), "meadow test biome has no resources");
        assert!(!manager.deplete_resource(ChunkCoord::new(40, 40), 0, 1_000), "not resident");
    }
}
