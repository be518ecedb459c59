//! # Darkheim World
//!
//! Chunk lifecycle on top of the generation pipeline.
//!
//! ## Guarantees
//!
//! 1. **Persisted wins**: a chunk in the store is never regenerated
//! 2. **Built once**: one load-or-generate per chunk key while resident
//! 3. **No silent loss**: dirty chunks are saved before eviction, and a
//!    failed save keeps the chunk resident and dirty
//! 4. **Fail closed**: unknown positions are solid
//!
//! ## Example
//!
//! ```rust,ignore
//! use darkheim_world::{WorldConfig, WorldManager};
//!
//! let world = WorldManager::init(WorldConfig::default())?;
//! for chunk in world.get_chunks_around(0, 0) {
//!     send_to_player(chunk.read().to_client_data());
//! }
//! world.shutdown();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod chunk;
pub mod config;
pub mod error;
pub mod manager;
pub mod store;
pub mod world;

pub use chunk::{Chunk, ChunkSaveData, ClientChunk, ClientResource};
pub use config::WorldConfig;
pub use error::{StoreError, StoreResult, WorldError, WorldResult};
pub use manager::{ChunkManager, ChunkRef, ManagerStats};
pub use store::{ChunkStore, FileChunkStore, MemoryChunkStore};
pub use world::WorldManager;
