//! # Chunk Store
//!
//! Durable persistence keyed by chunk coordinate.
//!
//! ## File Format
//!
//! ```text
//! <dir>/chunk_{x}_{y}.bin
//!   [4 bytes: uncompressed length, LE]   (lz4_flex size prefix)
//!   [N bytes: LZ4 block of the JSON-encoded ChunkSaveData]
//! ```
//!
//! Saves write `chunk_{x}_{y}.bin.tmp` and rename it over the real file, so
//! a crash mid-write leaves the previous save intact.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use darkheim_shared::ChunkCoord;
use lz4_flex::{compress_prepend_size, decompress_size_prepended};
use parking_lot::Mutex;

use crate::chunk::ChunkSaveData;
use crate::error::{StoreError, StoreResult};

/// A durable chunk backend.
///
/// Both operations may fail. The manager treats a failed load as "absent"
/// and keeps a chunk dirty when its save fails.
pub trait ChunkStore: Send + Sync {
    /// Loads a chunk, or `None` if it was never saved.
    fn load(&self, coord: ChunkCoord) -> StoreResult<Option<ChunkSaveData>>;

    /// Saves a chunk, replacing any previous save.
    fn save(&self, data: &ChunkSaveData) -> StoreResult<()>;

    /// Returns true if a save exists for the chunk.
    fn exists(&self, coord: ChunkCoord) -> bool;
}

/// Encodes save data into the on-disk byte format.
pub fn encode(data: &ChunkSaveData) -> StoreResult<Vec<u8>> {
    let json = serde_json::to_vec(data).map_err(|source| StoreError::Codec { coord: data.coord(), source })?;
    Ok(compress_prepend_size(&json))
}

/// Decodes the on-disk byte format, checking it belongs to `coord`.
pub fn decode(coord: ChunkCoord, bytes: &[u8]) -> StoreResult<ChunkSaveData> {
    let json = decompress_size_prepended(bytes).map_err(|source| StoreError::Decompress { coord, source })?;
    let data: ChunkSaveData = serde_json::from_slice(&json).map_err(|source| StoreError::Codec { coord, source })?;
    if data.coord() != coord {
        return Err(StoreError::InvalidData {
            coord,
            reason: format!("file holds chunk {}", data.coord()),
        });
    }
    Ok(data)
}

// =============================================================================
// FILE STORE
// =============================================================================

/// One compressed file per chunk in a directory.
#[derive(Debug)]
pub struct FileChunkStore {
    dir: PathBuf,
}

impl FileChunkStore {
    /// Opens a store, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;
        Ok(Self { dir })
    }

    /// Store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a chunk.
    #[must_use]
    pub fn path_for(&self, coord: ChunkCoord) -> PathBuf {
        self.dir.join(format!("chunk_{}_{}.bin", coord.x, coord.y))
    }
}

impl ChunkStore for FileChunkStore {
    fn load(&self, coord: ChunkCoord) -> StoreResult<Option<ChunkSaveData>> {
        let path = self.path_for(coord);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        decode(coord, &bytes).map(Some)
    }

    fn save(&self, data: &ChunkSaveData) -> StoreResult<()> {
        let bytes = encode(data)?;
        let path = self.path_for(data.coord());
        let tmp = path.with_extension("bin.tmp");
        fs::write(&tmp, &bytes).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, &path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            StoreError::Io { path, source }
        })
    }

    fn exists(&self, coord: ChunkCoord) -> bool {
        self.path_for(coord).is_file()
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Keeps encoded chunks in memory. For tests and throwaway worlds.
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    chunks: Mutex<HashMap<ChunkCoord, Vec<u8>>>,
}

impl MemoryChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    /// Returns true if nothing has been saved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.lock().is_empty()
    }
}

impl ChunkStore for MemoryChunkStore {
    fn load(&self, coord: ChunkCoord) -> StoreResult<Option<ChunkSaveData>> {
        let bytes = self.chunks.lock().get(&coord).cloned();
        bytes.map(|b| decode(coord, &b)).transpose()
    }

    fn save(&self, data: &ChunkSaveData) -> StoreResult<()> {
        let bytes = encode(data)?;
        self.chunks.lock().insert(data.coord(), bytes);
        Ok(())
    }

    fn exists(&self, coord: ChunkCoord) -> bool {
        self.chunks.lock().contains_key(&coord)
    }
}
