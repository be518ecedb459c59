//! # World Error Types
//!
//! Persistence errors never reach gameplay callers: the manager turns a
//! failed load into a regeneration and a failed save into a retry on the
//! next checkpoint. Only [`WorldError`] from `WorldManager::init` is fatal.

use std::path::PathBuf;

use darkheim_procedural::ConfigError;
use darkheim_shared::ChunkCoord;
use thiserror::Error;

/// Errors from a chunk store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("chunk store I/O at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON encode or decode failure.
    #[error("chunk {coord} encoding: {source}")]
    Codec {
        /// Chunk involved.
        coord: ChunkCoord,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// LZ4 frame could not be decompressed.
    #[error("chunk {coord} decompression: {source}")]
    Decompress {
        /// Chunk involved.
        coord: ChunkCoord,
        /// Underlying error.
        #[source]
        source: lz4_flex::block::DecompressError,
    },

    /// Decoded data does not describe a valid chunk.
    #[error("chunk {coord} invalid: {reason}")]
    InvalidData {
        /// Chunk involved.
        coord: ChunkCoord,
        /// What was wrong.
        reason: String,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that stop a world from starting.
#[derive(Error, Debug)]
pub enum WorldError {
    /// Biome configuration could not be loaded.
    #[error("world configuration: {0}")]
    Config(#[from] ConfigError),

    /// The chunk store could not be opened.
    #[error("chunk store: {0}")]
    Store(#[from] StoreError),

    /// `world.toml` could not be read or parsed.
    #[error("world settings at {path}: {reason}")]
    Settings {
        /// Settings file.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },
}

/// Result type for world startup.
pub type WorldResult<T> = Result<T, WorldError>;
