//! # Configuration Error Types
//!
//! Everything that can go wrong while loading biome data.

use std::path::PathBuf;

use darkheim_shared::Tile;
use thiserror::Error;

/// Errors raised while loading or validating biome configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid TOML for its schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed (`<inline>` for in-memory documents).
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// A terrain rule condition could not be parsed.
    #[error("biome {biome}: invalid condition {text:?}: {reason}")]
    InvalidCondition {
        /// Biome whose rule failed.
        biome: String,
        /// The condition text.
        text: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A rule declares a solidity that contradicts the tile's own.
    #[error("biome {biome}: rule for {tile:?} declares solid = {declared}")]
    SolidityMismatch {
        /// Biome whose rule failed.
        biome: String,
        /// The rule's tile.
        tile: Tile,
        /// The declared flag.
        declared: bool,
    },

    /// The biome index lists no biomes.
    #[error("biome index lists no biomes")]
    EmptyIndex,

    /// A biome's bounds are empty or inverted.
    #[error("biome {0}: bounds are empty")]
    InvalidBounds(String),

    /// A biome id appears twice in the index.
    #[error("biome {0} is listed twice")]
    DuplicateBiome(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
