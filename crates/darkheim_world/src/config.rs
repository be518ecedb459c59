//! World settings, read once from `world.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use darkheim_shared::{DEFAULT_SEED, MAX_VIEW_DISTANCE, VIEW_DISTANCE};
use serde::Deserialize;

use crate::error::{WorldError, WorldResult};

/// World configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed.
    pub seed: u64,
    /// Directory holding `index.toml` and one directory per biome.
    pub biome_dir: PathBuf,
    /// Directory chunk files are saved to.
    pub save_dir: PathBuf,
    /// Seconds between checkpoints of dirty chunks.
    pub checkpoint_interval_secs: u64,
    /// Seconds between eviction sweeps.
    pub eviction_interval_secs: u64,
    /// Seconds a chunk may go unread before it is evicted.
    pub unload_timeout_secs: u64,
    /// Chunks kept around a player in each direction.
    pub view_distance: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            biome_dir: PathBuf::from("data/biomes"),
            save_dir: PathBuf::from("saves/world"),
            checkpoint_interval_secs: 30,
            eviction_interval_secs: 30,
            unload_timeout_secs: 60,
            view_distance: VIEW_DISTANCE,
        }
    }
}

impl WorldConfig {
    /// Parses a settings document.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads a settings file.
    pub fn load(path: &Path) -> WorldResult<Self> {
        let settings = |reason: String| WorldError::Settings { path: path.to_path_buf(), reason };
        let text = std::fs::read_to_string(path).map_err(|e| settings(e.to_string()))?;
        Self::from_toml_str(&text).map_err(|e| settings(e.to_string()))
    }

    /// Checkpoint interval, at least one second.
    #[must_use]
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs.max(1))
    }

    /// Eviction sweep interval, at least one second.
    #[must_use]
    pub fn eviction_interval(&self) -> Duration {
        Duration::from_secs(self.eviction_interval_secs.max(1))
    }

    /// View distance clamped to `0..=MAX_VIEW_DISTANCE`.
    #[must_use]
    pub fn view_distance(&self) -> i32 {
        self.view_distance.clamp(0, MAX_VIEW_DISTANCE)
    }

    /// Inactivity window before eviction.
    #[must_use]
    pub fn unload_timeout(&self) -> Duration {
        Duration::from_secs(self.unload_timeout_secs)
    }
}
