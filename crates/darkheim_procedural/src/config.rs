//! # Biome Configuration
//!
//! Static world data, loaded once before the generator is built:
//!
//! ```text
//! data/biomes/
//! ├── index.toml          # bounds, curves, town, river network
//! └── <biome>/
//!     ├── biome.toml      # noise scales, zone gate, caves
//!     ├── tiles.toml      # ordered terrain rules
//!     ├── resources.toml  # harvestable nodes
//!     └── enemies.toml    # spawn markers
//! ```
//!
//! Rule conditions are parsed here, at load time, into [`Condition`]s so the
//! terrain pass never touches strings.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use darkheim_shared::{GradientCurve, Tile};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// INDEX
// =============================================================================

/// The biome index: where every biome lives and the world-wide features.
#[derive(Clone, Debug, Deserialize)]
pub struct BiomeIndex {
    /// Chunk X of the town center chunk.
    #[serde(default)]
    pub town_chunk_x: i32,
    /// Chunk Y of the town center chunk.
    #[serde(default)]
    pub town_chunk_y: i32,
    /// Safe radius around the town, in chunks.
    #[serde(default = "default_town_radius")]
    pub town_radius: i32,
    /// Biome regions, scanned in order.
    pub biomes: Vec<BiomeBounds>,
    /// Global river network parameters.
    #[serde(default)]
    pub rivers: RiverConfig,
}

const fn default_town_radius() -> i32 {
    5
}

impl BiomeIndex {
    /// Parses and validates an index document.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let index: Self = parse(Path::new(INLINE), text)?;
        index.validate()?;
        Ok(index)
    }

    /// Reads and validates an index file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let index: Self = parse(path, &read(path)?)?;
        index.validate()?;
        Ok(index)
    }

    /// Checks that there is at least one biome, every region is non-empty
    /// and no id repeats.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.biomes.is_empty() {
            return Err(ConfigError::EmptyIndex);
        }
        for (i, biome) in self.biomes.iter().enumerate() {
            if biome.end_chunk_x <= biome.start_chunk_x || biome.end_chunk_y <= biome.start_chunk_y {
                return Err(ConfigError::InvalidBounds(biome.id.clone()));
            }
            if self.biomes[..i].iter().any(|b| b.id == biome.id) {
                return Err(ConfigError::DuplicateBiome(biome.id.clone()));
            }
        }
        Ok(())
    }

    /// Looks up a biome region by id.
    #[must_use]
    pub fn biome(&self, id: &str) -> Option<&BiomeBounds> {
        self.biomes.iter().find(|b| b.id == id)
    }
}

/// A biome's rectangular region in chunk space (end exclusive).
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BiomeBounds {
    /// Biome id (also its data directory name).
    pub id: String,
    /// First chunk column.
    pub start_chunk_x: i32,
    /// First chunk row.
    pub start_chunk_y: i32,
    /// One past the last chunk column.
    pub end_chunk_x: i32,
    /// One past the last chunk row.
    pub end_chunk_y: i32,
    /// Curve applied to the biome's gradient.
    #[serde(default)]
    pub gradient_curve: GradientCurve,
}

impl BiomeBounds {
    /// Returns true if the chunk lies inside this region.
    #[inline]
    #[must_use]
    pub const fn contains(&self, chunk_x: i32, chunk_y: i32) -> bool {
        chunk_x >= self.start_chunk_x
            && chunk_x < self.end_chunk_x
            && chunk_y >= self.start_chunk_y
            && chunk_y < self.end_chunk_y
    }
}

/// One river source: a chunk column and a lateral range its row is drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct RiverSource {
    /// Chunk column the river starts in.
    pub start_chunk_x: i32,
    /// The start row is drawn from `[-lateral_range, lateral_range]`.
    pub lateral_range: i32,
}

/// River network parameters.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RiverConfig {
    /// Westward-flowing river sources.
    pub sources: Vec<RiverSource>,
    /// Rivers stop once they reach this chunk column.
    pub west_limit_chunk_x: i32,
    /// Per-step chance of a lake along a river.
    pub lake_chance: f64,
    /// Width cap growth: width = 1 + progress * `max_width_growth`.
    pub max_width_growth: f64,
    /// Number of swamp ponds.
    pub swamp_ponds: u32,
    /// Number of lava streams.
    pub lava_streams: u32,
    /// Tiles per lava stream.
    pub lava_length: u32,
    /// Number of frozen lakes.
    pub frozen_lakes: u32,
    /// Biome that hosts the ponds.
    pub pond_biome: String,
    /// Biome that hosts the lava streams.
    pub lava_biome: String,
    /// Biome that hosts the frozen lakes.
    pub frozen_biome: String,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                RiverSource { start_chunk_x: 155, lateral_range: 30 },
                RiverSource { start_chunk_x: 145, lateral_range: 25 },
                RiverSource { start_chunk_x: 130, lateral_range: 35 },
                RiverSource { start_chunk_x: 120, lateral_range: 20 },
            ],
            west_limit_chunk_x: -8,
            lake_chance: 0.008,
            max_width_growth: 4.0,
            swamp_ponds: 20,
            lava_streams: 2,
            lava_length: 160,
            frozen_lakes: 8,
            pond_biome: "swamp".to_string(),
            lava_biome: "volcanic".to_string(),
            frozen_biome: "mountain".to_string(),
        }
    }
}

// =============================================================================
// PER-BIOME DOCUMENTS
// =============================================================================

/// `biome.toml`: noise scales and optional cave carving.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BiomeDocument {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Noise scales and the zone gate.
    #[serde(default)]
    pub terrain: TerrainScales,
    /// Cave carving, if this biome has caves.
    #[serde(default)]
    pub cave: Option<CaveConfig>,
}

/// Noise frequencies, applied to world pixel coordinates.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TerrainScales {
    /// Elevation frequency.
    pub elevation_scale: f64,
    /// Moisture frequency.
    pub moisture_scale: f64,
    /// Detail frequency.
    pub detail_scale: f64,
    /// Coarse gate clustering terrain variation and caves.
    pub zones: Option<ZoneConfig>,
}

impl Default for TerrainScales {
    fn default() -> Self {
        Self {
            elevation_scale: 0.002,
            moisture_scale: 0.003,
            detail_scale: 0.05,
            zones: None,
        }
    }
}

/// Zone gate: tiles pass where coarse detail noise exceeds `threshold`.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct ZoneConfig {
    /// Disabled gates always pass.
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Gate noise frequency.
    pub scale: f64,
    /// Gate noise must be strictly above this.
    pub threshold: f64,
}

const fn enabled() -> bool {
    true
}

impl ZoneConfig {
    /// Returns the gate config only if it is switched on.
    #[inline]
    #[must_use]
    pub fn active(zones: Option<&Self>) -> Option<&Self> {
        zones.filter(|z| z.enabled)
    }
}

/// Cave carving parameters.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct CaveConfig {
    /// Cave noise must be below this to carve.
    pub threshold: f64,
    /// Lowest elevation that carves.
    pub min_elevation: f64,
    /// Highest elevation that carves.
    pub max_elevation: f64,
    /// Cave noise frequency.
    pub scale: f64,
    /// Chance of a moss floor.
    pub moss_chance: f64,
    /// Chance of a crystal floor.
    pub crystal_chance: f64,
}

impl Default for CaveConfig {
    fn default() -> Self {
        Self {
            threshold: 0.30,
            min_elevation: 0.5,
            max_elevation: 0.85,
            scale: 0.06,
            moss_chance: 0.2,
            crystal_chance: 0.0,
        }
    }
}

/// Raw `tiles.toml`.
#[derive(Deserialize)]
struct TileRulesDocument {
    base_tile: Tile,
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Deserialize)]
struct RawRule {
    condition: String,
    tile: Tile,
    #[serde(default)]
    solid: Option<bool>,
}

/// Compiled terrain rules.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRules {
    /// Tile used when no rule matches.
    pub base_tile: Tile,
    /// Rules in authored order; first match wins.
    pub rules: Vec<TileRule>,
}

/// One compiled terrain rule.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRule {
    /// When the rule applies.
    pub condition: Condition,
    /// Tile it produces.
    pub tile: Tile,
    /// Whether that tile blocks movement.
    pub solid: bool,
}

impl TileRules {
    /// Parses and compiles a `tiles.toml` document.
    pub fn from_toml_str(biome: &str, text: &str) -> ConfigResult<Self> {
        let doc: TileRulesDocument = parse(Path::new(INLINE), text)?;
        Self::compile(biome, doc)
    }

    fn compile(biome: &str, doc: TileRulesDocument) -> ConfigResult<Self> {
        let mut rules = Vec::with_capacity(doc.rules.len());
        for raw in doc.rules {
            let condition = raw.condition.parse::<Condition>().map_err(|reason| {
                ConfigError::InvalidCondition {
                    biome: biome.to_string(),
                    text: raw.condition.clone(),
                    reason,
                }
            })?;
            let solid = raw.tile.is_solid();
            if let Some(declared) = raw.solid {
                if declared != solid {
                    return Err(ConfigError::SolidityMismatch {
                        biome: biome.to_string(),
                        tile: raw.tile,
                        declared,
                    });
                }
            }
            rules.push(TileRule { condition, tile: raw.tile, solid });
        }
        Ok(Self { base_tile: doc.base_tile, rules })
    }
}

/// Density profile shared by resources and enemies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnDensity {
    /// Density at the biome's west edge (gradient 0).
    pub density_at_left: f64,
    /// Density at the biome's east edge (gradient 1).
    pub density_at_right: f64,
    /// Lowest gradient that spawns.
    #[serde(default)]
    pub min_gradient: f64,
    /// Highest gradient that spawns.
    #[serde(default = "one")]
    pub max_gradient: f64,
}

const fn one() -> f64 {
    1.0
}

/// One drop-table row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceDrop {
    /// Item id.
    pub item: String,
    /// Minimum quantity.
    #[serde(default = "one_u32")]
    pub min: u32,
    /// Maximum quantity.
    #[serde(default = "one_u32")]
    pub max: u32,
    /// Drop chance in `[0, 1]`.
    #[serde(default = "one")]
    pub chance: f64,
}

const fn one_u32() -> u32 {
    1
}

/// A harvestable resource type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Resource id.
    pub id: String,
    /// Density profile.
    #[serde(flatten)]
    pub density: SpawnDensity,
    /// Hit points.
    pub health: u32,
    /// Tool class needed to harvest.
    #[serde(default)]
    pub tool: String,
    /// Minimum tool tier.
    #[serde(default)]
    pub tool_tier: u32,
    /// Drop table.
    #[serde(default)]
    pub drops: Vec<ResourceDrop>,
    /// Seconds until a depleted node regrows.
    pub respawn_time: u64,
    /// Client display color.
    #[serde(default)]
    pub color: String,
    /// Client display size in pixels.
    #[serde(default = "default_size")]
    pub size: u32,
    /// Only on cave floors (or, when false, never on them).
    #[serde(default)]
    pub cave_only: bool,
}

const fn default_size() -> u32 {
    24
}

/// An enemy type that spawns in this biome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyEntry {
    /// Enemy id.
    pub id: String,
    /// Density profile.
    #[serde(flatten)]
    pub density: SpawnDensity,
    /// Leash radius around the spawn marker, in pixels.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f64,
    /// Enemy level.
    #[serde(default = "one_u32")]
    pub level: u32,
    /// Only on cave floors (or, when false, never on them).
    #[serde(default)]
    pub cave_only: bool,
}

const fn default_spawn_radius() -> f64 {
    64.0
}

#[derive(Deserialize)]
struct ResourceTable {
    #[serde(default)]
    resources: Vec<ResourceEntry>,
}

#[derive(Deserialize)]
struct EnemyTable {
    #[serde(default)]
    enemies: Vec<EnemyEntry>,
}

// =============================================================================
// CONDITIONS
// =============================================================================

/// Named value a rule clause tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoiseChannel {
    /// Elevation noise.
    Elevation,
    /// Moisture noise.
    Moisture,
    /// Detail noise.
    Detail,
    /// Zone gate noise (1.0 without a gate).
    Zone,
}

/// Clause comparator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
}

impl Comparator {
    #[inline]
    fn test(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Gt => value > threshold,
            Self::Ge => value >= threshold,
            Self::Eq => (value - threshold).abs() <= f64::EPSILON,
        }
    }
}

/// `field comparator threshold`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clause {
    /// Value tested.
    pub field: NoiseChannel,
    /// Comparison.
    pub comparator: Comparator,
    /// Right-hand side.
    pub threshold: f64,
}

/// The four values a rule can see for one tile.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TileSample {
    /// Elevation in `[0, 1]`.
    pub elevation: f64,
    /// Moisture in `[0, 1]`.
    pub moisture: f64,
    /// Detail in `[0, 1]`.
    pub detail: f64,
    /// Zone gate value in `[0, 1]`.
    pub zone: f64,
}

impl TileSample {
    #[inline]
    const fn get(&self, field: NoiseChannel) -> f64 {
        match field {
            NoiseChannel::Elevation => self.elevation,
            NoiseChannel::Moisture => self.moisture,
            NoiseChannel::Detail => self.detail,
            NoiseChannel::Zone => self.zone,
        }
    }
}

/// A conjunction of clauses, e.g. `elevation >= 0.5 && zone > 0.6`.
#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    /// All must hold.
    pub clauses: Vec<Clause>,
}

impl Condition {
    /// Returns true if every clause holds for `sample`.
    #[inline]
    #[must_use]
    pub fn matches(&self, sample: &TileSample) -> bool {
        self.clauses
            .iter()
            .all(|c| c.comparator.test(sample.get(c.field), c.threshold))
    }
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut clauses = Vec::new();
        for part in text.split("&&") {
            let tokens: Vec<&str> = part.split_whitespace().collect();
            let [field, op, value] = tokens.as_slice() else {
                return Err(format!("expected `field op value`, got {:?}", part.trim()));
            };
            let field = match *field {
                "elevation" => NoiseChannel::Elevation,
                "moisture" => NoiseChannel::Moisture,
                "detail" => NoiseChannel::Detail,
                "zone" => NoiseChannel::Zone,
                other => return Err(format!("unknown field {other:?}")),
            };
            let comparator = match *op {
                "<" => Comparator::Lt,
                "<=" => Comparator::Le,
                ">" => Comparator::Gt,
                ">=" => Comparator::Ge,
                "==" => Comparator::Eq,
                other => return Err(format!("unknown comparator {other:?}")),
            };
            let threshold: f64 = value
                .parse()
                .map_err(|_| format!("threshold {value:?} is not a number"))?;
            if !threshold.is_finite() {
                return Err(format!("threshold {value:?} is not finite"));
            }
            clauses.push(Clause { field, comparator, threshold });
        }
        Ok(Self { clauses })
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" && ")?;
            }
            let field = match c.field {
                NoiseChannel::Elevation => "elevation",
                NoiseChannel::Moisture => "moisture",
                NoiseChannel::Detail => "detail",
                NoiseChannel::Zone => "zone",
            };
            let op = match c.comparator {
                Comparator::Lt => "<",
                Comparator::Le => "<=",
                Comparator::Gt => ">",
                Comparator::Ge => ">=",
                Comparator::Eq => "==",
            };
            write!(f, "{field} {op} {}", c.threshold)?;
        }
        Ok(())
    }
}

// =============================================================================
// BIOME DATA + CATALOG
// =============================================================================

/// Everything the generator needs for one biome.
#[derive(Clone, Debug)]
pub struct BiomeData {
    /// Biome id.
    pub id: String,
    /// Noise scales and caves.
    pub document: BiomeDocument,
    /// Terrain rules.
    pub tiles: TileRules,
    /// Resource table.
    pub resources: Vec<ResourceEntry>,
    /// Enemy table.
    pub enemies: Vec<EnemyEntry>,
}

impl BiomeData {
    /// Builds biome data from the four documents' text.
    pub fn from_toml_strs(
        id: &str,
        biome: &str,
        tiles: &str,
        resources: &str,
        enemies: &str,
    ) -> ConfigResult<Self> {
        let inline = Path::new(INLINE);
        Ok(Self {
            id: id.to_string(),
            document: parse(inline, biome)?,
            tiles: TileRules::from_toml_str(id, tiles)?,
            resources: parse::<ResourceTable>(inline, resources)?.resources,
            enemies: parse::<EnemyTable>(inline, enemies)?.enemies,
        })
    }

    /// Loads `<dir>/<id>/{biome,tiles,resources,enemies}.toml`.
    pub fn load(dir: &Path, id: &str) -> ConfigResult<Self> {
        let base = dir.join(id);
        let file = |name: &str| -> ConfigResult<(PathBuf, String)> {
            let path = base.join(name);
            let text = read(&path)?;
            Ok((path, text))
        };

        let (path, text) = file("biome.toml")?;
        let document: BiomeDocument = parse(&path, &text)?;

        let (path, text) = file("tiles.toml")?;
        let tiles = TileRules::compile(id, parse(&path, &text)?)?;

        let (path, text) = file("resources.toml")?;
        let resources = parse::<ResourceTable>(&path, &text)?.resources;

        let (path, text) = file("enemies.toml")?;
        let enemies = parse::<EnemyTable>(&path, &text)?.enemies;

        Ok(Self { id: id.to_string(), document, tiles, resources, enemies })
    }
}

/// The validated index plus every biome whose data loaded.
#[derive(Clone, Debug)]
pub struct BiomeCatalog {
    index: BiomeIndex,
    data: HashMap<String, BiomeData>,
}

impl BiomeCatalog {
    /// Loads `index.toml` and every listed biome from `dir`.
    ///
    /// A broken index is an error. A broken biome is logged and left out,
    /// so its chunks fall back to flat terrain.
    pub fn load_dir(dir: &Path) -> ConfigResult<Self> {
        let index = BiomeIndex::load(&dir.join("index.toml"))?;
        let mut data = HashMap::with_capacity(index.biomes.len());
        for bounds in &index.biomes {
            match BiomeData::load(dir, &bounds.id) {
                Ok(biome) => {
                    data.insert(bounds.id.clone(), biome);
                }
                Err(err) => {
                    tracing::warn!("Biome {} rejected, using fallback terrain: {}", bounds.id, err);
                }
            }
        }
        tracing::info!("Loaded {} of {} biomes from {}", data.len(), index.biomes.len(), dir.display());
        Ok(Self { index, data })
    }

    /// Builds a catalog from already-parsed parts.
    pub fn from_parts(index: BiomeIndex, biomes: Vec<BiomeData>) -> ConfigResult<Self> {
        index.validate()?;
        let data = biomes.into_iter().map(|b| (b.id.clone(), b)).collect();
        Ok(Self { index, data })
    }

    /// The biome index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> &BiomeIndex {
        &self.index
    }

    /// Data for a biome, if it loaded.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BiomeData> {
        self.data.get(id)
    }

    /// Number of biomes with loaded data.
    #[inline]
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.data.len()
    }
}

// =============================================================================
// HELPERS
// =============================================================================

const INLINE: &str = "<inline>";

fn read(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: DeserializeOwned>(path: &Path, text: &str) -> ConfigResult<T> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
