//! # Resource and Enemy Placement
//!
//! Both placers walk a coarse candidate grid over a finished chunk and roll
//! each configured entry independently at each open candidate:
//!
//! | Placer    | Grid           | Emits          |
//! |-----------|----------------|----------------|
//! | Resources | every 2nd tile | `ResourceNode` |
//! | Enemies   | every 4th, +1  | `SpawnPoint`   |
//!
//! Candidates on solid, water or town tiles are skipped. Cave-only entries
//! use cave floors only; other entries never do.

use std::sync::Arc;

use darkheim_shared::coord::tile_index;
use darkheim_shared::{ChunkCoord, Tile, CHUNK_SIZE};
use serde::{Deserialize, Serialize};

use crate::config::{BiomeBounds, EnemyEntry, ResourceDrop, ResourceEntry, SpawnDensity};
use crate::gradient::GradientResolver;
use crate::noise::{salt_of, NoiseField};
use crate::terrain::TileGrid;

const RESOURCE_STEP: usize = 2;
const RESOURCE_OFFSET: usize = 0;
const ENEMY_STEP: usize = 4;
const ENEMY_OFFSET: usize = 1;

/// Keeps resource and enemy rolls for the same id apart.
const RESOURCE_SALT: u32 = 0x5EED_0001;
const ENEMY_SALT: u32 = 0x5EED_0002;

/// A harvestable node in the world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Resource type id.
    pub id: String,
    /// World pixel X (tile center).
    pub x: f64,
    /// World pixel Y (tile center).
    pub y: f64,
    /// Remaining hit points.
    pub health: u32,
    /// Full hit points.
    pub max_health: u32,
    /// Tool class needed.
    pub tool: String,
    /// Minimum tool tier.
    pub tool_tier: u32,
    /// Drop table.
    pub drops: Vec<ResourceDrop>,
    /// Seconds until a depleted node regrows.
    pub respawn_time: u64,
    /// Client display color.
    pub color: String,
    /// Client display size.
    pub size: u32,
    /// Harvested and waiting to regrow.
    pub depleted: bool,
    /// Unix seconds when it was depleted.
    pub depleted_at: u64,
}

impl ResourceNode {
    fn new(entry: &ResourceEntry, x: f64, y: f64) -> Self {
        Self {
            id: entry.id.clone(),
            x,
            y,
            health: entry.health,
            max_health: entry.health,
            tool: entry.tool.clone(),
            tool_tier: entry.tool_tier,
            drops: entry.drops.clone(),
            respawn_time: entry.respawn_time,
            color: entry.color.clone(),
            size: entry.size,
            depleted: false,
            depleted_at: 0,
        }
    }
}

/// A generation-time enemy spawn hint (not a live entity).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Enemy type id.
    pub enemy_id: String,
    /// World pixel X.
    pub x: f64,
    /// World pixel Y.
    pub y: f64,
    /// Leash radius in pixels.
    pub spawn_radius: f64,
    /// The enemy's static config.
    pub config: EnemyEntry,
}

/// Returns true if an entry may be placed on this tile.
#[must_use]
pub fn can_place(tile: Tile, solid: bool, cave_only: bool) -> bool {
    if solid || tile.is_water() || tile.is_town() {
        return false;
    }
    if cave_only {
        tile.is_cave_floor()
    } else {
        !tile.is_cave_floor() && tile != Tile::CaveEntrance
    }
}

/// One chunk's candidate walk.
struct Scatter<'a> {
    noise: &'a NoiseField,
    resolver: &'a GradientResolver,
    coord: ChunkCoord,
    biome: &'a BiomeBounds,
    grid: &'a TileGrid,
}

impl Scatter<'_> {
    /// Calls `emit` for every candidate where the entry rolls under its
    /// density.
    fn run(
        &self,
        (step, offset): (usize, usize),
        density: &SpawnDensity,
        cave_only: bool,
        salt: u32,
        mut emit: impl FnMut(f64, f64),
    ) {
        for ly in (offset..CHUNK_SIZE).step_by(step) {
            for lx in (offset..CHUNK_SIZE).step_by(step) {
                let i = tile_index(lx, ly);
                if !can_place(self.grid.get(i), self.grid.is_solid(i), cave_only) {
                    continue;
                }
                let (wx, wy) = self.coord.tile_center(lx, ly);
                let gradient = self.resolver.gradient(wx as f64, self.biome);
                let roll = self.noise.seeded_random_salted(wx, wy, salt);
                if self.resolver.should_spawn(gradient, density, roll) {
                    emit(wx as f64, wy as f64);
                }
            }
        }
    }
}

/// Scatters harvestable resources.
pub struct ResourcePlacer {
    noise: Arc<NoiseField>,
    resolver: Arc<GradientResolver>,
}

impl ResourcePlacer {
    /// Creates a placer.
    #[must_use]
    pub fn new(noise: Arc<NoiseField>, resolver: Arc<GradientResolver>) -> Self {
        Self { noise, resolver }
    }

    /// Places every entry over the chunk's candidate grid.
    #[must_use]
    pub fn place(
        &self,
        coord: ChunkCoord,
        biome: &BiomeBounds,
        entries: &[ResourceEntry],
        grid: &TileGrid,
    ) -> Vec<ResourceNode> {
        let walk = Scatter { noise: &self.noise, resolver: &self.resolver, coord, biome, grid };
        let mut nodes = Vec::new();
        for entry in entries {
            walk.run(
                (RESOURCE_STEP, RESOURCE_OFFSET),
                &entry.density,
                entry.cave_only,
                salt_of(&entry.id) ^ RESOURCE_SALT,
                |x, y| nodes.push(ResourceNode::new(entry, x, y)),
            );
        }
        nodes
    }
}

/// Chooses enemy spawn markers.
pub struct EnemySpawner {
    noise: Arc<NoiseField>,
    resolver: Arc<GradientResolver>,
}

impl EnemySpawner {
    /// Creates a spawner.
    #[must_use]
    pub fn new(noise: Arc<NoiseField>, resolver: Arc<GradientResolver>) -> Self {
        Self { noise, resolver }
    }

    /// Rolls every entry over the chunk's candidate grid.
    #[must_use]
    pub fn spawn_points(
        &self,
        coord: ChunkCoord,
        biome: &BiomeBounds,
        entries: &[EnemyEntry],
        grid: &TileGrid,
    ) -> Vec<SpawnPoint> {
        let walk = Scatter { noise: &self.noise, resolver: &self.resolver, coord, biome, grid };
        let mut points = Vec::new();
        for entry in entries {
            walk.run(
                (ENEMY_STEP, ENEMY_OFFSET),
                &entry.density,
                entry.cave_only,
                salt_of(&entry.id) ^ ENEMY_SALT,
                |x, y| {
                    points.push(SpawnPoint {
                        enemy_id: entry.id.clone(),
                        x,
                        y,
                        spawn_radius: entry.spawn_radius,
                        config: entry.clone(),
                    });
                },
            );
        }
        points
    }
}
