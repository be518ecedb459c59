//! # Chunk
//!
//! The cached and persisted unit of world state.
//!
//! `tiles` and `solids` only change together: every mutation goes through
//! [`Chunk::set_tile`], which writes both and marks the chunk dirty.
//! Changing a tile does not mark neighbouring chunks; the server renders
//! nothing, so shared edges need no refresh.

use darkheim_procedural::{GeneratedChunk, ResourceNode, SpawnPoint};
use darkheim_shared::coord::tile_index;
use darkheim_shared::{ChunkCoord, Tile, CHUNK_SIZE, TILES_PER_CHUNK, TILE_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// One chunk of the world.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    coord: ChunkCoord,
    biome_id: String,
    tiles: Vec<Tile>,
    solids: Vec<bool>,
    resources: Vec<ResourceNode>,
    spawn_points: Vec<SpawnPoint>,
    structures: Vec<serde_json::Value>,
    generated: bool,
    modified: bool,
}

impl Chunk {
    /// Wraps fresh pipeline output. It has never been saved, so it starts
    /// dirty.
    #[must_use]
    pub fn from_generated(generated: GeneratedChunk) -> Self {
        Self {
            coord: generated.coord,
            biome_id: generated.biome_id,
            tiles: generated.tiles,
            solids: generated.solids,
            resources: generated.resources,
            spawn_points: generated.spawn_points,
            structures: Vec::new(),
            generated: true,
            modified: true,
        }
    }

    /// Rebuilds a chunk from persisted data, verbatim. Clean on return.
    pub fn from_save_data(data: ChunkSaveData) -> StoreResult<Self> {
        let coord = ChunkCoord::new(data.chunk_x, data.chunk_y);
        let invalid = |reason: String| StoreError::InvalidData { coord, reason };

        if data.tiles.len() != TILES_PER_CHUNK {
            return Err(invalid(format!("{} tiles, expected {TILES_PER_CHUNK}", data.tiles.len())));
        }
        if data.solids.len() != TILES_PER_CHUNK {
            return Err(invalid(format!("{} solids, expected {TILES_PER_CHUNK}", data.solids.len())));
        }
        let tiles = data
            .tiles
            .iter()
            .map(|&id| Tile::from_id(id).ok_or_else(|| invalid(format!("unknown tile id {id}"))))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Self {
            coord,
            biome_id: data.biome_id,
            tiles,
            solids: data.solids,
            resources: data.resources,
            spawn_points: data.spawn_points,
            structures: data.structures,
            generated: true,
            modified: false,
        })
    }

    /// Everything needed to rebuild this chunk.
    #[must_use]
    pub fn to_save_data(&self) -> ChunkSaveData {
        ChunkSaveData {
            chunk_x: self.coord.x,
            chunk_y: self.coord.y,
            biome_id: self.biome_id.clone(),
            tiles: self.tiles.iter().map(|t| t.id()).collect(),
            solids: self.solids.clone(),
            resources: self.resources.clone(),
            spawn_points: self.spawn_points.clone(),
            structures: self.structures.clone(),
        }
    }

    /// What a client is sent. Health and respawn timers stay server-side.
    #[must_use]
    pub fn to_client_data(&self) -> ClientChunk {
        ClientChunk {
            chunk_x: self.coord.x,
            chunk_y: self.coord.y,
            biome_id: self.biome_id.clone(),
            tiles: self.tiles.iter().map(|t| t.id()).collect(),
            solids: self.solids.clone(),
            resources: self
                .resources
                .iter()
                .map(|r| ClientResource {
                    id: r.id.clone(),
                    x: r.x,
                    y: r.y,
                    color: r.color.clone(),
                    size: r.size,
                    depleted: r.depleted,
                })
                .collect(),
        }
    }

    // =========================================================================
    // TILES
    // =========================================================================

    /// Tile at a local position.
    #[must_use]
    pub fn tile(&self, local_x: usize, local_y: usize) -> Option<Tile> {
        in_chunk(local_x, local_y).then(|| self.tiles[tile_index(local_x, local_y)])
    }

    /// Solidity at a local position. Out of range is solid.
    #[must_use]
    pub fn is_solid(&self, local_x: usize, local_y: usize) -> bool {
        !in_chunk(local_x, local_y) || self.solids[tile_index(local_x, local_y)]
    }

    /// Replaces one tile and its solidity, and marks the chunk dirty.
    ///
    /// Returns false if the position is outside the chunk.
    pub fn set_tile(&mut self, local_x: usize, local_y: usize, tile: Tile) -> bool {
        if !in_chunk(local_x, local_y) {
            return false;
        }
        let i = tile_index(local_x, local_y);
        self.tiles[i] = tile;
        self.solids[i] = tile.is_solid();
        self.modified = true;
        true
    }

    /// Local tile under a world pixel position, if it lies in this chunk.
    #[must_use]
    pub fn world_to_local(&self, world_x: f64, world_y: f64) -> Option<(usize, usize)> {
        if ChunkCoord::from_world_pos(world_x, world_y)? != self.coord {
            return None;
        }
        let tile = f64::from(TILE_SIZE);
        let lx = ((world_x - self.coord.world_x() as f64) / tile).floor() as usize;
        let ly = ((world_y - self.coord.world_y() as f64) / tile).floor() as usize;
        Some((lx.min(CHUNK_SIZE - 1), ly.min(CHUNK_SIZE - 1)))
    }

    // =========================================================================
    // RESOURCES
    // =========================================================================

    /// Marks a resource node harvested at `now_secs`.
    ///
    /// Returns false if the index is out of range or already depleted.
    pub fn deplete_resource(&mut self, index: usize, now_secs: u64) -> bool {
        let Some(node) = self.resources.get_mut(index) else {
            return false;
        };
        if node.depleted {
            return false;
        }
        node.depleted = true;
        node.depleted_at = now_secs;
        node.health = 0;
        self.modified = true;
        true
    }

    /// Regrows every depleted node whose respawn time has passed.
    ///
    /// Returns how many regrew.
    pub fn respawn_due(&mut self, now_secs: u64) -> usize {
        let mut count = 0;
        for node in &mut self.resources {
            if node.depleted && now_secs >= node.depleted_at.saturating_add(node.respawn_time) {
                node.depleted = false;
                node.depleted_at = 0;
                node.health = node.max_health;
                count += 1;
            }
        }
        if count > 0 {
            self.modified = true;
        }
        count
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Owning biome.
    #[inline]
    #[must_use]
    pub fn biome_id(&self) -> &str {
        &self.biome_id
    }

    /// Tile ids, row-major.
    #[inline]
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Solidity, parallel to [`Self::tiles`].
    #[inline]
    #[must_use]
    pub fn solids(&self) -> &[bool] {
        &self.solids
    }

    /// Resource nodes.
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &[ResourceNode] {
        &self.resources
    }

    /// Enemy spawn hints.
    #[inline]
    #[must_use]
    pub fn spawn_points(&self) -> &[SpawnPoint] {
        &self.spawn_points
    }

    /// Player-placed structures, opaque to the world layer.
    #[inline]
    #[must_use]
    pub fn structures(&self) -> &[serde_json::Value] {
        &self.structures
    }

    /// Adds a player-placed structure and marks the chunk dirty.
    pub fn add_structure(&mut self, structure: serde_json::Value) {
        self.structures.push(structure);
        self.modified = true;
    }

    /// Content came from the pipeline or the store.
    #[inline]
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        self.generated
    }

    /// In-memory content differs from the store.
    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    /// Called after a successful save.
    #[inline]
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }
}

#[inline]
const fn in_chunk(local_x: usize, local_y: usize) -> bool {
    local_x < CHUNK_SIZE && local_y < CHUNK_SIZE
}

// =============================================================================
// WIRE FORMS
// =============================================================================

/// Persisted form of a chunk. Tiles are stored as numeric ids.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkSaveData {
    /// Chunk X.
    pub chunk_x: i32,
    /// Chunk Y.
    pub chunk_y: i32,
    /// Owning biome.
    pub biome_id: String,
    /// Tile ids.
    pub tiles: Vec<u8>,
    /// Solidity.
    pub solids: Vec<bool>,
    /// Resource nodes with their timers.
    pub resources: Vec<ResourceNode>,
    /// Enemy spawn hints.
    pub spawn_points: Vec<SpawnPoint>,
    /// Player-placed structures.
    #[serde(default)]
    pub structures: Vec<serde_json::Value>,
}

impl ChunkSaveData {
    /// The chunk this data belongs to.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.chunk_x, self.chunk_y)
    }
}

/// Client view of a chunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientChunk {
    /// Chunk X.
    pub chunk_x: i32,
    /// Chunk Y.
    pub chunk_y: i32,
    /// Owning biome.
    pub biome_id: String,
    /// Tile ids.
    pub tiles: Vec<u8>,
    /// Solidity.
    pub solids: Vec<bool>,
    /// Trimmed resource list.
    pub resources: Vec<ClientResource>,
}

/// Client view of a resource node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientResource {
    /// Resource type id.
    pub id: String,
    /// World pixel X.
    pub x: f64,
    /// World pixel Y.
    pub y: f64,
    /// Display color.
    pub color: String,
    /// Display size.
    pub size: u32,
    /// Harvested and waiting to regrow.
    pub depleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated(coord: ChunkCoord) -> GeneratedChunk {
        let mut tiles = vec![Tile::Grass; TILES_PER_CHUNK];
        tiles[tile_index(3, 4)] = Tile::Lava;
        let solids = tiles.iter().map(|t| t.is_solid()).collect();
        GeneratedChunk {
            coord,
            biome_id: "meadow".to_string(),
            tiles,
            solids,
            resources: vec![ResourceNode {
                id: "oak_tree".to_string(),
                x: 16.0,
                y: 48.0,
                health: 5,
                max_health: 5,
                tool: "axe".to_string(),
                tool_tier: 1,
                drops: Vec::new(),
                respawn_time: 300,
                color: "#2e7d32".to_string(),
                size: 32,
                depleted: false,
                depleted_at: 0,
            }],
            spawn_points: Vec::new(),
            fallback: false,
        }
    }

    #[test]
    fn test_generated_chunk_starts_dirty() {
        let chunk = Chunk::from_generated(generated(ChunkCoord::new(0, 0)));
        assert!(chunk.is_generated());
        assert!(chunk.is_modified());
        assert_eq!(chunk.tile(3, 4), Some(Tile::Lava));
        assert!(chunk.is_solid(3, 4));
        assert!(!chunk.is_solid(0, 0));
    }

    #[test]
    fn test_set_tile_keeps_solids_in_sync() {
        let mut chunk = Chunk::from_generated(generated(ChunkCoord::new(0, 0)));
        chunk.mark_saved();

        assert!(chunk.set_tile(3, 4, Tile::Path));
        assert!(!chunk.is_solid(3, 4));
        assert!(chunk.set_tile(5, 5, Tile::Wall));
        assert!(chunk.is_solid(5, 5));
        assert!(chunk.is_modified());
        for (tile, solid) in chunk.tiles().iter().zip(chunk.solids()) {
            assert_eq!(tile.is_solid(), *solid);
        }

        assert!(!chunk.set_tile(16, 0, Tile::Wall));
        assert_eq!(chunk.tile(16, 0), None);
        assert!(chunk.is_solid(0, 16), "outside the chunk is solid");
    }

    #[test]
    fn test_save_data_round_trip() {
        let mut chunk = Chunk::from_generated(generated(ChunkCoord::new(-7, 12)));
        chunk.add_structure(serde_json::json!({ "kind": "campfire", "x": 3, "y": 3 }));
        let data = chunk.to_save_data();
        assert_eq!(data.coord(), ChunkCoord::new(-7, 12));

        let loaded = Chunk::from_save_data(data).unwrap();
        assert!(!loaded.is_modified());
        assert_eq!(loaded.tiles(), chunk.tiles());
        assert_eq!(loaded.solids(), chunk.solids());
        assert_eq!(loaded.resources(), chunk.resources());
        assert_eq!(loaded.structures(), chunk.structures());
    }

    #[test]
    fn test_rejects_bad_save_data() {
        let chunk = Chunk::from_generated(generated(ChunkCoord::new(1, 1)));

        let mut short = chunk.to_save_data();
        short.tiles.pop();
        assert!(matches!(Chunk::from_save_data(short), Err(StoreError::InvalidData { .. })));

        let mut unknown = chunk.to_save_data();
        unknown.tiles[0] = 255;
        assert!(matches!(Chunk::from_save_data(unknown), Err(StoreError::InvalidData { .. })));
    }

    #[test]
    fn test_client_data_hides_timers() {
        let chunk = Chunk::from_generated(generated(ChunkCoord::new(2, 3)));
        let client = chunk.to_client_data();
        assert_eq!((client.chunk_x, client.chunk_y), (2, 3));
        assert_eq!(client.tiles.len(), TILES_PER_CHUNK);
        assert_eq!(client.tiles[tile_index(3, 4)], Tile::Lava.id());

        let json = serde_json::to_value(&client).unwrap();
        assert!(json.get("chunkX").is_some());
        let resource = &json["resources"][0];
        assert_eq!(resource["id"], "oak_tree");
        assert!(resource.get("health").is_none());
        assert!(resource.get("respawn_time").is_none());
    }

    #[test]
    fn test_deplete_and_respawn() {
        let mut chunk = Chunk::from_generated(generated(ChunkCoord::new(0, 0)));
        chunk.mark_saved();

        assert!(chunk.deplete_resource(0, 1_000));
        assert!(!chunk.deplete_resource(0, 1_001), "already depleted");
        assert!(!chunk.deplete_resource(9, 1_000));
        assert!(chunk.is_modified());
        assert_eq!(chunk.resources()[0].health, 0);

        chunk.mark_saved();
        assert_eq!(chunk.respawn_due(1_299), 0);
        assert!(!chunk.is_modified());
        assert_eq!(chunk.respawn_due(1_300), 1);
        assert!(chunk.is_modified());
        let node = &chunk.resources()[0];
        assert!(!node.depleted);
        assert_eq!(node.health, node.max_health);
    }

    #[test]
    fn test_world_to_local() {
        let chunk = Chunk::from_generated(generated(ChunkCoord::new(-1, 2)));
        assert_eq!(chunk.world_to_local(-512.0, 1024.0), Some((0, 0)));
        assert_eq!(chunk.world_to_local(-0.5, 1024.0 + 511.9), Some((15, 15)));
        assert_eq!(chunk.world_to_local(-480.0 + 1.0, 1024.0 + 33.0), Some((1, 1)));
        assert_eq!(chunk.world_to_local(0.0, 1024.0), None);
        assert_eq!(chunk.world_to_local(f64::NAN, 1024.0), None);
    }
}
