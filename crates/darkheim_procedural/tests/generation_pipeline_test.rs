//! # Generation Pipeline Tests
//!
//! Runs the full pipeline over the shipped biome data.

use std::path::PathBuf;

use darkheim_procedural::{BiomeCatalog, WorldGenerator, WorldSeed};
use darkheim_shared::{ChunkCoord, Tile, CHUNK_PIXEL_SIZE, TILES_PER_CHUNK};

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/biomes")
}

fn generator() -> WorldGenerator {
    let catalog = BiomeCatalog::load_dir(&data_dir()).expect("shipped biome data loads");
    WorldGenerator::new(WorldSeed::new(42), catalog).expect("shipped index is valid")
}

/// Test: every shipped biome loads.
#[test]
fn test_shipped_biomes_load() {
    let catalog = BiomeCatalog::load_dir(&data_dir()).unwrap();
    assert_eq!(catalog.loaded_count(), catalog.index().biomes.len());
    for id in ["meadow", "dark_forest", "swamp", "mountain", "volcanic"] {
        assert!(catalog.get(id).is_some(), "{id} should load");
    }
}

/// Test: chunks across every biome are well formed.
#[test]
fn test_chunks_are_well_formed() {
    let gen = generator();
    for cx in (-20..190).step_by(7) {
        for cy in [-30, -3, 0, 11, 35] {
            let coord = ChunkCoord::new(cx, cy);
            let chunk = gen.generate_chunk(coord);
            assert!(!chunk.fallback, "{coord} fell back");
            assert_eq!(chunk.tiles.len(), TILES_PER_CHUNK);
            assert_eq!(chunk.solids.len(), TILES_PER_CHUNK);
            for (tile, solid) in chunk.tiles.iter().zip(&chunk.solids) {
                assert_eq!(tile.is_solid(), *solid, "{coord}: {tile:?}");
            }

            let x0 = coord.world_x() as f64;
            let y0 = coord.world_y() as f64;
            let size = f64::from(CHUNK_PIXEL_SIZE);
            for node in &chunk.resources {
                assert!(node.x >= x0 && node.x < x0 + size && node.y >= y0 && node.y < y0 + size);
                assert_eq!(node.health, node.max_health);
            }
            for point in &chunk.spawn_points {
                assert!(point.x >= x0 && point.x < x0 + size);
                assert_eq!(point.enemy_id, point.config.id);
            }
        }
    }
}

/// Test: same seed, same world; different seed, different world.
#[test]
fn test_seed_determinism() {
    let a = generator();
    let b = generator();
    let catalog = BiomeCatalog::load_dir(&data_dir()).unwrap();
    let other = WorldGenerator::new(WorldSeed::new(43), catalog).unwrap();

    let mut differs = false;
    for cx in [-12, 25, 60, 95, 130, 170] {
        let coord = ChunkCoord::new(cx, 9);
        let first = a.generate_chunk(coord);
        assert_eq!(first, b.generate_chunk(coord), "{coord}");
        differs |= first.tiles != other.generate_chunk(coord).tiles;
    }
    assert!(differs, "seed should change terrain somewhere");
}

/// Test: the town is safe and stamped.
#[test]
fn test_town_is_safe() {
    let gen = generator();
    for cy in -5..=5 {
        for cx in -5..=5 {
            if !gen.is_in_town(cx, cy) {
                continue;
            }
            let chunk = gen.generate_chunk(ChunkCoord::new(cx, cy));
            assert!(chunk.resources.is_empty(), "resources in town chunk [{cx},{cy}]");
            assert!(chunk.spawn_points.is_empty(), "enemies in town chunk [{cx},{cy}]");
            assert!(!chunk.tiles.iter().any(|t| t.is_cave()), "cave in town chunk [{cx},{cy}]");
        }
    }
    let center = gen.generate_chunk(ChunkCoord::new(0, 0));
    assert!(center.tiles.contains(&Tile::Path));
}

/// Test: cave-only entries sit on cave floors, others never do.
#[test]
fn test_cave_only_placement() {
    let gen = generator();
    for cx in 40..150 {
        let coord = ChunkCoord::new(cx, 13);
        let chunk = gen.generate_chunk(coord);
        let biome = gen.catalog().get(&chunk.biome_id).unwrap();
        for node in &chunk.resources {
            let cave_only = biome.resources.iter().find(|r| r.id == node.id).unwrap().cave_only;
            let lx = ((node.x as i64 - coord.world_x()) / 32) as usize;
            let ly = ((node.y as i64 - coord.world_y()) / 32) as usize;
            let tile = chunk.tiles[ly * 16 + lx];
            assert_eq!(tile.is_cave_floor(), cave_only, "{} on {tile:?}", node.id);
        }
    }
}

/// Test: a biome carved end to end places its cave-only entries on cave floor.
#[test]
fn test_cave_biome_places_cave_entries() {
    let dir = std::env::temp_dir().join(format!("darkheim_caves_{}", std::process::id()));
    let biome = dir.join("grotto");
    std::fs::create_dir_all(&biome).unwrap();
    std::fs::write(
        dir.join("index.toml"),
        "[[biomes]]\nid = \"grotto\"\nstart_chunk_x = 0\nstart_chunk_y = 0\nend_chunk_x = 10\nend_chunk_y = 10\n\n[rivers]\nsources = []\n",
    )
    .unwrap();
    std::fs::write(
        biome.join("biome.toml"),
        "[cave]\nthreshold = 1.5\nmin_elevation = -1.0\nmax_elevation = 2.0\nmoss_chance = 0.0\ncrystal_chance = 0.0\n",
    )
    .unwrap();
    std::fs::write(biome.join("tiles.toml"), "base_tile = \"GRASS\"\n").unwrap();
    std::fs::write(
        biome.join("resources.toml"),
        r#"
            [[resources]]
            id = "glow_ore"
            density_at_left = 1.0
            density_at_right = 1.0
            health = 10
            respawn_time = 600
            cave_only = true

            [[resources]]
            id = "shrub"
            density_at_left = 1.0
            density_at_right = 1.0
            health = 2
            respawn_time = 60
        "#,
    )
    .unwrap();
    std::fs::write(
        biome.join("enemies.toml"),
        "[[enemies]]\nid = \"cave_bat\"\ndensity_at_left = 1.0\ndensity_at_right = 1.0\ncave_only = true\n",
    )
    .unwrap();

    let catalog = BiomeCatalog::load_dir(&dir).unwrap();
    assert_eq!(catalog.loaded_count(), 1);
    let gen = WorldGenerator::new(WorldSeed::new(42), catalog).unwrap();
    let chunk = gen.generate_chunk(ChunkCoord::new(8, 8));

    assert!(!chunk.fallback);
    assert!(chunk.tiles.iter().all(|t| *t == Tile::CaveFloor));
    assert_eq!(chunk.resources.len(), 64, "every candidate takes the cave ore");
    assert!(chunk.resources.iter().all(|r| r.id == "glow_ore"));
    assert_eq!(chunk.spawn_points.len(), 16);

    std::fs::remove_dir_all(&dir).ok();
}

/// Test: the river network crosses the world.
#[test]
fn test_river_network_exists() {
    let gen = generator();
    assert!(gen.rivers().chunk_count() > 100, "four rivers should touch many chunks");
}

/// Test: a biome with broken data degrades to flat terrain.
#[test]
fn test_broken_biome_falls_back() {
    let dir = std::env::temp_dir().join(format!("darkheim_broken_{}", std::process::id()));
    let biome = dir.join("meadow");
    std::fs::create_dir_all(&biome).unwrap();
    std::fs::write(
        dir.join("index.toml"),
        "[[biomes]]\nid = \"meadow\"\nstart_chunk_x = 0\nstart_chunk_y = 0\nend_chunk_x = 10\nend_chunk_y = 10\n",
    )
    .unwrap();
    std::fs::write(biome.join("biome.toml"), "").unwrap();
    std::fs::write(
        biome.join("tiles.toml"),
        "base_tile = \"GRASS\"\n[[rules]]\ncondition = \"height >> 3\"\ntile = \"WATER\"\n",
    )
    .unwrap();
    std::fs::write(biome.join("resources.toml"), "").unwrap();
    std::fs::write(biome.join("enemies.toml"), "").unwrap();

    let catalog = BiomeCatalog::load_dir(&dir).unwrap();
    assert_eq!(catalog.loaded_count(), 0);
    let gen = WorldGenerator::new(WorldSeed::new(42), catalog).unwrap();
    let chunk = gen.generate_chunk(ChunkCoord::new(8, 8));
    assert!(chunk.fallback);
    assert!(chunk.tiles.iter().all(|t| *t == Tile::Grass));

    std::fs::remove_dir_all(&dir).ok();
}
