//! # Darkheim World Server
//!
//! Headless host for the world core. Boots the world, pre-loads the chunks
//! around the town and waits for operator commands.
//!
//! ```bash
//! ./world_server                     # reads config/world.toml
//! ./world_server path/to/world.toml
//! ```
//!
//! Commands: `stats`, `save`, `quit`. End of input also quits.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Instant;

use darkheim_world::{WorldConfig, WorldManager};

const DEFAULT_CONFIG: &str = "config/world.toml";

fn main() {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("                  DARKHEIM WORLD SERVER v{}", env!("CARGO_PKG_VERSION"));
    println!("                         HEADLESS MODE");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    let config_path = std::env::args().nth(1).map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let config = if config_path.is_file() {
        match WorldConfig::load(&config_path) {
            Ok(config) => {
                println!("   ✓ Config: {}", config_path.display());
                config
            }
            Err(e) => {
                eprintln!("   ✗ FATAL: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("   ! No config at {}, using defaults", config_path.display());
        WorldConfig::default()
    };

    println!("   Seed:       {}", config.seed);
    println!("   Biomes:     {}", config.biome_dir.display());
    println!("   Saves:      {}", config.save_dir.display());
    println!();

    let boot = Instant::now();
    let world = match WorldManager::init(config) {
        Ok(world) => world,
        Err(e) => {
            eprintln!("   ✗ FATAL: {e}");
            std::process::exit(1);
        }
    };
    println!("   ✓ World ready in {:?}", boot.elapsed());

    // Spawn area: the town chunk and its view square.
    let index = world.generator().catalog().index();
    let (town_x, town_y) = (index.town_chunk_x, index.town_chunk_y);
    let spawn = Instant::now();
    let chunks = world.get_chunks_around(town_x, town_y);
    println!(
        "   ✓ Spawn area: {} chunks around [{},{}] in {:?} (view distance {})",
        chunks.len(),
        town_x,
        town_y,
        spawn.elapsed(),
        world.config().view_distance(),
    );
    drop(chunks);

    println!();
    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    WORLD ONLINE");
    println!("          Commands: stats | save | quit");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        match line.trim() {
            "" => {}
            "stats" => {
                let stats = world.stats();
                println!(
                    "   resident {} | generated {} | loaded {} | saved {} | evicted {}",
                    stats.resident, stats.generated, stats.loaded, stats.saved, stats.evicted
                );
            }
            "save" => println!("   ✓ Saved {} chunks", world.save_all()),
            "quit" | "exit" => break,
            other => println!("   ? Unknown command: {other}"),
        }
    }

    tracing::info!("Operator console closed, shutting down");
    println!("   Shutting down...");
    world.shutdown();
    println!("   ✓ World saved. Goodbye.");
}
