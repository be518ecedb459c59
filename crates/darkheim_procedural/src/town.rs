//! # Town Overlay
//!
//! The hand-authored town stamped around the center of the town chunk:
//! a circular wall with four gates, two main roads crossing at the center,
//! secondary lanes, buildings, a stone plaza, a market ground and a
//! training yard.
//!
//! Positions below are tile offsets from the town center, measured from the
//! tile center of each world tile. Tiles outside the wall are never touched.

use darkheim_shared::coord::tile_index;
use darkheim_shared::{
    ChunkCoord, Tile, CHUNK_PIXEL_SIZE, CHUNK_SIZE, TILE_SIZE, TOWN_GATE_WIDTH, TOWN_WALL_RADIUS,
};

use crate::terrain::{tile_center_f64, TileGrid};

// =============================================================================
// LAYOUT
// =============================================================================

/// Wall thickness in world pixels (two tiles).
pub const WALL_THICKNESS: f64 = TILE_SIZE as f64 * 2.0;

/// Main roads extend this far either side of the center lines, in pixels.
const MAIN_ROAD_HALF_WIDTH: f64 = TILE_SIZE as f64 * 1.5;

/// Plaza half-size, in tiles.
const PLAZA_RADIUS: i64 = 5;

/// Wall side carrying a building's door.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DoorSide {
    North,
    South,
    East,
    West,
}

#[derive(Clone, Copy, Debug)]
struct Building {
    x: i64,
    y: i64,
    w: i64,
    h: i64,
    floor: Tile,
    door: DoorSide,
}

const fn building(x: i64, y: i64, w: i64, h: i64, floor: Tile, door: DoorSide) -> Building {
    Building { x, y, w, h, floor, door }
}

const BUILDINGS: [Building; 13] = [
    // Market square (NE)
    building(8, -20, 5, 4, Tile::FloorWood, DoorSide::South),
    building(16, -20, 5, 4, Tile::FloorWood, DoorSide::South),
    building(8, -12, 5, 4, Tile::FloorWood, DoorSide::North),
    building(16, -12, 5, 4, Tile::FloorWood, DoorSide::North),
    // Craft quarter (SW): forge, workshop, furnace house
    building(-22, 8, 6, 5, Tile::FloorStone, DoorSide::East),
    building(-13, 8, 5, 4, Tile::FloorWood, DoorSide::East),
    building(-22, 16, 5, 5, Tile::FloorStone, DoorSide::East),
    // Guard post (NW)
    building(-24, -20, 7, 6, Tile::FloorStone, DoorSide::South),
    // Residential (SE), the last one is the inn
    building(8, 8, 4, 4, Tile::FloorWood, DoorSide::West),
    building(15, 8, 4, 4, Tile::FloorWood, DoorSide::West),
    building(8, 15, 4, 4, Tile::FloorWood, DoorSide::West),
    building(15, 15, 4, 4, Tile::FloorWood, DoorSide::West),
    building(8, 22, 7, 6, Tile::FloorWood, DoorSide::West),
];

/// One-tile-wide lane: `Horizontal(row, from, to)` / `Vertical(col, from, to)`.
#[derive(Clone, Copy, Debug)]
enum Lane {
    Horizontal(i64, i64, i64),
    Vertical(i64, i64, i64),
}

const LANES: [Lane; 8] = [
    // District connectors
    Lane::Horizontal(-6, -26, 24),
    Lane::Horizontal(6, -26, 24),
    Lane::Vertical(-6, -24, 28),
    Lane::Vertical(6, -24, 28),
    // Between market stall columns
    Lane::Vertical(14, -22, -10),
    // Between forge row and furnace house
    Lane::Horizontal(14, -24, -8),
    // Between house columns and rows
    Lane::Vertical(13, 8, 28),
    Lane::Horizontal(13, 6, 20),
];

/// `(x, y, w, h)` in tiles.
const MARKET_ZONE: (i64, i64, i64, i64) = (6, -24, 20, 18);
const TRAINING_YARD: (i64, i64, i64, i64) = (-24, -11, 10, 5);

#[inline]
const fn in_rect(x: i64, y: i64, rect: (i64, i64, i64, i64)) -> bool {
    x >= rect.0 && x < rect.0 + rect.2 && y >= rect.1 && y < rect.1 + rect.3
}

// =============================================================================
// OVERLAY
// =============================================================================

/// Stamps the town onto chunks near the town center.
#[derive(Clone, Copy, Debug)]
pub struct TownOverlay {
    center_x: f64,
    center_y: f64,
    wall_radius: f64,
    gate_half_width: f64,
}

impl TownOverlay {
    /// Town centered on the middle of chunk `(town_chunk_x, town_chunk_y)`.
    #[must_use]
    pub fn new(town_chunk_x: i32, town_chunk_y: i32) -> Self {
        let half = f64::from(CHUNK_PIXEL_SIZE) / 2.0;
        Self {
            center_x: f64::from(town_chunk_x) * f64::from(CHUNK_PIXEL_SIZE) + half,
            center_y: f64::from(town_chunk_y) * f64::from(CHUNK_PIXEL_SIZE) + half,
            wall_radius: TOWN_WALL_RADIUS,
            gate_half_width: TOWN_GATE_WIDTH / 2.0,
        }
    }

    /// Town center in world pixels.
    #[inline]
    #[must_use]
    pub const fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    /// Wall outer radius in world pixels.
    #[inline]
    #[must_use]
    pub const fn wall_radius(&self) -> f64 {
        self.wall_radius
    }

    /// Returns true if any corner of the chunk lies within
    /// `wall_radius + WALL_THICKNESS` of the center.
    ///
    /// If the wall circle reaches into a chunk without covering a corner,
    /// it crosses an edge whose nearer endpoint is at most
    /// `sqrt(R² + 256²)` (about 2414 px) from the center. That is inside
    /// the limit, so no chunk holding a town tile is ever missed.
    #[must_use]
    pub fn chunk_needs_overlay(&self, coord: ChunkCoord) -> bool {
        let x0 = coord.world_x() as f64;
        let y0 = coord.world_y() as f64;
        let size = f64::from(CHUNK_PIXEL_SIZE);
        let limit = self.wall_radius + WALL_THICKNESS;

        [(x0, y0), (x0 + size, y0), (x0, y0 + size), (x0 + size, y0 + size)]
            .iter()
            .map(|&(x, y)| (x - self.center_x).hypot(y - self.center_y))
            .fold(f64::INFINITY, f64::min)
            <= limit
    }

    /// Town tile for a world pixel position, or `None` to keep what is there.
    #[must_use]
    pub fn tile_at(&self, world_x: f64, world_y: f64) -> Option<Tile> {
        let dx = world_x - self.center_x;
        let dy = world_y - self.center_y;
        let dist = dx.hypot(dy);

        if dist > self.wall_radius {
            return None;
        }
        if dist >= self.wall_radius - WALL_THICKNESS {
            return Some(if self.is_gate(dx, dy) { Tile::Path } else { Tile::Wall });
        }

        let tx = (dx / f64::from(TILE_SIZE)).floor() as i64;
        let ty = (dy / f64::from(TILE_SIZE)).floor() as i64;

        if let Some(tile) = building_tile(tx, ty) {
            return Some(tile);
        }
        if dx.abs() <= MAIN_ROAD_HALF_WIDTH || dy.abs() <= MAIN_ROAD_HALF_WIDTH {
            return Some(Tile::Path);
        }
        if on_lane(tx, ty) {
            return Some(Tile::Path);
        }
        if tx.abs() <= PLAZA_RADIUS && ty.abs() <= PLAZA_RADIUS {
            return Some(Tile::FloorStone);
        }
        if in_rect(tx, ty, MARKET_ZONE) {
            return Some(Tile::MarketStall);
        }
        if in_rect(tx, ty, TRAINING_YARD) {
            return Some(Tile::FloorStone);
        }
        None
    }

    /// Stamps the town onto a chunk's grid.
    pub fn apply(&self, coord: ChunkCoord, grid: &mut TileGrid) {
        for ly in 0..CHUNK_SIZE {
            for lx in 0..CHUNK_SIZE {
                let (wx, wy) = tile_center_f64(coord, lx, ly);
                if let Some(tile) = self.tile_at(wx, wy) {
                    grid.set(tile_index(lx, ly), tile);
                }
            }
        }
    }

    /// Gates are four axis-aligned openings through the wall.
    fn is_gate(&self, dx: f64, dy: f64) -> bool {
        (dy != 0.0 && dx.abs() <= self.gate_half_width) || (dx != 0.0 && dy.abs() <= self.gate_half_width)
    }
}

fn building_tile(tx: i64, ty: i64) -> Option<Tile> {
    let b = BUILDINGS.iter().find(|b| in_rect(tx, ty, (b.x, b.y, b.w, b.h)))?;
    let rx = tx - b.x;
    let ry = ty - b.y;
    let door = match b.door {
        DoorSide::North => ry == 0 && rx == b.w / 2,
        DoorSide::South => ry == b.h - 1 && rx == b.w / 2,
        DoorSide::East => rx == b.w - 1 && ry == b.h / 2,
        DoorSide::West => rx == 0 && ry == b.h / 2,
    };
    Some(if door {
        Tile::Door
    } else if rx == 0 || ry == 0 || rx == b.w - 1 || ry == b.h - 1 {
        Tile::Wall
    } else {
        b.floor
    })
}

fn on_lane(tx: i64, ty: i64) -> bool {
    LANES.iter().any(|lane| match *lane {
        Lane::Horizontal(row, from, to) => ty == row && (from..=to).contains(&tx),
        Lane::Vertical(col, from, to) => tx == col && (from..=to).contains(&ty),
    })
}
