//! # Tile Catalogue
//!
//! Every tile type in the world, grouped by the biome or feature that
//! produces it. The numeric id is the wire and save format.
//!
//! Membership sets (solid, water, cave, town) live here so generation,
//! placement and collision all answer the same question the same way.

use serde::{Deserialize, Serialize};

/// Tile types in the world.
///
/// Config documents name tiles in `SCREAMING_SNAKE_CASE` (`"DEEP_WATER"`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Tile {
    // Common
    /// Plain grass.
    #[default]
    Grass = 0,
    /// Bare dirt.
    Dirt = 1,
    /// Sand (beaches and river banks).
    Sand = 2,
    /// Exposed stone.
    Stone = 3,
    /// Shallow water.
    Water = 4,
    /// Deep water.
    DeepWater = 5,
    /// Trodden path / road.
    Path = 6,

    // Meadow
    /// Grass with flowers.
    FlowerGrass = 10,
    /// Tilled farmland.
    Farmland = 11,

    // Dark forest
    /// Dark forest floor.
    DarkGrass = 20,
    /// Mushroom patch.
    Mushroom = 21,
    /// Dense undergrowth.
    DenseBush = 22,

    // Swamp
    /// Mud.
    Mud = 30,
    /// Bog.
    Bog = 31,
    /// Marsh water.
    MarshWater = 32,

    // Mountain
    /// Snow.
    Snow = 40,
    /// Ice sheet.
    Ice = 41,
    /// Loose gravel.
    Gravel = 42,
    /// Impassable cliff face.
    Cliff = 43,

    // Volcanic
    /// Ash field.
    Ash = 50,
    /// Molten lava.
    Lava = 51,
    /// Obsidian.
    Obsidian = 52,
    /// Charred stone.
    CharredStone = 53,

    // Town
    /// Town or building wall.
    Wall = 60,
    /// Wooden floor.
    FloorWood = 61,
    /// Stone floor.
    FloorStone = 62,
    /// Building door.
    Door = 63,
    /// Market ground.
    MarketStall = 64,

    // Caves
    /// Cave floor.
    CaveFloor = 70,
    /// Cave wall.
    CaveWall = 71,
    /// Walkable cave mouth.
    CaveEntrance = 72,
    /// Mossy cave floor.
    CaveMoss = 73,
    /// Crystal cave floor.
    CaveCrystal = 74,
}

impl Tile {
    /// Every tile, in id order.
    pub const ALL: [Self; 33] = [
        Self::Grass,
        Self::Dirt,
        Self::Sand,
        Self::Stone,
        Self::Water,
        Self::DeepWater,
        Self::Path,
        Self::FlowerGrass,
        Self::Farmland,
        Self::DarkGrass,
        Self::Mushroom,
        Self::DenseBush,
        Self::Mud,
        Self::Bog,
        Self::MarshWater,
        Self::Snow,
        Self::Ice,
        Self::Gravel,
        Self::Cliff,
        Self::Ash,
        Self::Lava,
        Self::Obsidian,
        Self::CharredStone,
        Self::Wall,
        Self::FloorWood,
        Self::FloorStone,
        Self::Door,
        Self::MarketStall,
        Self::CaveFloor,
        Self::CaveWall,
        Self::CaveEntrance,
        Self::CaveMoss,
        Self::CaveCrystal,
    ];

    /// Returns the numeric tile id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Converts from a numeric tile id.
    ///
    /// Returns `None` for ids that name no tile.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0 => Self::Grass,
            1 => Self::Dirt,
            2 => Self::Sand,
            3 => Self::Stone,
            4 => Self::Water,
            5 => Self::DeepWater,
            6 => Self::Path,
            10 => Self::FlowerGrass,
            11 => Self::Farmland,
            20 => Self::DarkGrass,
            21 => Self::Mushroom,
            22 => Self::DenseBush,
            30 => Self::Mud,
            31 => Self::Bog,
            32 => Self::MarshWater,
            40 => Self::Snow,
            41 => Self::Ice,
            42 => Self::Gravel,
            43 => Self::Cliff,
            50 => Self::Ash,
            51 => Self::Lava,
            52 => Self::Obsidian,
            53 => Self::CharredStone,
            60 => Self::Wall,
            61 => Self::FloorWood,
            62 => Self::FloorStone,
            63 => Self::Door,
            64 => Self::MarketStall,
            70 => Self::CaveFloor,
            71 => Self::CaveWall,
            72 => Self::CaveEntrance,
            73 => Self::CaveMoss,
            74 => Self::CaveCrystal,
            _ => return None,
        })
    }

    /// Returns true if this tile blocks movement.
    #[inline]
    #[must_use]
    pub const fn is_solid(self) -> bool {
        matches!(self, Self::Lava | Self::Cliff | Self::Wall | Self::CaveWall)
    }

    /// Returns true if nothing may be placed on this tile because it is
    /// liquid or frozen over.
    #[inline]
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(
            self,
            Self::Water | Self::DeepWater | Self::MarshWater | Self::Lava | Self::Ice
        )
    }

    /// Returns true for the walkable cave floor variants.
    #[inline]
    #[must_use]
    pub const fn is_cave_floor(self) -> bool {
        matches!(self, Self::CaveFloor | Self::CaveMoss | Self::CaveCrystal)
    }

    /// Returns true for any tile the cave carver produces.
    #[inline]
    #[must_use]
    pub const fn is_cave(self) -> bool {
        matches!(
            self,
            Self::CaveFloor | Self::CaveWall | Self::CaveEntrance | Self::CaveMoss | Self::CaveCrystal
        )
    }

    /// Returns true for any tile the town overlay produces.
    #[inline]
    #[must_use]
    pub const fn is_town(self) -> bool {
        matches!(
            self,
            Self::Wall | Self::Path | Self::FloorWood | Self::FloorStone | Self::Door | Self::MarketStall
        )
    }

    /// Returns true if the water overlay must leave this tile alone.
    #[inline]
    #[must_use]
    pub const fn is_overlay_protected(self) -> bool {
        self.is_cave() || self.is_town()
    }

    /// Conflict priority inside the water overlay (higher wins).
    ///
    /// Lava > deep water > water > marsh water > bog > ice > sand.
    /// Tiles the overlay never writes have no priority.
    #[must_use]
    pub const fn overlay_priority(self) -> Option<u8> {
        match self {
            Self::Lava => Some(7),
            Self::DeepWater => Some(6),
            Self::Water => Some(5),
            Self::MarshWater => Some(4),
            Self::Bog => Some(3),
            Self::Ice => Some(2),
            Self::Sand => Some(1),
            _ => None,
        }
    }
}
