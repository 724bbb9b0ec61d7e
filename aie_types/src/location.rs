//! Tile coordinates and tile classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of one tile in the partition grid
///
/// Ordering is by column first, then row, so sorting a set of locations
/// walks the grid column by column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TileLocation {
    pub col: u8,
    pub row: u8,
}

impl TileLocation {
    /// Creates a tile location
    pub const fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }

    /// Returns every row-`row` location from `start` to `end` inclusive
    ///
    /// The range is normalized, so `columns(9, 6, 0)` and `columns(6, 9, 0)`
    /// yield the same four locations in ascending column order.
    pub fn columns(start: u8, end: u8, row: u8) -> Vec<TileLocation> {
        let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
        (lo..=hi).map(|col| TileLocation::new(col, row)).collect()
    }
}

impl fmt::Display for TileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.col, self.row)
    }
}

/// Class of a tile, derived from its row band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileClass {
    /// Boundary/interface row; only the PL module exists here
    Shim,
    /// Memory tile row
    MemTile,
    /// Compute tile
    Aie,
}

impl TileClass {
    /// Modules physically present on a tile of this class
    pub fn modules(&self) -> &'static [ModuleType] {
        match self {
            TileClass::Shim => &[ModuleType::Pl],
            TileClass::MemTile => &[ModuleType::Memory],
            TileClass::Aie => &[ModuleType::Core, ModuleType::Memory],
        }
    }

    /// Checks if the module exists on this tile class
    pub fn has_module(&self, module: ModuleType) -> bool {
        self.modules().contains(&module)
    }
}

impl fmt::Display for TileClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileClass::Shim => write!(f, "shim"),
            TileClass::MemTile => write!(f, "mem_tile"),
            TileClass::Aie => write!(f, "aie"),
        }
    }
}

/// Module context within a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    Core,
    Memory,
    /// Programmable-logic interface module of a shim tile
    Pl,
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleType::Core => write!(f, "core"),
            ModuleType::Memory => write!(f, "mem"),
            ModuleType::Pl => write!(f, "pl"),
        }
    }
}
