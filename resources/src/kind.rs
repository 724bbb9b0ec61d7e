//! Resource kinds and per-tile capacities

use aie_types::{ModuleType, TileClass};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of hardware resource the broker hands out
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    PerformanceCounter,
    StreamPortSelector,
    BroadcastChannel,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::PerformanceCounter,
        ResourceKind::StreamPortSelector,
        ResourceKind::BroadcastChannel,
    ];
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::PerformanceCounter => write!(f, "perf counter"),
            ResourceKind::StreamPortSelector => write!(f, "port selector"),
            ResourceKind::BroadcastChannel => write!(f, "broadcast channel"),
        }
    }
}

/// Number of instances of one kind in one module of one tile class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityEntry {
    pub class: TileClass,
    pub module: ModuleType,
    pub kind: ResourceKind,
    pub count: u8,
}

/// Per-tile capacity of every resource kind
///
/// A kind with no entry (or a zero entry) for a class/module pair does not
/// exist there. Capacities are a property of the broker and are never
/// exposed to controllers except through availability queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityTable {
    entries: Vec<CapacityEntry>,
}

impl CapacityTable {
    /// Creates an empty table (nothing can be reserved)
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder: sets the capacity for a class/module/kind triple
    pub fn with(mut self, class: TileClass, module: ModuleType, kind: ResourceKind, count: u8) -> Self {
        self.entries
            .retain(|e| !(e.class == class && e.module == module && e.kind == kind));
        self.entries.push(CapacityEntry {
            class,
            module,
            kind,
            count,
        });
        self
    }

    /// Looks up a capacity; zero if the kind does not exist there
    pub fn capacity(&self, class: TileClass, module: ModuleType, kind: ResourceKind) -> u8 {
        self.entries
            .iter()
            .find(|e| e.class == class && e.module == module && e.kind == kind)
            .map_or(0, |e| e.count)
    }

    pub fn entries(&self) -> &[CapacityEntry] {
        &self.entries
    }
}

impl Default for CapacityTable {
    fn default() -> Self {
        use ModuleType::{Core, Memory, Pl};
        use ResourceKind::*;
        use TileClass::{Aie, MemTile, Shim};

        Self::empty()
            .with(Shim, Pl, PerformanceCounter, 2)
            .with(Shim, Pl, StreamPortSelector, 8)
            .with(Shim, Pl, BroadcastChannel, 16)
            .with(MemTile, Memory, PerformanceCounter, 4)
            .with(MemTile, Memory, StreamPortSelector, 8)
            .with(MemTile, Memory, BroadcastChannel, 16)
            .with(Aie, Core, PerformanceCounter, 4)
            .with(Aie, Core, StreamPortSelector, 8)
            .with(Aie, Core, BroadcastChannel, 16)
            .with(Aie, Memory, PerformanceCounter, 2)
            .with(Aie, Memory, BroadcastChannel, 16)
    }
}
