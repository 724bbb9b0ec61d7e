//! Partition topology
//!
//! The topology names the grid dimensions and the row bands that decide each
//! tile's class. It is loaded from configuration (JSON) and defaults to the
//! 50x9 reference partition: one shim row at row 0, no memory tiles and eight
//! compute rows.

use crate::location::{TileClass, TileLocation};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionTopology {
    pub num_cols: u8,
    pub num_rows: u8,
    pub shim_row: u8,
    pub mem_tile_row_start: u8,
    pub mem_tile_num_rows: u8,
    pub aie_tile_row_start: u8,
    pub aie_tile_num_rows: u8,
}

impl Default for PartitionTopology {
    fn default() -> Self {
        Self {
            num_cols: 50,
            num_rows: 9,
            shim_row: 0,
            mem_tile_row_start: 0,
            mem_tile_num_rows: 0,
            aie_tile_row_start: 1,
            aie_tile_num_rows: 8,
        }
    }
}

impl PartitionTopology {
    /// Parses and validates a topology from JSON
    pub fn from_json(json: &str) -> Result<Self, TopologyError> {
        let topology: PartitionTopology = serde_json::from_str(json)?;
        topology.validate()?;
        Ok(topology)
    }

    /// Reads, parses and validates a topology file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TopologyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Checks that the row bands fit the grid and do not overlap
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.num_cols == 0 || self.num_rows == 0 {
            return Err(TopologyError::invalid("grid has no tiles"));
        }
        if self.shim_row >= self.num_rows {
            return Err(TopologyError::invalid("shim row outside grid"));
        }

        let bands = [
            (self.mem_tile_row_start, self.mem_tile_num_rows, "mem tile"),
            (self.aie_tile_row_start, self.aie_tile_num_rows, "aie tile"),
        ];
        for (start, len, name) in bands {
            if len == 0 {
                continue;
            }
            let end = u16::from(start) + u16::from(len);
            if end > u16::from(self.num_rows) {
                return Err(TopologyError::invalid(format!("{} rows outside grid", name)));
            }
            if (start..start + len).contains(&self.shim_row) {
                return Err(TopologyError::invalid(format!(
                    "{} rows overlap the shim row",
                    name
                )));
            }
        }

        if self.mem_tile_num_rows > 0 && self.aie_tile_num_rows > 0 {
            let mem = self.mem_tile_row_start..self.mem_tile_row_start + self.mem_tile_num_rows;
            let aie = self.aie_tile_row_start..self.aie_tile_row_start + self.aie_tile_num_rows;
            if mem.start < aie.end && aie.start < mem.end {
                return Err(TopologyError::invalid("mem tile rows overlap aie tile rows"));
            }
        }

        Ok(())
    }

    /// Checks if the location lies inside the grid
    pub fn contains(&self, loc: TileLocation) -> bool {
        loc.col < self.num_cols && loc.row < self.num_rows
    }

    /// Checks if the location is a boundary (shim) tile
    pub fn is_boundary(&self, loc: TileLocation) -> bool {
        self.contains(loc) && loc.row == self.shim_row
    }

    /// Classifies a location by its row band
    pub fn class_of(&self, loc: TileLocation) -> Result<TileClass, TopologyError> {
        if !self.contains(loc) {
            return Err(TopologyError::OutOfGrid {
                loc,
                num_cols: self.num_cols,
                num_rows: self.num_rows,
            });
        }

        let in_band = |start: u8, len: u8| loc.row >= start && loc.row < start.saturating_add(len);
        if loc.row == self.shim_row {
            Ok(TileClass::Shim)
        } else if in_band(self.mem_tile_row_start, self.mem_tile_num_rows) {
            Ok(TileClass::MemTile)
        } else if in_band(self.aie_tile_row_start, self.aie_tile_num_rows) {
            Ok(TileClass::Aie)
        } else {
            Err(TopologyError::UnassignedRow { loc })
        }
    }

    /// Iterates every tile of the grid in column-major order
    pub fn tiles(&self) -> impl Iterator<Item = TileLocation> + '_ {
        (0..self.num_cols)
            .flat_map(move |col| (0..self.num_rows).map(move |row| TileLocation::new(col, row)))
    }
}

/// Topology errors
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Tile {loc} outside the {num_cols}x{num_rows} grid")]
    OutOfGrid {
        loc: TileLocation,
        num_cols: u8,
        num_rows: u8,
    },

    #[error("Tile {loc} is not in any configured row band")]
    UnassignedRow { loc: TileLocation },

    #[error("Invalid topology: {reason}")]
    InvalidTopology { reason: String },

    #[error("Failed to parse topology: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl TopologyError {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidTopology {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_topology_is_valid() {
        let topology = PartitionTopology::default();
        assert!(topology.validate().is_ok());
        assert_eq!(topology.tiles().count(), 50 * 9);
    }

    #[test]
    fn test_class_of_rows() {
        let topology = PartitionTopology::default();
        assert_eq!(topology.class_of(TileLocation::new(6, 0)).unwrap(), TileClass::Shim);
        assert_eq!(topology.class_of(TileLocation::new(6, 3)).unwrap(), TileClass::Aie);
        assert_eq!(topology.class_of(TileLocation::new(49, 8)).unwrap(), TileClass::Aie);
    }

    #[test]
    fn test_class_of_out_of_grid() {
        let topology = PartitionTopology::default();
        assert!(matches!(
            topology.class_of(TileLocation::new(50, 0)),
            Err(TopologyError::OutOfGrid { .. })
        ));
        assert!(matches!(
            topology.class_of(TileLocation::new(0, 9)),
            Err(TopologyError::OutOfGrid { .. })
        ));
    }

    #[test]
    fn test_is_boundary() {
        let topology = PartitionTopology::default();
        assert!(topology.is_boundary(TileLocation::new(9, 0)));
        assert!(!topology.is_boundary(TileLocation::new(9, 3)));
        assert!(!topology.is_boundary(TileLocation::new(60, 0)));
    }

    #[test]
    fn test_mem_tile_band() {
        let topology = PartitionTopology {
            num_cols: 4,
            num_rows: 6,
            shim_row: 0,
            mem_tile_row_start: 1,
            mem_tile_num_rows: 1,
            aie_tile_row_start: 2,
            aie_tile_num_rows: 4,
        };
        assert!(topology.validate().is_ok());
        assert_eq!(topology.class_of(TileLocation::new(0, 1)).unwrap(), TileClass::MemTile);
        assert_eq!(topology.class_of(TileLocation::new(0, 2)).unwrap(), TileClass::Aie);
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let topology = PartitionTopology {
            mem_tile_row_start: 1,
            mem_tile_num_rows: 2,
            ..PartitionTopology::default()
        };
        assert!(matches!(
            topology.validate(),
            Err(TopologyError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_band_past_grid() {
        let topology = PartitionTopology {
            aie_tile_num_rows: 9,
            ..PartitionTopology::default()
        };
        assert!(topology.validate().is_err());
    }

    #[test]
    fn test_from_json_partial_uses_defaults() {
        let topology = PartitionTopology::from_json(r#"{ "num_cols": 10 }"#).unwrap();
        assert_eq!(topology.num_cols, 10);
        assert_eq!(topology.num_rows, 9);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            PartitionTopology::from_json("not json"),
            Err(TopologyError::Parse(_))
        ));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "num_cols": 12, "num_rows": 5, "aie_tile_num_rows": 4 }}"#).unwrap();

        let topology = PartitionTopology::from_path(file.path()).unwrap();
        assert_eq!(topology.num_cols, 12);
        assert_eq!(topology.num_rows, 5);
    }
}
