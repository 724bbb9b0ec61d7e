//! Stream switch port specifications
//!
//! A port selector taps one stream switch port. Which ports exist depends on
//! the tile class and the direction of the port, so a [`PortSpec`] is
//! validated against the tile it will be observed on.

use crate::location::TileClass;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Direction of a stream switch port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamInterface {
    /// Output side of the switch
    Master,
    /// Input side of the switch
    Slave,
}

impl fmt::Display for StreamInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamInterface::Master => write!(f, "master"),
            StreamInterface::Slave => write!(f, "slave"),
        }
    }
}

/// Switch port category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamPortType {
    Core,
    Dma,
    Ctrl,
    Fifo,
    South,
    West,
    North,
    East,
    Trace,
}

impl StreamPortType {
    /// Number of ports of this category on a tile class and interface
    ///
    /// Zero means the category does not exist there.
    pub fn port_count(&self, class: TileClass, interface: StreamInterface) -> u8 {
        use StreamInterface::{Master, Slave};
        use StreamPortType::*;

        match (class, self, interface) {
            (TileClass::Shim, South, Slave) => 8,
            (TileClass::Shim, South, Master) => 6,
            (TileClass::Shim, North, Slave) => 4,
            (TileClass::Shim, North, Master) => 6,
            (TileClass::Shim, East | West, _) => 4,
            (TileClass::Shim, Ctrl, _) => 1,
            (TileClass::Shim, Fifo, _) => 2,
            (TileClass::Shim, Trace, Slave) => 1,
            (TileClass::Shim, Core | Dma | Trace, _) => 0,

            (TileClass::MemTile, Dma, Slave) => 6,
            (TileClass::MemTile, Dma, Master) => 6,
            (TileClass::MemTile, South, Slave) => 6,
            (TileClass::MemTile, South, Master) => 4,
            (TileClass::MemTile, North, Slave) => 4,
            (TileClass::MemTile, North, Master) => 6,
            (TileClass::MemTile, Ctrl, _) => 1,
            (TileClass::MemTile, Trace, Slave) => 1,
            (TileClass::MemTile, Core | Fifo | East | West | Trace, _) => 0,

            (TileClass::Aie, Core, _) => 1,
            (TileClass::Aie, Dma, _) => 2,
            (TileClass::Aie, Ctrl, _) => 1,
            (TileClass::Aie, Fifo, _) => 2,
            (TileClass::Aie, South, Slave) => 6,
            (TileClass::Aie, South, Master) => 4,
            (TileClass::Aie, North, Slave) => 4,
            (TileClass::Aie, North, Master) => 6,
            (TileClass::Aie, East | West, _) => 4,
            (TileClass::Aie, Trace, Slave) => 2,
            (TileClass::Aie, Trace, Master) => 0,
        }
    }
}

impl fmt::Display for StreamPortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamPortType::Core => "core",
            StreamPortType::Dma => "dma",
            StreamPortType::Ctrl => "ctrl",
            StreamPortType::Fifo => "fifo",
            StreamPortType::South => "south",
            StreamPortType::West => "west",
            StreamPortType::North => "north",
            StreamPortType::East => "east",
            StreamPortType::Trace => "trace",
        };
        write!(f, "{}", name)
    }
}

/// One stream switch port: direction, category and index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortSpec {
    pub interface: StreamInterface,
    pub port_type: StreamPortType,
    pub number: u8,
}

impl PortSpec {
    pub fn new(interface: StreamInterface, port_type: StreamPortType, number: u8) -> Self {
        Self {
            interface,
            port_type,
            number,
        }
    }

    pub fn master(port_type: StreamPortType, number: u8) -> Self {
        Self::new(StreamInterface::Master, port_type, number)
    }

    pub fn slave(port_type: StreamPortType, number: u8) -> Self {
        Self::new(StreamInterface::Slave, port_type, number)
    }

    /// Checks that this port exists on a tile of the given class
    pub fn validate_for(&self, class: TileClass) -> Result<(), PortSpecError> {
        let count = self.port_type.port_count(class, self.interface);
        if count == 0 {
            return Err(PortSpecError::NoSuchPortType {
                spec: *self,
                class,
            });
        }
        if self.number >= count {
            return Err(PortSpecError::PortNumberOutOfRange {
                spec: *self,
                class,
                count,
            });
        }
        Ok(())
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.interface, self.port_type, self.number)
    }
}

/// Port specification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortSpecError {
    #[error("No {} {} ports on {class} tiles", .spec.interface, .spec.port_type)]
    NoSuchPortType { spec: PortSpec, class: TileClass },

    #[error("Port {spec} out of range on {class} tiles (have {count})")]
    PortNumberOutOfRange {
        spec: PortSpec,
        class: TileClass,
        count: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shim_south_ports_valid() {
        assert!(PortSpec::slave(StreamPortType::South, 0)
            .validate_for(TileClass::Shim)
            .is_ok());
        assert!(PortSpec::master(StreamPortType::South, 5)
            .validate_for(TileClass::Shim)
            .is_ok());
    }

    #[test]
    fn test_port_number_out_of_range() {
        let spec = PortSpec::master(StreamPortType::South, 6);
        assert_eq!(
            spec.validate_for(TileClass::Shim),
            Err(PortSpecError::PortNumberOutOfRange {
                spec,
                class: TileClass::Shim,
                count: 6,
            })
        );
    }

    #[test]
    fn test_shim_has_no_core_port() {
        let spec = PortSpec::slave(StreamPortType::Core, 0);
        assert!(matches!(
            spec.validate_for(TileClass::Shim),
            Err(PortSpecError::NoSuchPortType { .. })
        ));
        assert!(spec.validate_for(TileClass::Aie).is_ok());
    }

    #[test]
    fn test_port_spec_display() {
        assert_eq!(
            PortSpec::slave(StreamPortType::South, 0).to_string(),
            "slave/south/0"
        );
    }
}
