//! Command-line value parsing

use aie_types::{PortSpec, StreamInterface, StreamPortType, TileLocation};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("Invalid tile '{0}', expected COL,ROW")]
    Tile(String),

    #[error("Invalid port '{0}', expected INTERFACE/TYPE/NUMBER (e.g. slave/south/0)")]
    Port(String),
}

/// Parses `COL,ROW`
pub fn parse_tile(text: &str) -> Result<TileLocation, ArgError> {
    let err = || ArgError::Tile(text.to_string());
    let (col, row) = text.split_once(',').ok_or_else(err)?;
    let col = col.trim().parse().map_err(|_| err())?;
    let row = row.trim().parse().map_err(|_| err())?;
    Ok(TileLocation::new(col, row))
}

/// Parses `INTERFACE/TYPE/NUMBER`
pub fn parse_port(text: &str) -> Result<PortSpec, ArgError> {
    let err = || ArgError::Port(text.to_string());
    let parts: Vec<&str> = text.split('/').map(str::trim).collect();
    let [interface, port_type, number] = parts.as_slice() else {
        return Err(err());
    };

    let interface = match interface.to_ascii_lowercase().as_str() {
        "master" => StreamInterface::Master,
        "slave" => StreamInterface::Slave,
        _ => return Err(err()),
    };
    let port_type = match port_type.to_ascii_lowercase().as_str() {
        "core" => StreamPortType::Core,
        "dma" => StreamPortType::Dma,
        "ctrl" => StreamPortType::Ctrl,
        "fifo" => StreamPortType::Fifo,
        "south" => StreamPortType::South,
        "west" => StreamPortType::West,
        "north" => StreamPortType::North,
        "east" => StreamPortType::East,
        "trace" => StreamPortType::Trace,
        _ => return Err(err()),
    };
    let number = number.parse().map_err(|_| err())?;
    Ok(PortSpec::new(interface, port_type, number))
}
