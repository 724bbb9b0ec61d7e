use aie_types::{PortSpecError, TileLocation};
use resources::{ErrorClass, ResourceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Tile {loc} is not a boundary tile")]
    NotBoundaryTile { loc: TileLocation },

    #[error("Invalid port at {loc}: {source}")]
    InvalidPorts {
        loc: TileLocation,
        #[source]
        source: PortSpecError,
    },

    #[error("Tile {loc} is outside the partition")]
    OutOfGrid { loc: TileLocation },

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl PathError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PathError::NotBoundaryTile { .. }
            | PathError::InvalidPorts { .. }
            | PathError::OutOfGrid { .. } => ErrorClass::InvalidArgument,
            PathError::Resource(err) => err.class(),
        }
    }
}
