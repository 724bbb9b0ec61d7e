//! Broker errors

use crate::kind::ResourceKind;
use aie_hal::HalError;
use aie_types::{ModuleType, PortSpecError, TileLocation};
use std::fmt;
use thiserror::Error;

/// Coarse error taxonomy shared by every layer above the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed input, detected before any resource is touched
    InvalidArgument,
    /// No free instance of the requested kind
    CapacityExhausted,
    /// Operation invoked in the wrong lifecycle state
    PreconditionViolation,
    /// The device rejected a commit
    Device,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::InvalidArgument => write!(f, "invalid argument"),
            ErrorClass::CapacityExhausted => write!(f, "capacity exhausted"),
            ErrorClass::PreconditionViolation => write!(f, "precondition violation"),
            ErrorClass::Device => write!(f, "device error"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Tile {loc} is outside the partition")]
    OutOfGrid { loc: TileLocation },

    #[error("Tile {loc} has no {module} module")]
    ModuleUnavailable { loc: TileLocation, module: ModuleType },

    #[error("No {kind} exists in the {module} module of tile {loc}")]
    KindUnavailable {
        kind: ResourceKind,
        loc: TileLocation,
        module: ModuleType,
    },

    #[error("Invalid port for tile {loc}: {source}")]
    InvalidPort {
        loc: TileLocation,
        #[source]
        source: PortSpecError,
    },

    #[error("A {kind} must cover at least one tile")]
    EmptySpan { kind: ResourceKind },

    #[error("No free {kind} in the {module} module of tile {loc}")]
    CapacityExhausted {
        kind: ResourceKind,
        loc: TileLocation,
        module: ModuleType,
    },

    #[error("No {kind} index is free on every tile from {first} to {last} in the {module} module")]
    NoCommonInstance {
        kind: ResourceKind,
        module: ModuleType,
        first: TileLocation,
        last: TileLocation,
    },

    #[error("Cannot reserve an empty {kind} group")]
    EmptyGroup { kind: ResourceKind },

    #[error("{kind} on tile {loc} is reserved; configuration is frozen")]
    ConfigFrozen { kind: ResourceKind, loc: TileLocation },

    #[error("{kind} on tile {loc} is not configured")]
    Unconfigured { kind: ResourceKind, loc: TileLocation },

    #[error("{kind} on tile {loc} is not reserved")]
    NotReserved { kind: ResourceKind, loc: TileLocation },

    #[error("{kind} on tile {loc} is not running")]
    NotRunning { kind: ResourceKind, loc: TileLocation },

    #[error("Broadcast channel does not cover tile {loc} in the {module} module")]
    NotCovered { loc: TileLocation, module: ModuleType },

    #[error("Invalid broker configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Device error: {0}")]
    Hal(#[from] HalError),
}

impl ResourceError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Maps the error onto the shared taxonomy
    pub fn class(&self) -> ErrorClass {
        match self {
            ResourceError::OutOfGrid { .. }
            | ResourceError::ModuleUnavailable { .. }
            | ResourceError::KindUnavailable { .. }
            | ResourceError::InvalidPort { .. }
            | ResourceError::EmptySpan { .. }
            | ResourceError::NotCovered { .. }
            | ResourceError::InvalidConfig { .. } => ErrorClass::InvalidArgument,
            ResourceError::CapacityExhausted { .. } | ResourceError::NoCommonInstance { .. } => {
                ErrorClass::CapacityExhausted
            }
            ResourceError::EmptyGroup { .. }
            | ResourceError::ConfigFrozen { .. }
            | ResourceError::Unconfigured { .. }
            | ResourceError::NotReserved { .. }
            | ResourceError::NotRunning { .. } => ErrorClass::PreconditionViolation,
            ResourceError::Hal(_) => ErrorClass::Device,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_error_names_kind_and_tile() {
        let err = ResourceError::CapacityExhausted {
            kind: ResourceKind::PerformanceCounter,
            loc: TileLocation::new(6, 0),
            module: ModuleType::Pl,
        };
        assert_eq!(err.to_string(), "No free perf counter in the pl module of tile (6,0)");
        assert_eq!(err.class(), ErrorClass::CapacityExhausted);
    }

    #[test]
    fn test_error_classes() {
        let loc = TileLocation::new(1, 0);
        assert_eq!(
            ResourceError::OutOfGrid { loc }.class(),
            ErrorClass::InvalidArgument
        );
        assert_eq!(
            ResourceError::NotReserved {
                kind: ResourceKind::BroadcastChannel,
                loc
            }
            .class(),
            ErrorClass::PreconditionViolation
        );
        assert_eq!(
            ResourceError::from(HalError::device("boom")).class(),
            ErrorClass::Device
        );
    }
}
