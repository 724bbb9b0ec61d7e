//! Deterministic fault injection
//!
//! Faults are one-shot: each armed fault fails the first matching call and
//! is then consumed. No randomness is involved.

use crate::ops::{DeviceOp, OpKind};
use aie_types::TileLocation;

/// A fault to inject into device calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFault {
    /// Fail the next call of this kind on any tile
    FailNext { op: OpKind },

    /// Fail the next call of this kind on a specific tile
    FailNextAt { op: OpKind, loc: TileLocation },
}

impl DeviceFault {
    pub(crate) fn matches(&self, op: &DeviceOp) -> bool {
        match self {
            DeviceFault::FailNext { op: kind } => op.kind() == *kind,
            DeviceFault::FailNextAt { op: kind, loc } => op.kind() == *kind && op.loc() == *loc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aie_types::ModuleType;

    #[test]
    fn test_fault_matches_kind() {
        let op = DeviceOp::StartCounter {
            loc: TileLocation::new(6, 0),
            module: ModuleType::Pl,
            counter: 0,
        };
        assert!(DeviceFault::FailNext {
            op: OpKind::StartCounter
        }
        .matches(&op));
        assert!(!DeviceFault::FailNext {
            op: OpKind::StopCounter
        }
        .matches(&op));
    }

    #[test]
    fn test_fault_matches_location() {
        let op = DeviceOp::ResetPort {
            loc: TileLocation::new(9, 0),
            selector: 1,
        };
        let here = DeviceFault::FailNextAt {
            op: OpKind::ResetPort,
            loc: TileLocation::new(9, 0),
        };
        let elsewhere = DeviceFault::FailNextAt {
            op: OpKind::ResetPort,
            loc: TileLocation::new(6, 0),
        };
        assert!(here.matches(&op));
        assert!(!elsewhere.matches(&op));
    }
}
