//! Device operation log
//!
//! Every call into the simulated device is recorded in order. Tests use the
//! log to assert on commit order without inspecting internal state.

use aie_types::{CounterEvents, Event, ModuleType, PortSpec, TileLocation};
use serde::{Deserialize, Serialize};

/// One recorded device call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceOp {
    SelectPort {
        loc: TileLocation,
        selector: u8,
        port: PortSpec,
    },
    ResetPort {
        loc: TileLocation,
        selector: u8,
    },
    ConfigureCounter {
        loc: TileLocation,
        module: ModuleType,
        counter: u8,
        events: CounterEvents,
    },
    StartCounter {
        loc: TileLocation,
        module: ModuleType,
        counter: u8,
    },
    StopCounter {
        loc: TileLocation,
        module: ModuleType,
        counter: u8,
    },
    ReadCounter {
        loc: TileLocation,
        module: ModuleType,
        counter: u8,
    },
    EnableBroadcast {
        loc: TileLocation,
        module: ModuleType,
        channel: u8,
    },
    DisableBroadcast {
        loc: TileLocation,
        module: ModuleType,
        channel: u8,
    },
    BroadcastEvent {
        loc: TileLocation,
        module: ModuleType,
        channel: u8,
        event: Event,
    },
    GenerateEvent {
        loc: TileLocation,
        module: ModuleType,
        event: Event,
    },
}

/// Category of a device call, used to target faults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    SelectPort,
    ResetPort,
    ConfigureCounter,
    StartCounter,
    StopCounter,
    ReadCounter,
    EnableBroadcast,
    DisableBroadcast,
    BroadcastEvent,
    GenerateEvent,
}

impl DeviceOp {
    pub fn kind(&self) -> OpKind {
        match self {
            DeviceOp::SelectPort { .. } => OpKind::SelectPort,
            DeviceOp::ResetPort { .. } => OpKind::ResetPort,
            DeviceOp::ConfigureCounter { .. } => OpKind::ConfigureCounter,
            DeviceOp::StartCounter { .. } => OpKind::StartCounter,
            DeviceOp::StopCounter { .. } => OpKind::StopCounter,
            DeviceOp::ReadCounter { .. } => OpKind::ReadCounter,
            DeviceOp::EnableBroadcast { .. } => OpKind::EnableBroadcast,
            DeviceOp::DisableBroadcast { .. } => OpKind::DisableBroadcast,
            DeviceOp::BroadcastEvent { .. } => OpKind::BroadcastEvent,
            DeviceOp::GenerateEvent { .. } => OpKind::GenerateEvent,
        }
    }

    pub fn loc(&self) -> TileLocation {
        match self {
            DeviceOp::SelectPort { loc, .. }
            | DeviceOp::ResetPort { loc, .. }
            | DeviceOp::ConfigureCounter { loc, .. }
            | DeviceOp::StartCounter { loc, .. }
            | DeviceOp::StopCounter { loc, .. }
            | DeviceOp::ReadCounter { loc, .. }
            | DeviceOp::EnableBroadcast { loc, .. }
            | DeviceOp::DisableBroadcast { loc, .. }
            | DeviceOp::BroadcastEvent { loc, .. }
            | DeviceOp::GenerateEvent { loc, .. } => *loc,
        }
    }
}
