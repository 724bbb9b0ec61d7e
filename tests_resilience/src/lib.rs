//! Resilience Test Utilities
//!
//! This crate provides shared utilities for the broker's integration tests.
//!
//! ## Test Philosophy
//!
//! - **No leaks under faults**: every error path returns the pool to its prior state
//! - **Deterministic failures**: device faults are injected, never random
//! - **Ordering is observable**: the pool audit log and the device op log
//!   are the witnesses for teardown order

use aie_types::{PortSpec, StreamPortType, TileLocation};
use profile_io::ProfileIo;
use resources::{BrokerConfig, CapacityTable, ResourcePool};
use sim_device::SimulatedDevice;
use std::sync::Arc;

/// Bootstrap helper for tests
///
/// Creates a simulated partition and a pool with the default topology and
/// capacities.
pub fn test_bootstrap() -> (Arc<SimulatedDevice>, Arc<ResourcePool>) {
    test_bootstrap_with(CapacityTable::default())
}

/// Same as [`test_bootstrap`] with custom capacities
pub fn test_bootstrap_with(capacities: CapacityTable) -> (Arc<SimulatedDevice>, Arc<ResourcePool>) {
    let config = BrokerConfig::new(Default::default(), capacities);
    let device = Arc::new(SimulatedDevice::new(config.topology));
    let pool = Arc::new(ResourcePool::new(config).expect("default broker config is valid"));
    (device, pool)
}

pub fn shim(col: u8) -> TileLocation {
    TileLocation::new(col, 0)
}

/// Controller configured for slave/south/0 at `start_col` to
/// master/south/0 at `end_col`
pub fn configured_controller(
    device: &Arc<SimulatedDevice>,
    pool: &Arc<ResourcePool>,
    start_col: u8,
    end_col: u8,
) -> ProfileIo {
    let mut io = ProfileIo::new(device.clone(), Arc::clone(pool));
    io.configure(
        shim(start_col),
        PortSpec::slave(StreamPortType::South, 0),
        shim(end_col),
        PortSpec::master(StreamPortType::South, 0),
    )
    .expect("shim endpoints are valid");
    io
}
