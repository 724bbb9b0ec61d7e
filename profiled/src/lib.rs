//! # Profile Host Runner
//!
//! Runs one profile session against a simulated partition.
//!
//! ## Philosophy
//!
//! - **Host owns I/O**: the broker crates never print; the host renders
//!   the [`profile_io::ProfileReport`]
//! - **Simulation-first**: traffic on the measured ports is scripted
//!   through [`sim_device::SimulatedDevice`]
//! - **Leaks are failures**: a run that leaves any lease in the pool fails

pub mod args;
pub mod runtime;

pub use args::{parse_port, parse_tile, ArgError};
pub use runtime::{ProfileRun, ProfiledConfig, ProfiledError, RunOutcome};
