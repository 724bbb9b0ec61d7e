//! # Signal Path
//!
//! Composes resources on two boundary tiles into a cross-tile measurement
//! path: a port selector and a performance counter at each end, joined by
//! one broadcast channel spanning every column between them.
//!
//! ## Phases
//!
//! - [`SignalPathBuilder::configure`] validates the endpoints and builds an
//!   unreserved [`SignalPath`]. Nothing is claimed from the pool.
//! - Once the broadcast channel and selectors are reserved,
//!   [`SignalPath::arming_plan`] derives the counter events. The derivation
//!   itself ([`ArmingPlan::derive`]) is pure and needs no device.
//! - The lifecycle controller reserves, commits and tears down the path.

pub mod builder;
pub mod error;
pub mod plan;

pub use builder::{Endpoint, SignalPath, SignalPathBuilder};
pub use error::PathError;
pub use plan::{ArmingPlan, CounterArming, Trigger};
