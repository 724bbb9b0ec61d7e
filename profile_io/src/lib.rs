//! # Profile IO
//!
//! Lifecycle controller for a start-to-end measurement between two
//! boundary tiles.
//!
//! ## Lifecycle
//!
//! ```text
//! Unconfigured -> Configured -> Reserved -> Running -> Reserved -> Released
//! ```
//!
//! - Reservation order: broadcast channel, port selectors, counters.
//!   A failing stage releases every earlier stage.
//! - Teardown order is the mirror image: counters, port selectors,
//!   broadcast channel.
//! - Calls that find the controller already in their target state succeed
//!   with [`Transition::AlreadySatisfied`]. Calls whose prerequisites are
//!   missing fail with [`ProfileError::PreconditionViolation`].
//!
//! The device is borrowed through a shared [`aie_hal::AieDevice`]; the
//! controller never initializes or tears it down.

pub mod controller;
pub mod error;
pub mod report;

pub use controller::{ProfileIo, ProfileState};
pub use error::{ProfileError, StatusCode};
pub use report::{CounterReading, ProfileReport};
pub use resources::Transition;
