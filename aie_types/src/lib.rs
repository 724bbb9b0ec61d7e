//! # AIE Types
//!
//! This crate defines the value types shared by every layer of the
//! hardware resource broker.
//!
//! ## Philosophy
//!
//! - **Coordinates are data**: a tile location carries no behavior beyond validation
//! - **Topology is configuration**: grid dimensions come from a loaded partition
//!   description, never from globals
//! - **Events are named, not numbered**: event identifiers are typed so that a
//!   broadcast event cannot be confused with a port-running event
//!
//! ## Key Types
//!
//! - [`TileLocation`]: `(column, row)` address of a tile
//! - [`PartitionTopology`]: grid dimensions and row bands of a partition
//! - [`TileClass`]: shim (boundary), memory tile, or compute tile
//! - [`ModuleType`]: core, memory, or PL/interface module of a tile
//! - [`PortSpec`]: a stream switch port to observe
//! - [`Event`]: hardware event identifiers used to arm counters
//! - [`ControllerId`]: owner identity recorded on every lease

pub mod events;
pub mod ids;
pub mod location;
pub mod ports;
pub mod topology;

pub use events::{CounterEvents, Event};
pub use ids::ControllerId;
pub use location::{ModuleType, TileClass, TileLocation};
pub use ports::{PortSpec, PortSpecError, StreamInterface, StreamPortType};
pub use topology::{PartitionTopology, TopologyError};
