//! # Resources
//!
//! This crate provides the resource broker for an AIE partition: a shared
//! pool of hardware instances, typed handles that lease from it, and
//! transactional groups of handles.
//!
//! ## Philosophy
//!
//! - **Resources are finite and must be explicit**: every instance in use is
//!   backed by a [`Lease`] naming its owner
//! - **Capacity is enforced, not advisory**: a reservation that would exceed
//!   capacity fails, it never overcommits
//! - **Reservation is transactional**: groups and multi-tile leases succeed
//!   entirely or leave the pool untouched
//! - **Accounting is deterministic and auditable**: every reservation and
//!   release is sequenced in a [`ResourceAuditLog`]
//!
//! ## Core Concepts
//!
//! - Resource kinds: performance counters, stream port selectors, broadcast channels
//! - [`ResourcePool`]: per `(kind, tile, module)` capacity and accounting
//! - [`ResourceHandle`]: one resource with its kind-specific configuration
//! - [`ResourceGroup`]: handles reserved, started, stopped and released together
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A register-level driver (hardware access goes through [`aie_hal::AieDevice`])
//! - A scheduler: the pool never waits for capacity, it fails fast

pub mod audit;
pub mod broadcast;
pub mod config;
pub mod counter;
pub mod error;
pub mod group;
pub mod handle;
pub mod kind;
pub mod pool;
pub mod port_select;

pub use audit::{ResourceAuditEntry, ResourceAuditLog, ResourceEvent, DEFAULT_AUDIT_CAPACITY};
pub use broadcast::BroadcastChannel;
pub use config::BrokerConfig;
pub use counter::PerfCounter;
pub use error::{ErrorClass, ResourceError};
pub use group::{GroupState, ResourceGroup};
pub use handle::{ResourceHandle, ResourceSpec, Transition};
pub use kind::{CapacityEntry, CapacityTable, ResourceKind};
pub use pool::{BucketKey, Lease, LeaseId, ResourcePool};
pub use port_select::StreamPortSelect;

/// Performance counter handle
pub type PerfCounterHandle = ResourceHandle<PerfCounter>;
/// Stream port selector handle
pub type PortSelectHandle = ResourceHandle<StreamPortSelect>;
/// Broadcast channel handle
pub type BroadcastHandle = ResourceHandle<BroadcastChannel>;
