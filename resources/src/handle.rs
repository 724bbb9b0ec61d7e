//! Typed single-tile resource handles
//!
//! A [`ResourceHandle<S>`] pairs a location and module with the
//! kind-specific configuration `S`. It is exclusively owned (usually by a
//! [`ResourceGroup`](crate::group::ResourceGroup)) and holds at most one
//! [`Lease`] at a time.
//!
//! Configuration may only change while the handle is unreserved. Once a
//! lease is held, [`ResourceHandle::spec_mut`] fails with `ConfigFrozen`
//! until the lease is released.

use crate::error::ResourceError;
use crate::kind::ResourceKind;
use crate::pool::{Lease, ResourcePool};
use aie_hal::{AieDevice, HalError};
use aie_types::{ControllerId, ModuleType, TileLocation};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Outcome of a lifecycle transition that succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The transition did work
    Applied,
    /// Already in the target state; nothing was done
    AlreadySatisfied,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Kind-specific configuration and hardware commit of a resource
pub trait ResourceSpec: fmt::Debug + Send {
    const KIND: ResourceKind;

    /// Tiles a lease for this resource must cover
    fn span(&self, loc: TileLocation) -> Vec<TileLocation> {
        vec![loc]
    }

    /// Checks the configuration is complete enough to reserve
    fn check_ready(&self, loc: TileLocation) -> Result<(), ResourceError>;

    /// Commits the configuration to hardware and starts the instance
    fn start(&self, device: &dyn AieDevice, lease: &Lease) -> Result<(), HalError>;

    /// Stops the instance
    fn stop(&self, device: &dyn AieDevice, lease: &Lease) -> Result<(), HalError>;
}

pub struct ResourceHandle<S: ResourceSpec> {
    pool: Arc<ResourcePool>,
    owner: ControllerId,
    loc: TileLocation,
    module: ModuleType,
    spec: S,
    lease: Option<Lease>,
    running: bool,
}

impl<S: ResourceSpec> ResourceHandle<S> {
    /// Creates an unreserved handle
    ///
    /// Validates that the kind exists on every tile the handle would cover.
    /// Nothing is claimed from the pool.
    pub fn new(
        pool: &Arc<ResourcePool>,
        owner: ControllerId,
        loc: TileLocation,
        module: ModuleType,
        spec: S,
    ) -> Result<Self, ResourceError> {
        let span = spec.span(loc);
        if span.is_empty() {
            return Err(ResourceError::EmptySpan { kind: S::KIND });
        }
        for tile in &span {
            pool.validate_site(S::KIND, *tile, module)?;
        }
        Ok(Self {
            pool: Arc::clone(pool),
            owner,
            loc,
            module,
            spec,
            lease: None,
            running: false,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        S::KIND
    }

    pub fn loc(&self) -> TileLocation {
        self.loc
    }

    pub fn module(&self) -> ModuleType {
        self.module
    }

    pub fn owner(&self) -> ControllerId {
        self.owner
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn spec(&self) -> &S {
        &self.spec
    }

    /// Mutable access to the configuration; fails while reserved
    pub fn spec_mut(&mut self) -> Result<&mut S, ResourceError> {
        if self.lease.is_some() {
            return Err(ResourceError::ConfigFrozen {
                kind: S::KIND,
                loc: self.loc,
            });
        }
        Ok(&mut self.spec)
    }

    pub fn is_reserved(&self) -> bool {
        self.lease.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn lease(&self) -> Option<&Lease> {
        self.lease.as_ref()
    }

    /// Instance index of the held lease
    pub fn instance(&self) -> Option<u8> {
        self.lease.as_ref().map(Lease::instance)
    }

    pub(crate) fn require_lease(&self) -> Result<&Lease, ResourceError> {
        self.lease.as_ref().ok_or(ResourceError::NotReserved {
            kind: S::KIND,
            loc: self.loc,
        })
    }

    /// Claims an instance from the pool
    pub fn reserve(&mut self) -> Result<Transition, ResourceError> {
        if self.lease.is_some() {
            return Ok(Transition::AlreadySatisfied);
        }
        self.spec.check_ready(self.loc)?;
        let span = self.spec.span(self.loc);
        let lease = self.pool.acquire(self.owner, S::KIND, &span, self.module)?;
        self.lease = Some(lease);
        Ok(Transition::Applied)
    }

    /// Returns the instance to the pool
    ///
    /// Never fails. Does not touch hardware: a running handle should be
    /// stopped first.
    pub fn release(&mut self) -> Transition {
        match self.lease.take() {
            Some(lease) => {
                if self.running {
                    warn!(kind = %S::KIND, loc = %self.loc, "releasing a running resource");
                    self.running = false;
                }
                self.pool.release(lease);
                Transition::Applied
            }
            None => Transition::AlreadySatisfied,
        }
    }

    /// Commits configuration to hardware and starts the instance
    pub fn start(&mut self, device: &dyn AieDevice) -> Result<Transition, ResourceError> {
        if self.running {
            return Ok(Transition::AlreadySatisfied);
        }
        let lease = self.require_lease()?;
        self.spec.start(device, lease)?;
        self.running = true;
        Ok(Transition::Applied)
    }

    /// Stops the instance; the lease is kept
    pub fn stop(&mut self, device: &dyn AieDevice) -> Result<Transition, ResourceError> {
        if !self.running {
            return Ok(Transition::AlreadySatisfied);
        }
        let lease = self.require_lease()?;
        self.spec.stop(device, lease)?;
        self.running = false;
        Ok(Transition::Applied)
    }
}

impl<S: ResourceSpec> fmt::Debug for ResourceHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("kind", &S::KIND)
            .field("loc", &self.loc)
            .field("module", &self.module)
            .field("spec", &self.spec)
            .field("instance", &self.instance())
            .field("running", &self.running)
            .finish()
    }
}

impl<S: ResourceSpec> Drop for ResourceHandle<S> {
    fn drop(&mut self) {
        if let Some(lease) = self.lease.take() {
            warn!(
                kind = %S::KIND,
                loc = %self.loc,
                owner = %self.owner,
                "handle dropped while reserved, returning lease"
            );
            self.pool.release(lease);
        }
    }
}
