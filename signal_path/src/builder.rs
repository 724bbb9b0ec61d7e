//! Signal path construction

use crate::error::PathError;
use crate::plan::ArmingPlan;
use aie_types::{ControllerId, ModuleType, PortSpec, TileLocation};
use resources::{
    BroadcastHandle, PerfCounter, PerfCounterHandle, PortSelectHandle, ResourceError,
    ResourceGroup, ResourceHandle, ResourceKind, ResourcePool, StreamPortSelect,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// One end of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub loc: TileLocation,
    pub port: PortSpec,
}

/// Unreserved resources of one measurement path
///
/// Selector and counter groups hold the start endpoint at index
/// [`SignalPath::START`] and the end endpoint at [`SignalPath::END`].
#[derive(Debug)]
pub struct SignalPath {
    start: Endpoint,
    end: Endpoint,
    module: ModuleType,
    broadcast: BroadcastHandle,
    selectors: ResourceGroup<StreamPortSelect>,
    counters: ResourceGroup<PerfCounter>,
}

impl SignalPath {
    pub const START: usize = 0;
    pub const END: usize = 1;

    pub fn start(&self) -> Endpoint {
        self.start
    }

    pub fn end(&self) -> Endpoint {
        self.end
    }

    pub fn module(&self) -> ModuleType {
        self.module
    }

    pub fn broadcast(&self) -> &BroadcastHandle {
        &self.broadcast
    }

    pub fn broadcast_mut(&mut self) -> &mut BroadcastHandle {
        &mut self.broadcast
    }

    pub fn selectors(&self) -> &ResourceGroup<StreamPortSelect> {
        &self.selectors
    }

    pub fn selectors_mut(&mut self) -> &mut ResourceGroup<StreamPortSelect> {
        &mut self.selectors
    }

    pub fn counters(&self) -> &ResourceGroup<PerfCounter> {
        &self.counters
    }

    pub fn counters_mut(&mut self) -> &mut ResourceGroup<PerfCounter> {
        &mut self.counters
    }

    /// Derives counter events from the reserved channel and selectors
    pub fn arming_plan(&self) -> Result<ArmingPlan, PathError> {
        let channel = self.broadcast.channel()?;
        // The end counter must sit on the channel's span
        self.broadcast.event(self.end.loc, self.module)?;
        let start_running = self.selector(Self::START)?.running_event()?;
        let end_running = self.selector(Self::END)?.running_event()?;
        Ok(ArmingPlan::derive(
            self.module,
            self.start.loc,
            start_running,
            self.end.loc,
            end_running,
            channel,
        ))
    }

    /// Writes the plan's event pairs into the (unreserved) counters
    pub fn apply_plan(&mut self, plan: &ArmingPlan) -> Result<(), PathError> {
        for (index, arming) in [Self::START, Self::END].into_iter().zip(plan.counters()) {
            let counter = self
                .counters
                .spec_mut(index)
                .ok_or(ResourceError::EmptyGroup {
                    kind: ResourceKind::PerformanceCounter,
                })??;
            counter.set_events(arming.events);
        }
        Ok(())
    }

    fn selector(&self, index: usize) -> Result<&PortSelectHandle, PathError> {
        self.selectors.get(index).ok_or_else(|| {
            PathError::Resource(ResourceError::EmptyGroup {
                kind: ResourceKind::StreamPortSelector,
            })
        })
    }
}

/// Builds signal paths against one pool on behalf of one controller
#[derive(Debug, Clone)]
pub struct SignalPathBuilder {
    pool: Arc<ResourcePool>,
    owner: ControllerId,
    module: ModuleType,
}

impl SignalPathBuilder {
    pub fn new(pool: Arc<ResourcePool>, owner: ControllerId) -> Self {
        Self {
            pool,
            owner,
            module: ModuleType::Pl,
        }
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn owner(&self) -> ControllerId {
        self.owner
    }

    /// Builds an unreserved path between two boundary tiles
    ///
    /// Both endpoints are validated before any handle is built, so a
    /// rejected request leaves no trace.
    pub fn configure(
        &self,
        start_loc: TileLocation,
        start_port: PortSpec,
        end_loc: TileLocation,
        end_port: PortSpec,
    ) -> Result<SignalPath, PathError> {
        self.validate_endpoint(start_loc, start_port)?;
        self.validate_endpoint(end_loc, end_port)?;

        let row = self.pool.topology().shim_row;
        let broadcast = ResourceHandle::spanning(
            &self.pool,
            self.owner,
            TileLocation::columns(start_loc.col, end_loc.col, row),
            self.module,
        )?;

        let mut selectors = ResourceGroup::new();
        let mut counters = ResourceGroup::new();
        for (loc, port) in [(start_loc, start_port), (end_loc, end_port)] {
            selectors.add(self.selector(loc, port)?)?;
            counters.add(self.counter(loc)?)?;
        }

        debug!(
            owner = %self.owner,
            start = %start_loc,
            end = %end_loc,
            "signal path configured"
        );
        Ok(SignalPath {
            start: Endpoint {
                loc: start_loc,
                port: start_port,
            },
            end: Endpoint {
                loc: end_loc,
                port: end_port,
            },
            module: self.module,
            broadcast,
            selectors,
            counters,
        })
    }

    fn validate_endpoint(&self, loc: TileLocation, port: PortSpec) -> Result<(), PathError> {
        let topology = self.pool.topology();
        if !topology.contains(loc) {
            return Err(PathError::OutOfGrid { loc });
        }
        if !topology.is_boundary(loc) {
            warn!(%loc, "signal path endpoint is not a boundary tile");
            return Err(PathError::NotBoundaryTile { loc });
        }
        let class = topology
            .class_of(loc)
            .map_err(|_| PathError::OutOfGrid { loc })?;
        port.validate_for(class).map_err(|source| {
            warn!(%loc, %port, "signal path port rejected");
            PathError::InvalidPorts { loc, source }
        })
    }

    fn selector(&self, loc: TileLocation, port: PortSpec) -> Result<PortSelectHandle, PathError> {
        let mut handle =
            ResourceHandle::new(&self.pool, self.owner, loc, self.module, StreamPortSelect::new())?;
        handle.set_port_to_select(port)?;
        Ok(handle)
    }

    fn counter(&self, loc: TileLocation) -> Result<PerfCounterHandle, PathError> {
        Ok(ResourceHandle::new(
            &self.pool,
            self.owner,
            loc,
            self.module,
            PerfCounter::new(),
        )?)
    }
}
