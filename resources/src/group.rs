//! Transactional resource groups
//!
//! A [`ResourceGroup`] is an ordered set of handles of one kind that move
//! through their lifecycle together. Reservation is all-or-nothing: if any
//! member cannot be reserved, every member is released before the error is
//! returned.
//!
//! Members join unreserved and the group never lends out a member mutably,
//! so only the group itself moves them between states. Configuration is
//! reached through [`ResourceGroup::spec_mut`]. Starting is rolled back the same
//! way. Stopping is best effort and reports the first failure.

use crate::error::ResourceError;
use crate::handle::{ResourceHandle, ResourceSpec, Transition};
use aie_hal::AieDevice;
use std::ops::Index;
use tracing::{debug, warn};

/// Aggregate lifecycle state of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Idle,
    Reserved,
    Running,
}

pub struct ResourceGroup<S: ResourceSpec> {
    members: Vec<ResourceHandle<S>>,
}

impl<S: ResourceSpec> ResourceGroup<S> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Appends an unreserved member; the group must not be reserved
    pub fn add(&mut self, handle: ResourceHandle<S>) -> Result<usize, ResourceError> {
        if self.is_reserved() || handle.is_reserved() {
            return Err(ResourceError::ConfigFrozen {
                kind: S::KIND,
                loc: handle.loc(),
            });
        }
        self.members.push(handle);
        Ok(self.members.len() - 1)
    }

    /// Drops every member, returning any held leases
    pub fn clear(&mut self) {
        self.release();
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResourceHandle<S>> {
        self.members.get(index)
    }

    /// Configuration of one member; `ConfigFrozen` while it is reserved
    pub fn spec_mut(&mut self, index: usize) -> Option<Result<&mut S, ResourceError>> {
        self.members.get_mut(index).map(ResourceHandle::spec_mut)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceHandle<S>> {
        self.members.iter()
    }

    pub fn is_reserved(&self) -> bool {
        !self.members.is_empty() && self.members.iter().all(ResourceHandle::is_reserved)
    }

    pub fn is_running(&self) -> bool {
        !self.members.is_empty() && self.members.iter().all(ResourceHandle::is_running)
    }

    pub fn state(&self) -> GroupState {
        if self.is_running() {
            GroupState::Running
        } else if self.is_reserved() {
            GroupState::Reserved
        } else {
            GroupState::Idle
        }
    }

    /// Reserves every member, or none
    pub fn reserve(&mut self) -> Result<Transition, ResourceError> {
        if self.members.is_empty() {
            return Err(ResourceError::EmptyGroup { kind: S::KIND });
        }
        if self.is_reserved() {
            return Ok(Transition::AlreadySatisfied);
        }

        let mut claimed = Vec::new();
        for index in 0..self.members.len() {
            match self.members[index].reserve() {
                Ok(_) => claimed.push(index),
                Err(err) => {
                    debug!(kind = %S::KIND, failed = index, rolled_back = claimed.len(), "group reservation failed");
                    for undo in claimed {
                        self.members[undo].release();
                    }
                    return Err(err);
                }
            }
        }
        debug!(kind = %S::KIND, members = self.members.len(), "group reserved");
        Ok(Transition::Applied)
    }

    /// Releases every member; never fails
    pub fn release(&mut self) -> Transition {
        let mut outcome = Transition::AlreadySatisfied;
        for member in self.members.iter_mut().rev() {
            if member.release().is_applied() {
                outcome = Transition::Applied;
            }
        }
        outcome
    }

    /// Starts every member, stopping the ones already started on failure
    pub fn start(&mut self, device: &dyn AieDevice) -> Result<Transition, ResourceError> {
        if self.is_running() {
            return Ok(Transition::AlreadySatisfied);
        }
        if let Some(member) = self.members.iter().find(|m| !m.is_reserved()) {
            return Err(ResourceError::NotReserved {
                kind: S::KIND,
                loc: member.loc(),
            });
        }

        let mut started = Vec::new();
        for index in 0..self.members.len() {
            match self.members[index].start(device) {
                Ok(Transition::Applied) => started.push(index),
                Ok(Transition::AlreadySatisfied) => {}
                Err(err) => {
                    for undo in started.into_iter().rev() {
                        if let Err(stop_err) = self.members[undo].stop(device) {
                            warn!(kind = %S::KIND, index = undo, error = %stop_err, "rollback stop failed");
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(Transition::Applied)
    }

    /// Stops every running member, continuing past failures
    pub fn stop(&mut self, device: &dyn AieDevice) -> Result<Transition, ResourceError> {
        let mut outcome = Transition::AlreadySatisfied;
        let mut first = None;
        for member in self.members.iter_mut() {
            match member.stop(device) {
                Ok(Transition::Applied) => outcome = Transition::Applied,
                Ok(Transition::AlreadySatisfied) => {}
                Err(err) => {
                    warn!(kind = %S::KIND, loc = %member.loc(), error = %err, "stop failed");
                    first.get_or_insert(err);
                }
            }
        }
        match first {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }
}

impl<S: ResourceSpec> Default for ResourceGroup<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ResourceSpec> Index<usize> for ResourceGroup<S> {
    type Output = ResourceHandle<S>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.members[index]
    }
}

impl<'a, S: ResourceSpec> IntoIterator for &'a ResourceGroup<S> {
    type Item = &'a ResourceHandle<S>;
    type IntoIter = std::slice::Iter<'a, ResourceHandle<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

impl<S: ResourceSpec> std::fmt::Debug for ResourceGroup<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGroup")
            .field("kind", &S::KIND)
            .field("state", &self.state())
            .field("members", &self.members)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerConfig;
    use crate::counter::PerfCounter;
    use crate::kind::{CapacityTable, ResourceKind};
    use crate::pool::ResourcePool;
    use crate::port_select::StreamPortSelect;
    use aie_types::{
        ControllerId, Event, ModuleType, PortSpec, StreamPortType, TileClass, TileLocation,
    };
    use sim_device::{DeviceFault, OpKind, SimulatedDevice};
    use std::sync::Arc;

    const PL: ModuleType = ModuleType::Pl;

    fn shim(col: u8) -> TileLocation {
        TileLocation::new(col, 0)
    }

    fn tight_pool(counters: u8) -> Arc<ResourcePool> {
        let capacities = CapacityTable::default().with(
            TileClass::Shim,
            PL,
            ResourceKind::PerformanceCounter,
            counters,
        );
        let config = BrokerConfig::new(Default::default(), capacities);
        Arc::new(ResourcePool::new(config).unwrap())
    }

    fn counter(pool: &Arc<ResourcePool>, owner: ControllerId, col: u8) -> ResourceHandle<PerfCounter> {
        let mut handle =
            ResourceHandle::new(pool, owner, shim(col), PL, PerfCounter::new()).unwrap();
        handle
            .initialize(PL, Event::TRIGGER, PL, Event::PortRunning(0))
            .unwrap();
        handle
    }

    #[test]
    fn test_empty_group_reserve_fails() {
        let mut group: ResourceGroup<PerfCounter> = ResourceGroup::new();
        assert!(matches!(
            group.reserve(),
            Err(ResourceError::EmptyGroup { .. })
        ));
        assert_eq!(group.state(), GroupState::Idle);
    }

    #[test]
    fn test_reserve_is_all_or_nothing() {
        let pool = tight_pool(1);
        let owner = ControllerId::new();
        let mut group = ResourceGroup::new();
        group.add(counter(&pool, owner, 6)).unwrap();
        group.add(counter(&pool, owner, 9)).unwrap();
        group.add(counter(&pool, owner, 6)).unwrap();

        let err = group.reserve().unwrap_err();
        assert!(matches!(err, ResourceError::CapacityExhausted { .. }));
        assert!(group.iter().all(|m| !m.is_reserved()));
        assert!(pool.usage_snapshot().is_empty());
    }

    #[test]
    fn test_failed_reserve_releases_members_held_beforehand() {
        let pool = tight_pool(1);
        let owner = ControllerId::new();
        let mut group = ResourceGroup::new();
        for col in [2, 3, 2] {
            group.add(counter(&pool, owner, col)).unwrap();
        }
        group.members[0].reserve().unwrap();
        assert_eq!(group.state(), GroupState::Idle);

        assert!(matches!(
            group.reserve(),
            Err(ResourceError::CapacityExhausted { .. })
        ));
        assert!(group.iter().all(|m| !m.is_reserved()));
        assert!(pool.usage_snapshot().is_empty());
    }

    #[test]
    fn test_add_rejects_reserved_handle() {
        let pool = tight_pool(2);
        let owner = ControllerId::new();
        let mut handle = counter(&pool, owner, 6);
        handle.reserve().unwrap();

        let mut group = ResourceGroup::new();
        assert!(matches!(
            group.add(handle),
            Err(ResourceError::ConfigFrozen { .. })
        ));
        assert!(group.is_empty());
        // the rejected handle was dropped and its lease returned
        assert!(pool.usage_snapshot().is_empty());
    }

    #[test]
    fn test_spec_mut_frozen_while_reserved() {
        let pool = tight_pool(2);
        let mut group = ResourceGroup::new();
        group.add(counter(&pool, ControllerId::new(), 6)).unwrap();

        assert!(matches!(group.spec_mut(0), Some(Ok(_))));
        assert!(group.spec_mut(1).is_none());
        group.reserve().unwrap();
        assert!(matches!(
            group.spec_mut(0),
            Some(Err(ResourceError::ConfigFrozen { .. }))
        ));
        group.release();
        assert!(matches!(group.spec_mut(0), Some(Ok(_))));
    }

    #[test]
    fn test_reserve_twice_is_idempotent() {
        let pool = tight_pool(2);
        let owner = ControllerId::new();
        let mut group = ResourceGroup::new();
        group.add(counter(&pool, owner, 6)).unwrap();

        assert_eq!(group.reserve().unwrap(), Transition::Applied);
        assert_eq!(group.reserve().unwrap(), Transition::AlreadySatisfied);
        assert_eq!(pool.in_use(ResourceKind::PerformanceCounter, shim(6), PL), 1);
        assert_eq!(group.release(), Transition::Applied);
        assert_eq!(group.release(), Transition::AlreadySatisfied);
    }

    #[test]
    fn test_add_rejected_while_reserved() {
        let pool = tight_pool(2);
        let owner = ControllerId::new();
        let mut group = ResourceGroup::new();
        group.add(counter(&pool, owner, 6)).unwrap();
        group.reserve().unwrap();
        assert!(matches!(
            group.add(counter(&pool, owner, 9)),
            Err(ResourceError::ConfigFrozen { .. })
        ));
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn test_start_requires_reservation() {
        let pool = tight_pool(2);
        let device = SimulatedDevice::default();
        let mut group = ResourceGroup::new();
        group.add(counter(&pool, ControllerId::new(), 6)).unwrap();
        assert!(matches!(
            group.start(&device),
            Err(ResourceError::NotReserved { .. })
        ));
        assert!(device.ops().is_empty());
    }

    #[test]
    fn test_start_rolls_back_on_failure() {
        let pool = tight_pool(2);
        let device = SimulatedDevice::default();
        let owner = ControllerId::new();
        let mut group = ResourceGroup::new();
        for col in [6, 7, 8] {
            let mut handle =
                ResourceHandle::new(&pool, owner, shim(col), PL, StreamPortSelect::new()).unwrap();
            handle
                .set_port_to_select(PortSpec::slave(StreamPortType::South, 0))
                .unwrap();
            group.add(handle).unwrap();
        }
        group.reserve().unwrap();
        device.inject_fault(DeviceFault::FailNextAt {
            op: OpKind::SelectPort,
            loc: shim(8),
        });

        assert!(group.start(&device).is_err());
        assert_eq!(group.state(), GroupState::Reserved);
        assert!(group.iter().all(|m| !m.is_running()));
        assert_eq!(device.selected_port(shim(6), 0), None);
        assert_eq!(device.selected_port(shim(7), 0), None);
    }

    #[test]
    fn test_stop_continues_past_failure() {
        let pool = tight_pool(2);
        let device = SimulatedDevice::default();
        let owner = ControllerId::new();
        let mut group = ResourceGroup::new();
        group.add(counter(&pool, owner, 6)).unwrap();
        group.add(counter(&pool, owner, 9)).unwrap();
        group.reserve().unwrap();
        group.start(&device).unwrap();
        assert_eq!(group.state(), GroupState::Running);

        device.inject_fault(DeviceFault::FailNextAt {
            op: OpKind::StopCounter,
            loc: shim(6),
        });
        assert!(group.stop(&device).is_err());
        assert!(group.iter().any(|m| m.is_running()));
        assert!(!group[1].is_running());
    }

    #[test]
    fn test_clear_releases_members() {
        let pool = tight_pool(2);
        let mut group = ResourceGroup::new();
        group.add(counter(&pool, ControllerId::new(), 6)).unwrap();
        group.reserve().unwrap();
        group.clear();
        assert!(group.is_empty());
        assert!(pool.usage_snapshot().is_empty());
    }
}
