//! Performance counters

use crate::error::ResourceError;
use crate::handle::{ResourceHandle, ResourceSpec};
use crate::kind::ResourceKind;
use crate::pool::Lease;
use aie_hal::{AieDevice, HalError};
use aie_types::{CounterEvents, Event, ModuleType, TileLocation};

/// Counts cycles between a start and a stop event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfCounter {
    events: Option<CounterEvents>,
}

impl PerfCounter {
    pub fn new() -> Self {
        Self { events: None }
    }

    pub fn events(&self) -> Option<CounterEvents> {
        self.events
    }

    pub fn set_events(&mut self, events: CounterEvents) {
        self.events = Some(events);
    }
}

impl ResourceSpec for PerfCounter {
    const KIND: ResourceKind = ResourceKind::PerformanceCounter;

    fn check_ready(&self, loc: TileLocation) -> Result<(), ResourceError> {
        match self.events {
            Some(_) => Ok(()),
            None => Err(ResourceError::Unconfigured {
                kind: Self::KIND,
                loc,
            }),
        }
    }

    fn start(&self, device: &dyn AieDevice, lease: &Lease) -> Result<(), HalError> {
        let loc = lease.tiles()[0];
        let events = self
            .events
            .ok_or_else(|| HalError::device("counter started without events"))?;
        device.configure_counter(loc, lease.module(), lease.instance(), events)?;
        device.start_counter(loc, lease.module(), lease.instance())
    }

    fn stop(&self, device: &dyn AieDevice, lease: &Lease) -> Result<(), HalError> {
        device.stop_counter(lease.tiles()[0], lease.module(), lease.instance())
    }
}

impl ResourceHandle<PerfCounter> {
    /// Sets the start/stop event pair; fails while reserved
    pub fn initialize(
        &mut self,
        start_module: ModuleType,
        start: Event,
        stop_module: ModuleType,
        stop: Event,
    ) -> Result<(), ResourceError> {
        self.spec_mut()?
            .set_events(CounterEvents::new(start_module, start, stop_module, stop));
        Ok(())
    }

    /// Reads the accumulated count
    ///
    /// Only meaningful while running; reading a stopped or unreserved
    /// counter is a caller error.
    pub fn read_result(&self, device: &dyn AieDevice) -> Result<u32, ResourceError> {
        if !self.is_running() {
            return Err(ResourceError::NotRunning {
                kind: ResourceKind::PerformanceCounter,
                loc: self.loc(),
            });
        }
        let lease = self.require_lease()?;
        Ok(device.read_counter(self.loc(), lease.module(), lease.instance())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerConfig;
    use crate::pool::ResourcePool;
    use aie_types::ControllerId;
    use sim_device::SimulatedDevice;
    use std::sync::Arc;

    const PL: ModuleType = ModuleType::Pl;

    fn counter(pool: &Arc<ResourcePool>) -> ResourceHandle<PerfCounter> {
        ResourceHandle::new(
            pool,
            ControllerId::new(),
            TileLocation::new(6, 0),
            PL,
            PerfCounter::new(),
        )
        .unwrap()
    }

    fn pool() -> Arc<ResourcePool> {
        Arc::new(ResourcePool::new(BrokerConfig::default()).unwrap())
    }

    #[test]
    fn test_reserve_requires_events() {
        let pool = pool();
        let mut handle = counter(&pool);
        assert!(matches!(
            handle.reserve(),
            Err(ResourceError::Unconfigured { .. })
        ));
        assert!(!handle.is_reserved());
    }

    #[test]
    fn test_config_frozen_while_reserved() {
        let pool = pool();
        let mut handle = counter(&pool);
        handle
            .initialize(PL, Event::TRIGGER, PL, Event::PortRunning(0))
            .unwrap();
        handle.reserve().unwrap();

        let result = handle.initialize(PL, Event::User(1), PL, Event::PortRunning(0));
        assert!(matches!(result, Err(ResourceError::ConfigFrozen { .. })));
        assert_eq!(handle.spec().events().unwrap().start, Event::TRIGGER);

        handle.release();
        assert!(handle
            .initialize(PL, Event::User(1), PL, Event::PortRunning(0))
            .is_ok());
    }

    #[test]
    fn test_read_result_requires_running() {
        let pool = pool();
        let device = SimulatedDevice::default();
        let mut handle = counter(&pool);
        handle
            .initialize(PL, Event::TRIGGER, PL, Event::PortRunning(0))
            .unwrap();
        handle.reserve().unwrap();

        assert!(matches!(
            handle.read_result(&device),
            Err(ResourceError::NotRunning { .. })
        ));

        handle.start(&device).unwrap();
        device
            .generate_event(TileLocation::new(6, 0), PL, Event::TRIGGER)
            .unwrap();
        device.advance(12);
        assert_eq!(handle.read_result(&device).unwrap(), 12);

        handle.stop(&device).unwrap();
        handle.release();
    }

    #[test]
    fn test_start_without_reserve() {
        let pool = pool();
        let device = SimulatedDevice::default();
        let mut handle = counter(&pool);
        handle
            .initialize(PL, Event::TRIGGER, PL, Event::PortRunning(0))
            .unwrap();
        assert!(matches!(
            handle.start(&device),
            Err(ResourceError::NotReserved { .. })
        ));
        assert!(device.ops().is_empty());
    }

    #[test]
    fn test_drop_returns_lease() {
        let pool = pool();
        {
            let mut handle = counter(&pool);
            handle
                .initialize(PL, Event::TRIGGER, PL, Event::PortRunning(0))
                .unwrap();
            handle.reserve().unwrap();
            assert_eq!(
                pool.in_use(ResourceKind::PerformanceCounter, TileLocation::new(6, 0), PL),
                1
            );
        }
        assert!(pool.usage_snapshot().is_empty());
    }
}
