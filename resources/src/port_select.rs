//! Stream switch port selectors

use crate::error::ResourceError;
use crate::handle::{ResourceHandle, ResourceSpec};
use crate::kind::ResourceKind;
use crate::pool::Lease;
use aie_hal::{AieDevice, HalError};
use aie_types::{Event, PortSpec, TileLocation};

/// Taps one stream switch port for observation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPortSelect {
    port: Option<PortSpec>,
}

impl StreamPortSelect {
    pub fn new() -> Self {
        Self { port: None }
    }

    pub fn port(&self) -> Option<PortSpec> {
        self.port
    }
}

impl ResourceSpec for StreamPortSelect {
    const KIND: ResourceKind = ResourceKind::StreamPortSelector;

    fn check_ready(&self, loc: TileLocation) -> Result<(), ResourceError> {
        match self.port {
            Some(_) => Ok(()),
            None => Err(ResourceError::Unconfigured {
                kind: Self::KIND,
                loc,
            }),
        }
    }

    fn start(&self, device: &dyn AieDevice, lease: &Lease) -> Result<(), HalError> {
        let port = self
            .port
            .ok_or_else(|| HalError::device("port selector started without a port"))?;
        device.select_port(lease.tiles()[0], lease.instance(), port)
    }

    fn stop(&self, device: &dyn AieDevice, lease: &Lease) -> Result<(), HalError> {
        device.reset_port(lease.tiles()[0], lease.instance())
    }
}

impl ResourceHandle<StreamPortSelect> {
    /// Chooses the port to observe; fails while reserved or if the port does
    /// not exist on this tile
    pub fn set_port_to_select(&mut self, port: PortSpec) -> Result<(), ResourceError> {
        let loc = self.loc();
        let class = self
            .pool()
            .topology()
            .class_of(loc)
            .map_err(|_| ResourceError::OutOfGrid { loc })?;
        port.validate_for(class)
            .map_err(|source| ResourceError::InvalidPort { loc, source })?;
        self.spec_mut()?.port = Some(port);
        Ok(())
    }

    /// The "stream-select running" event of the reserved selector
    pub fn running_event(&self) -> Result<Event, ResourceError> {
        Ok(Event::PortRunning(self.require_lease()?.instance()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrokerConfig;
    use crate::pool::ResourcePool;
    use aie_types::{ControllerId, ModuleType, StreamPortType};
    use sim_device::SimulatedDevice;
    use std::sync::Arc;

    fn selector(pool: &Arc<ResourcePool>, col: u8) -> ResourceHandle<StreamPortSelect> {
        ResourceHandle::new(
            pool,
            ControllerId::new(),
            TileLocation::new(col, 0),
            ModuleType::Pl,
            StreamPortSelect::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_running_event_follows_instance() {
        let pool = Arc::new(ResourcePool::new(BrokerConfig::default()).unwrap());
        let mut first = selector(&pool, 6);
        let mut second = selector(&pool, 6);
        first.set_port_to_select(PortSpec::slave(StreamPortType::South, 0)).unwrap();
        second.set_port_to_select(PortSpec::master(StreamPortType::South, 0)).unwrap();

        assert!(matches!(
            first.running_event(),
            Err(ResourceError::NotReserved { .. })
        ));

        first.reserve().unwrap();
        second.reserve().unwrap();
        assert_eq!(first.running_event().unwrap(), Event::PortRunning(0));
        assert_eq!(second.running_event().unwrap(), Event::PortRunning(1));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let pool = Arc::new(ResourcePool::new(BrokerConfig::default()).unwrap());
        let mut handle = selector(&pool, 2);
        let result = handle.set_port_to_select(PortSpec::slave(StreamPortType::Core, 0));
        assert!(matches!(result, Err(ResourceError::InvalidPort { .. })));
        assert_eq!(handle.spec().port(), None);
    }

    #[test]
    fn test_start_selects_port_on_device() {
        let pool = Arc::new(ResourcePool::new(BrokerConfig::default()).unwrap());
        let device = SimulatedDevice::default();
        let mut handle = selector(&pool, 9);
        let port = PortSpec::master(StreamPortType::South, 0);
        handle.set_port_to_select(port).unwrap();
        handle.reserve().unwrap();
        handle.start(&device).unwrap();

        assert_eq!(device.selected_port(TileLocation::new(9, 0), 0), Some(port));

        handle.stop(&device).unwrap();
        assert_eq!(device.selected_port(TileLocation::new(9, 0), 0), None);
        handle.release();
    }
}
