//! # AIE Hardware Abstraction Layer
//!
//! This crate defines the device primitive the resource broker drives.
//!
//! ## Philosophy
//!
//! **The broker decides, the device obeys.**
//!
//! The device trait exposes exactly the side effects the broker needs to
//! commit a reservation to hardware. It does NOT:
//! - Track which instances are free (that is the resource pool's job)
//! - Validate lifecycle state (that is the controller's job)
//! - Wait for events to propagate (event delivery is fire-and-forget)
//!
//! ## Design Principles
//!
//! 1. **Shared, borrowed**: a device is owned by whoever initialized the
//!    partition; the broker only holds an `Arc<dyn AieDevice>`
//! 2. **Interior synchronization**: all methods take `&self`
//! 3. **Instance-addressed**: every call names the tile, module and instance
//!    index the pool leased out
//! 4. **Testable**: `sim_device` provides a deterministic implementation

use aie_types::{CounterEvents, Event, ModuleType, PortSpec, TileLocation};
use thiserror::Error;

/// Device primitive for one initialized partition
pub trait AieDevice: Send + Sync {
    /// Points port selector `selector` at a stream switch port
    fn select_port(&self, loc: TileLocation, selector: u8, port: PortSpec) -> Result<(), HalError>;

    /// Detaches port selector `selector`
    fn reset_port(&self, loc: TileLocation, selector: u8) -> Result<(), HalError>;

    /// Programs the start/stop events of a performance counter
    fn configure_counter(
        &self,
        loc: TileLocation,
        module: ModuleType,
        counter: u8,
        events: CounterEvents,
    ) -> Result<(), HalError>;

    /// Resets a counter to zero and lets it react to its start event
    fn start_counter(&self, loc: TileLocation, module: ModuleType, counter: u8)
        -> Result<(), HalError>;

    /// Disarms a counter; its value is kept until the next start
    fn stop_counter(&self, loc: TileLocation, module: ModuleType, counter: u8)
        -> Result<(), HalError>;

    /// Reads the accumulated value of a counter
    fn read_counter(&self, loc: TileLocation, module: ModuleType, counter: u8)
        -> Result<u32, HalError>;

    /// Opens broadcast channel `channel` on one tile of its route
    fn enable_broadcast(&self, loc: TileLocation, module: ModuleType, channel: u8)
        -> Result<(), HalError>;

    /// Closes broadcast channel `channel` on one tile of its route
    fn disable_broadcast(&self, loc: TileLocation, module: ModuleType, channel: u8)
        -> Result<(), HalError>;

    /// Maps `event` at `loc` onto broadcast channel `channel`
    fn broadcast_event(
        &self,
        loc: TileLocation,
        module: ModuleType,
        channel: u8,
        event: Event,
    ) -> Result<(), HalError>;

    /// Raises a software event
    fn generate_event(&self, loc: TileLocation, module: ModuleType, event: Event)
        -> Result<(), HalError>;
}

/// Device errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    #[error("Tile {0} is not part of this partition")]
    InvalidLocation(TileLocation),

    #[error("Module {module} not present on tile {loc}")]
    ModuleUnavailable { loc: TileLocation, module: ModuleType },

    #[error("No instance {instance} on tile {loc}")]
    InvalidInstance { loc: TileLocation, instance: u8 },

    #[error("Device error: {reason}")]
    Device { reason: String },
}

impl HalError {
    /// Create a device error
    pub fn device(reason: impl Into<String>) -> Self {
        Self::Device {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records calls, accepts everything
    struct TraceDevice {
        calls: Mutex<Vec<String>>,
    }

    impl TraceDevice {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn log(&self, call: String) -> Result<(), HalError> {
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    impl AieDevice for TraceDevice {
        fn select_port(&self, loc: TileLocation, selector: u8, port: PortSpec) -> Result<(), HalError> {
            self.log(format!("select {} {} {}", loc, selector, port))
        }

        fn reset_port(&self, loc: TileLocation, selector: u8) -> Result<(), HalError> {
            self.log(format!("reset {} {}", loc, selector))
        }

        fn configure_counter(
            &self,
            loc: TileLocation,
            module: ModuleType,
            counter: u8,
            events: CounterEvents,
        ) -> Result<(), HalError> {
            self.log(format!("configure {} {} {} {}", loc, module, counter, events))
        }

        fn start_counter(&self, loc: TileLocation, module: ModuleType, counter: u8) -> Result<(), HalError> {
            self.log(format!("start {} {} {}", loc, module, counter))
        }

        fn stop_counter(&self, loc: TileLocation, module: ModuleType, counter: u8) -> Result<(), HalError> {
            self.log(format!("stop {} {} {}", loc, module, counter))
        }

        fn read_counter(&self, _loc: TileLocation, _module: ModuleType, counter: u8) -> Result<u32, HalError> {
            Ok(u32::from(counter) * 10)
        }

        fn enable_broadcast(&self, loc: TileLocation, module: ModuleType, channel: u8) -> Result<(), HalError> {
            self.log(format!("bc_on {} {} {}", loc, module, channel))
        }

        fn disable_broadcast(&self, loc: TileLocation, module: ModuleType, channel: u8) -> Result<(), HalError> {
            self.log(format!("bc_off {} {} {}", loc, module, channel))
        }

        fn broadcast_event(
            &self,
            loc: TileLocation,
            module: ModuleType,
            channel: u8,
            event: Event,
        ) -> Result<(), HalError> {
            self.log(format!("bc_map {} {} {} {}", loc, module, channel, event))
        }

        fn generate_event(&self, loc: TileLocation, module: ModuleType, event: Event) -> Result<(), HalError> {
            self.log(format!("gen {} {} {}", loc, module, event))
        }
    }

    #[test]
    fn test_device_is_object_safe() {
        let device: std::sync::Arc<dyn AieDevice> = std::sync::Arc::new(TraceDevice::new());
        let loc = TileLocation::new(6, 0);
        device
            .generate_event(loc, ModuleType::Pl, Event::TRIGGER)
            .unwrap();
        assert_eq!(device.read_counter(loc, ModuleType::Pl, 1).unwrap(), 10);
    }

    #[test]
    fn test_trace_device_records_in_order() {
        let device = TraceDevice::new();
        let loc = TileLocation::new(6, 0);
        device.enable_broadcast(loc, ModuleType::Pl, 2).unwrap();
        device.broadcast_event(loc, ModuleType::Pl, 2, Event::TRIGGER).unwrap();

        let calls = device.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].starts_with("bc_on"));
        assert!(calls[1].starts_with("bc_map"));
    }

    #[test]
    fn test_hal_error_display() {
        let err = HalError::InvalidInstance {
            loc: TileLocation::new(1, 0),
            instance: 9,
        };
        assert_eq!(err.to_string(), "No instance 9 on tile (1,0)");
    }
}
