//! Counter event derivation
//!
//! The start counter counts from the software trigger to traffic on the
//! start port. The end counter counts from the trigger's arrival over the
//! broadcast channel to traffic on the end port. The trigger is mapped onto
//! the channel at the start tile and raised there last, so both counters
//! are armed before it fires.

use aie_types::{CounterEvents, Event, ModuleType, TileLocation};

/// Event pair for one counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterArming {
    pub loc: TileLocation,
    pub events: CounterEvents,
}

/// Software event that starts the measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub loc: TileLocation,
    pub module: ModuleType,
    pub event: Event,
    pub channel: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmingPlan {
    pub start: CounterArming,
    pub end: CounterArming,
    pub trigger: Trigger,
}

impl ArmingPlan {
    /// Derives the arming for a path
    ///
    /// `start_running` and `end_running` are the port-running events of the
    /// reserved selectors; `channel` is the reserved broadcast channel.
    pub fn derive(
        module: ModuleType,
        start_loc: TileLocation,
        start_running: Event,
        end_loc: TileLocation,
        end_running: Event,
        channel: u8,
    ) -> Self {
        Self {
            start: CounterArming {
                loc: start_loc,
                events: CounterEvents::new(module, Event::TRIGGER, module, start_running),
            },
            end: CounterArming {
                loc: end_loc,
                events: CounterEvents::new(module, Event::Broadcast(channel), module, end_running),
            },
            trigger: Trigger {
                loc: start_loc,
                module,
                event: Event::TRIGGER,
                channel,
            },
        }
    }

    pub fn counters(&self) -> [CounterArming; 2] {
        [self.start, self.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PL: ModuleType = ModuleType::Pl;

    #[test]
    fn test_derive_start_counter() {
        let plan = ArmingPlan::derive(
            PL,
            TileLocation::new(6, 0),
            Event::PortRunning(0),
            TileLocation::new(9, 0),
            Event::PortRunning(1),
            3,
        );
        assert_eq!(plan.start.loc, TileLocation::new(6, 0));
        assert_eq!(plan.start.events.start, Event::TRIGGER);
        assert_eq!(plan.start.events.stop, Event::PortRunning(0));
    }

    #[test]
    fn test_derive_end_counter_waits_for_broadcast() {
        let plan = ArmingPlan::derive(
            PL,
            TileLocation::new(6, 0),
            Event::PortRunning(0),
            TileLocation::new(9, 0),
            Event::PortRunning(1),
            3,
        );
        assert_eq!(plan.end.loc, TileLocation::new(9, 0));
        assert_eq!(plan.end.events.start, Event::Broadcast(3));
        assert_eq!(plan.end.events.stop, Event::PortRunning(1));
        assert_eq!(plan.end.events.start_module, PL);
    }

    #[test]
    fn test_trigger_raised_at_start_tile() {
        let plan = ArmingPlan::derive(
            PL,
            TileLocation::new(9, 0),
            Event::PortRunning(2),
            TileLocation::new(6, 0),
            Event::PortRunning(0),
            0,
        );
        assert_eq!(plan.trigger.loc, TileLocation::new(9, 0));
        assert_eq!(plan.trigger.event, plan.start.events.start);
        assert_eq!(plan.trigger.channel, 0);
        assert_eq!(plan.counters()[1].loc, TileLocation::new(6, 0));
    }
}
