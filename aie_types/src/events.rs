//! Hardware event identifiers
//!
//! Counters are armed with a start and a stop event. The broker only ever
//! derives three families of events, so they are modelled as variants rather
//! than raw event numbers.

use crate::location::ModuleType;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// Software-generated user event `n` of a module
    User(u8),
    /// "Stream-select running" event of port selector instance `n`
    PortRunning(u8),
    /// Event carried by broadcast channel `n`
    Broadcast(u8),
}

impl Event {
    /// The user event used to trigger a synchronized start
    pub const TRIGGER: Event = Event::User(0);
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::User(n) => write!(f, "user_event_{}", n),
            Event::PortRunning(n) => write!(f, "port_running_{}", n),
            Event::Broadcast(n) => write!(f, "broadcast_{}", n),
        }
    }
}

/// Start/stop event pair a performance counter is armed with
///
/// The events may come from a different module of the same tile than the
/// counter itself, hence the explicit module scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterEvents {
    pub start_module: ModuleType,
    pub start: Event,
    pub stop_module: ModuleType,
    pub stop: Event,
}

impl CounterEvents {
    pub fn new(start_module: ModuleType, start: Event, stop_module: ModuleType, stop: Event) -> Self {
        Self {
            start_module,
            start,
            stop_module,
            stop,
        }
    }
}

impl fmt::Display for CounterEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{}",
            self.start_module, self.start, self.stop_module, self.stop
        )
    }
}
