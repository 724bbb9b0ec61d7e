//! # Simulated Device
//!
//! A deterministic, in-process implementation of [`AieDevice`].
//!
//! ## Philosophy
//!
//! - **Simulation-first**: every broker path is exercised without hardware
//! - **Deterministic**: time only moves when [`SimulatedDevice::advance`] is called
//! - **Observable**: every call is recorded in an operation log
//!
//! ## Event model
//!
//! A counter that has been configured and started is *armed*. It starts
//! counting when its start event fires on its tile and module, and stops
//! when its stop event fires. [`SimulatedDevice::advance`] adds cycles to
//! every counting counter.
//!
//! An event raised with [`AieDevice::generate_event`] fires locally. If the
//! same tile mapped that event onto a broadcast channel, the channel's
//! `Broadcast(n)` event also fires on every tile where the channel is open.
//! Broadcast events are delivered one hop only and never re-broadcast.

pub mod fault;
pub mod ops;

pub use fault::DeviceFault;
pub use ops::{DeviceOp, OpKind};

use aie_hal::{AieDevice, HalError};
use aie_types::{
    CounterEvents, Event, ModuleType, PartitionTopology, PortSpec, TileClass, TileLocation,
};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};

/// Phase of a simulated counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterPhase {
    Idle,
    Armed,
    Counting,
    Done,
}

#[derive(Debug, Clone)]
struct SimCounter {
    events: Option<CounterEvents>,
    phase: CounterPhase,
    value: u32,
}

impl SimCounter {
    fn new() -> Self {
        Self {
            events: None,
            phase: CounterPhase::Idle,
            value: 0,
        }
    }
}

type CounterKey = (TileLocation, ModuleType, u8);

#[derive(Debug, Default)]
struct SimState {
    ports: HashMap<(TileLocation, u8), PortSpec>,
    counters: HashMap<CounterKey, SimCounter>,
    routes: HashMap<u8, BTreeSet<(TileLocation, ModuleType)>>,
    mappings: HashMap<(TileLocation, ModuleType, Event), BTreeSet<u8>>,
    faults: Vec<DeviceFault>,
    ops: Vec<DeviceOp>,
}

impl SimState {
    fn fire_local(&mut self, loc: TileLocation, module: ModuleType, event: Event) {
        for ((c_loc, _, _), counter) in self.counters.iter_mut() {
            if *c_loc != loc {
                continue;
            }
            let Some(events) = counter.events else {
                continue;
            };
            match counter.phase {
                CounterPhase::Armed if events.start_module == module && events.start == event => {
                    counter.phase = CounterPhase::Counting;
                }
                CounterPhase::Counting if events.stop_module == module && events.stop == event => {
                    counter.phase = CounterPhase::Done;
                }
                _ => {}
            }
        }
    }

    fn fire(&mut self, loc: TileLocation, module: ModuleType, event: Event) {
        trace!(%loc, %module, %event, "event fired");
        self.fire_local(loc, module, event);

        let channels = self
            .mappings
            .get(&(loc, module, event))
            .cloned()
            .unwrap_or_default();
        for channel in channels {
            let targets = self.routes.get(&channel).cloned().unwrap_or_default();
            for (target, target_module) in targets {
                self.fire_local(target, target_module, Event::Broadcast(channel));
            }
        }
    }
}

/// Simulated partition
pub struct SimulatedDevice {
    topology: PartitionTopology,
    state: Mutex<SimState>,
}

impl SimulatedDevice {
    /// Creates a simulated partition with the given topology
    pub fn new(topology: PartitionTopology) -> Self {
        Self {
            topology,
            state: Mutex::new(SimState::default()),
        }
    }

    pub fn topology(&self) -> &PartitionTopology {
        &self.topology
    }

    /// Arms a one-shot fault
    pub fn inject_fault(&self, fault: DeviceFault) {
        self.state.lock().faults.push(fault);
    }

    /// Returns a copy of the operation log
    pub fn ops(&self) -> Vec<DeviceOp> {
        self.state.lock().ops.clone()
    }

    /// Clears the operation log
    pub fn clear_ops(&self) {
        self.state.lock().ops.clear();
    }

    /// Advances simulated time; every counting counter accumulates `cycles`
    pub fn advance(&self, cycles: u32) {
        let mut state = self.state.lock();
        for counter in state.counters.values_mut() {
            if counter.phase == CounterPhase::Counting {
                counter.value = counter.value.saturating_add(cycles);
            }
        }
    }

    /// Simulates traffic on a selected port, firing its port-running event
    ///
    /// Returns false if nothing is selected on that selector.
    pub fn drive_port(&self, loc: TileLocation, selector: u8) -> bool {
        let Ok(class) = self.topology.class_of(loc) else {
            return false;
        };
        let mut state = self.state.lock();
        if !state.ports.contains_key(&(loc, selector)) {
            return false;
        }
        state.fire(loc, port_module(class), Event::PortRunning(selector));
        true
    }

    /// Port currently selected by `selector`, if any
    pub fn selected_port(&self, loc: TileLocation, selector: u8) -> Option<PortSpec> {
        self.state.lock().ports.get(&(loc, selector)).copied()
    }

    pub fn counter_phase(&self, loc: TileLocation, module: ModuleType, counter: u8) -> Option<CounterPhase> {
        self.state
            .lock()
            .counters
            .get(&(loc, module, counter))
            .map(|c| c.phase)
    }

    pub fn is_broadcast_open(&self, loc: TileLocation, module: ModuleType, channel: u8) -> bool {
        self.state
            .lock()
            .routes
            .get(&channel)
            .is_some_and(|route| route.contains(&(loc, module)))
    }

    /// Number of counters currently armed or counting
    pub fn active_counters(&self) -> usize {
        self.state
            .lock()
            .counters
            .values()
            .filter(|c| matches!(c.phase, CounterPhase::Armed | CounterPhase::Counting))
            .count()
    }

    fn check(&self, loc: TileLocation, module: Option<ModuleType>) -> Result<TileClass, HalError> {
        let class = self
            .topology
            .class_of(loc)
            .map_err(|_| HalError::InvalidLocation(loc))?;
        if let Some(module) = module {
            if !class.has_module(module) {
                return Err(HalError::ModuleUnavailable { loc, module });
            }
        }
        Ok(class)
    }

    /// Records the call and consumes a matching fault, if any
    fn record(&self, state: &mut SimState, op: DeviceOp) -> Result<(), HalError> {
        if let Some(pos) = state.faults.iter().position(|f| f.matches(&op)) {
            state.faults.remove(pos);
            debug!(?op, "injected device fault");
            return Err(HalError::device(format!("injected fault on {:?}", op.kind())));
        }
        state.ops.push(op);
        Ok(())
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new(PartitionTopology::default())
    }
}

/// Module whose event bus carries port-running events on a tile class
fn port_module(class: TileClass) -> ModuleType {
    match class {
        TileClass::Shim => ModuleType::Pl,
        TileClass::MemTile => ModuleType::Memory,
        TileClass::Aie => ModuleType::Core,
    }
}

impl AieDevice for SimulatedDevice {
    fn select_port(&self, loc: TileLocation, selector: u8, port: PortSpec) -> Result<(), HalError> {
        self.check(loc, None)?;
        let mut state = self.state.lock();
        self.record(&mut state, DeviceOp::SelectPort { loc, selector, port })?;
        state.ports.insert((loc, selector), port);
        Ok(())
    }

    fn reset_port(&self, loc: TileLocation, selector: u8) -> Result<(), HalError> {
        self.check(loc, None)?;
        let mut state = self.state.lock();
        self.record(&mut state, DeviceOp::ResetPort { loc, selector })?;
        state.ports.remove(&(loc, selector));
        Ok(())
    }

    fn configure_counter(
        &self,
        loc: TileLocation,
        module: ModuleType,
        counter: u8,
        events: CounterEvents,
    ) -> Result<(), HalError> {
        self.check(loc, Some(module))?;
        let mut state = self.state.lock();
        self.record(
            &mut state,
            DeviceOp::ConfigureCounter {
                loc,
                module,
                counter,
                events,
            },
        )?;
        let entry = state
            .counters
            .entry((loc, module, counter))
            .or_insert_with(SimCounter::new);
        entry.events = Some(events);
        entry.phase = CounterPhase::Idle;
        Ok(())
    }

    fn start_counter(&self, loc: TileLocation, module: ModuleType, counter: u8) -> Result<(), HalError> {
        self.check(loc, Some(module))?;
        let mut state = self.state.lock();
        if !state.counters.contains_key(&(loc, module, counter)) {
            return Err(HalError::InvalidInstance {
                loc,
                instance: counter,
            });
        }
        self.record(&mut state, DeviceOp::StartCounter { loc, module, counter })?;
        if let Some(entry) = state.counters.get_mut(&(loc, module, counter)) {
            entry.value = 0;
            entry.phase = CounterPhase::Armed;
        }
        Ok(())
    }

    fn stop_counter(&self, loc: TileLocation, module: ModuleType, counter: u8) -> Result<(), HalError> {
        self.check(loc, Some(module))?;
        let mut state = self.state.lock();
        self.record(&mut state, DeviceOp::StopCounter { loc, module, counter })?;
        if let Some(entry) = state.counters.get_mut(&(loc, module, counter)) {
            entry.phase = CounterPhase::Idle;
        }
        Ok(())
    }

    fn read_counter(&self, loc: TileLocation, module: ModuleType, counter: u8) -> Result<u32, HalError> {
        self.check(loc, Some(module))?;
        let mut state = self.state.lock();
        self.record(&mut state, DeviceOp::ReadCounter { loc, module, counter })?;
        state
            .counters
            .get(&(loc, module, counter))
            .map(|c| c.value)
            .ok_or(HalError::InvalidInstance {
                loc,
                instance: counter,
            })
    }

    fn enable_broadcast(&self, loc: TileLocation, module: ModuleType, channel: u8) -> Result<(), HalError> {
        self.check(loc, Some(module))?;
        let mut state = self.state.lock();
        self.record(&mut state, DeviceOp::EnableBroadcast { loc, module, channel })?;
        state.routes.entry(channel).or_default().insert((loc, module));
        Ok(())
    }

    fn disable_broadcast(&self, loc: TileLocation, module: ModuleType, channel: u8) -> Result<(), HalError> {
        self.check(loc, Some(module))?;
        let mut state = self.state.lock();
        self.record(&mut state, DeviceOp::DisableBroadcast { loc, module, channel })?;
        if let Some(route) = state.routes.get_mut(&channel) {
            route.remove(&(loc, module));
            if route.is_empty() {
                state.routes.remove(&channel);
            }
        }
        state.mappings.retain(|(m_loc, m_module, _), channels| {
            if *m_loc == loc && *m_module == module {
                channels.remove(&channel);
            }
            !channels.is_empty()
        });
        Ok(())
    }

    fn broadcast_event(
        &self,
        loc: TileLocation,
        module: ModuleType,
        channel: u8,
        event: Event,
    ) -> Result<(), HalError> {
        self.check(loc, Some(module))?;
        let mut state = self.state.lock();
        self.record(
            &mut state,
            DeviceOp::BroadcastEvent {
                loc,
                module,
                channel,
                event,
            },
        )?;
        state
            .mappings
            .entry((loc, module, event))
            .or_default()
            .insert(channel);
        Ok(())
    }

    fn generate_event(&self, loc: TileLocation, module: ModuleType, event: Event) -> Result<(), HalError> {
        self.check(loc, Some(module))?;
        let mut state = self.state.lock();
        self.record(&mut state, DeviceOp::GenerateEvent { loc, module, event })?;
        state.fire(loc, module, event);
        Ok(())
    }
}
