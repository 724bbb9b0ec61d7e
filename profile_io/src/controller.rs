//! Profile IO lifecycle controller

use crate::error::ProfileError;
use crate::report::{CounterReading, ProfileReport};
use aie_hal::AieDevice;
use aie_types::{ControllerId, PortSpec, TileLocation};
use resources::{ResourcePool, Transition};
use serde::{Deserialize, Serialize};
use signal_path::{ArmingPlan, PathError, SignalPath, SignalPathBuilder};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileState {
    Unconfigured,
    Configured,
    Reserved,
    Running,
    Released,
}

impl fmt::Display for ProfileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileState::Unconfigured => write!(f, "unconfigured"),
            ProfileState::Configured => write!(f, "configured"),
            ProfileState::Reserved => write!(f, "reserved"),
            ProfileState::Running => write!(f, "running"),
            ProfileState::Released => write!(f, "released"),
        }
    }
}

/// Measures traffic between two boundary-tile stream ports
///
/// Owns one [`SignalPath`] and drives it through reservation, arming,
/// the triggered start, readout and ordered teardown.
///
/// ## Example
///
/// ```
/// use aie_types::{PortSpec, StreamPortType, TileLocation};
/// use profile_io::{ProfileIo, ProfileState};
/// use resources::{BrokerConfig, ResourcePool};
/// use sim_device::SimulatedDevice;
/// use std::sync::Arc;
///
/// let pool = Arc::new(ResourcePool::new(BrokerConfig::default()).unwrap());
/// let device = Arc::new(SimulatedDevice::default());
/// let mut io = ProfileIo::new(device, pool);
///
/// io.configure(
///     TileLocation::new(6, 0),
///     PortSpec::slave(StreamPortType::South, 0),
///     TileLocation::new(9, 0),
///     PortSpec::master(StreamPortType::South, 0),
/// )
/// .unwrap();
/// io.reserve().unwrap();
/// io.start().unwrap();
/// assert_eq!(io.state(), ProfileState::Running);
/// io.stop().unwrap();
/// io.release();
/// ```
pub struct ProfileIo {
    device: Arc<dyn AieDevice>,
    builder: SignalPathBuilder,
    path: Option<SignalPath>,
    plan: Option<ArmingPlan>,
    state: ProfileState,
}

impl ProfileIo {
    pub fn new(device: Arc<dyn AieDevice>, pool: Arc<ResourcePool>) -> Self {
        Self::with_owner(device, pool, ControllerId::new())
    }

    pub fn with_owner(device: Arc<dyn AieDevice>, pool: Arc<ResourcePool>, owner: ControllerId) -> Self {
        Self {
            device,
            builder: SignalPathBuilder::new(pool, owner),
            path: None,
            plan: None,
            state: ProfileState::Unconfigured,
        }
    }

    pub fn id(&self) -> ControllerId {
        self.builder.owner()
    }

    pub fn state(&self) -> ProfileState {
        self.state
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        self.builder.pool()
    }

    pub fn path(&self) -> Option<&SignalPath> {
        self.path.as_ref()
    }

    /// Event arming of the current reservation
    pub fn plan(&self) -> Option<&ArmingPlan> {
        self.plan.as_ref()
    }

    /// Sets the measured ports, replacing any previous path
    ///
    /// Rejected while reserved or running. A rejected request leaves the
    /// previous configuration in place.
    pub fn configure(
        &mut self,
        start_loc: TileLocation,
        start_port: PortSpec,
        end_loc: TileLocation,
        end_port: PortSpec,
    ) -> Result<(), ProfileError> {
        if matches!(self.state, ProfileState::Reserved | ProfileState::Running) {
            error!(owner = %self.id(), state = %self.state, "failed to set IO ports, resources are reserved");
            return Err(ProfileError::precondition("configure", self.state));
        }
        let path = self
            .builder
            .configure(start_loc, start_port, end_loc, end_port)
            .map_err(|err| {
                error!(owner = %self.id(), error = %err, "failed to set IO ports");
                ProfileError::from(err)
            })?;

        self.path = Some(path);
        self.plan = None;
        self.state = ProfileState::Configured;
        info!(owner = %self.id(), start = %start_loc, end = %end_loc, "IO ports set");
        Ok(())
    }

    /// Reserves the broadcast channel, then the selectors, then the counters
    pub fn reserve(&mut self) -> Result<Transition, ProfileError> {
        match self.state {
            ProfileState::Reserved | ProfileState::Running => {
                return Ok(Transition::AlreadySatisfied)
            }
            ProfileState::Configured | ProfileState::Released => {}
            ProfileState::Unconfigured => {
                error!(owner = %self.id(), "failed to reserve, no IO path configured");
                return Err(ProfileError::precondition("reserve", self.state));
            }
        }
        let owner = self.id();
        let Some(path) = self.path.as_mut() else {
            return Err(ProfileError::precondition("reserve", self.state));
        };

        if let Err(err) = path.broadcast_mut().reserve() {
            error!(%owner, error = %err, "failed to reserve broadcast channel");
            return Err(err.into());
        }
        if let Err(err) = path.selectors_mut().reserve() {
            error!(%owner, error = %err, "failed to reserve port selectors");
            path.broadcast_mut().release();
            return Err(err.into());
        }
        let plan = match arm(path) {
            Ok(plan) => plan,
            Err(err) => {
                error!(%owner, error = %err, "failed to derive counter events");
                path.selectors_mut().release();
                path.broadcast_mut().release();
                return Err(err.into());
            }
        };
        if let Err(err) = path.counters_mut().reserve() {
            error!(%owner, error = %err, "failed to reserve counters");
            path.selectors_mut().release();
            path.broadcast_mut().release();
            return Err(err.into());
        }

        debug!(%owner, channel = plan.trigger.channel, "path reserved");
        self.plan = Some(plan);
        self.state = ProfileState::Reserved;
        Ok(Transition::Applied)
    }

    /// Commits the arming and fires the trigger
    ///
    /// The trigger is mapped onto the broadcast channel at the start tile
    /// and raised only after both counters are armed.
    pub fn start(&mut self) -> Result<Transition, ProfileError> {
        match self.state {
            ProfileState::Running => return Ok(Transition::AlreadySatisfied),
            ProfileState::Reserved => {}
            state => {
                error!(owner = %self.id(), %state, "failed to start, resources not reserved");
                return Err(ProfileError::precondition("start", state));
            }
        }
        let owner = self.id();
        let (Some(path), Some(plan)) = (self.path.as_mut(), self.plan) else {
            return Err(ProfileError::precondition("start", self.state));
        };
        let device = self.device.as_ref();

        if let Err(err) = commit(path, &plan, device) {
            error!(%owner, error = %err, "failed to start, rolling back");
            if let Err(stop_err) = stop_all(path, device) {
                warn!(%owner, error = %stop_err, "rollback left resources running");
            }
            return Err(err);
        }

        info!(%owner, trigger = %plan.trigger.loc, "profiling started");
        self.state = ProfileState::Running;
        Ok(Transition::Applied)
    }

    /// Reads every counter, start endpoint first
    ///
    /// Only valid while running. The trigger is fire-and-forget, so a read
    /// immediately after [`ProfileIo::start`] may see a measurement that has
    /// not settled.
    pub fn read_result(&self) -> Result<Vec<CounterReading>, ProfileError> {
        if self.state != ProfileState::Running {
            return Err(ProfileError::precondition("read results", self.state));
        }
        let path = self
            .path
            .as_ref()
            .ok_or(ProfileError::precondition("read results", self.state))?;
        path.counters()
            .iter()
            .map(|counter| -> Result<CounterReading, ProfileError> {
                Ok(CounterReading {
                    loc: counter.loc(),
                    count: counter.read_result(self.device.as_ref())?,
                })
            })
            .collect()
    }

    pub fn report(&self) -> Result<ProfileReport, ProfileError> {
        self.read_result().map(ProfileReport::new)
    }

    /// Stops counters, then selectors, then the broadcast channel
    pub fn stop(&mut self) -> Result<Transition, ProfileError> {
        if self.state != ProfileState::Running {
            return Ok(Transition::AlreadySatisfied);
        }
        let Some(path) = self.path.as_mut() else {
            return Ok(Transition::AlreadySatisfied);
        };
        stop_all(path, self.device.as_ref())?;
        self.state = ProfileState::Reserved;
        info!(owner = %self.id(), "profiling stopped");
        Ok(Transition::Applied)
    }

    /// Releases counters, then selectors, then the broadcast channel
    ///
    /// Never fails. A running controller is stopped first; a stop failure
    /// is logged and the leases are returned regardless.
    pub fn release(&mut self) -> Transition {
        match self.state {
            ProfileState::Reserved => {}
            ProfileState::Running => {
                if let Err(err) = self.stop() {
                    warn!(owner = %self.id(), error = %err, "stop failed during release");
                }
            }
            _ => return Transition::AlreadySatisfied,
        }
        if let Some(path) = self.path.as_mut() {
            path.counters_mut().release();
            path.selectors_mut().release();
            path.broadcast_mut().release();
        }
        self.plan = None;
        self.state = ProfileState::Released;
        info!(owner = %self.id(), "resources released");
        Transition::Applied
    }

    /// Runs `f` between a start and a guaranteed stop and release
    ///
    /// Reserves and starts if needed, then always stops and releases,
    /// whether `f` returns normally or an earlier step fails.
    pub fn session<R>(&mut self, f: impl FnOnce(&ProfileIo) -> R) -> Result<R, ProfileError> {
        self.reserve()?;
        if let Err(err) = self.start() {
            self.release();
            return Err(err);
        }
        let out = f(self);
        let stopped = self.stop();
        self.release();
        stopped?;
        Ok(out)
    }
}

impl fmt::Debug for ProfileIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileIo")
            .field("owner", &self.id())
            .field("state", &self.state)
            .field("path", &self.path)
            .field("plan", &self.plan)
            .finish()
    }
}

fn arm(path: &mut SignalPath) -> Result<ArmingPlan, PathError> {
    let plan = path.arming_plan()?;
    path.apply_plan(&plan)?;
    Ok(plan)
}

fn commit(path: &mut SignalPath, plan: &ArmingPlan, device: &dyn AieDevice) -> Result<(), ProfileError> {
    let trigger = plan.trigger;
    path.broadcast_mut().start(device)?;
    path.broadcast()
        .route_event(device, trigger.loc, trigger.event)?;
    path.selectors_mut().start(device)?;
    path.counters_mut().start(device)?;
    device.generate_event(trigger.loc, trigger.module, trigger.event)?;
    Ok(())
}

/// Stops in reverse start order, continuing past failures
fn stop_all(path: &mut SignalPath, device: &dyn AieDevice) -> Result<(), ProfileError> {
    let results = [
        path.counters_mut().stop(device),
        path.selectors_mut().stop(device),
        path.broadcast_mut().stop(device),
    ];
    for result in results {
        result?;
    }
    Ok(())
}
