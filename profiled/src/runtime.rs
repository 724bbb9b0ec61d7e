//! # Profile Run
//!
//! One scripted measurement: configure, reserve, start, drive traffic on
//! the simulated ports, read, stop, release.

use aie_types::{PortSpec, StreamPortType, TileLocation};
use profile_io::{ProfileError, ProfileIo, ProfileReport, StatusCode};
use resources::{BrokerConfig, ResourceError, ResourcePool};
use sim_device::SimulatedDevice;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProfiledError {
    #[error("Configuration error: {0}")]
    Config(#[from] ResourceError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("{buckets} pool buckets still in use after release")]
    Leak { buckets: usize },
}

impl ProfiledError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProfiledError::Config(_) => StatusCode::InvalidArgs,
            ProfiledError::Profile(err) => err.status(),
            ProfiledError::Leak { .. } => StatusCode::Failure,
        }
    }
}

/// Run configuration
#[derive(Debug, Clone)]
pub struct ProfiledConfig {
    /// Partition topology and capacities
    pub broker: BrokerConfig,
    pub start: TileLocation,
    pub start_port: PortSpec,
    pub end: TileLocation,
    pub end_port: PortSpec,
    /// Cycles between the trigger and traffic on the start port
    pub lead_cycles: u32,
    /// Cycles between traffic on the start port and on the end port
    pub span_cycles: u32,
    /// Print the report as JSON
    pub json: bool,
}

impl Default for ProfiledConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            start: TileLocation::new(6, 0),
            start_port: PortSpec::slave(StreamPortType::South, 0),
            end: TileLocation::new(9, 0),
            end_port: PortSpec::master(StreamPortType::South, 0),
            lead_cycles: 100,
            span_cycles: 50,
            json: false,
        }
    }
}

impl ProfiledConfig {
    /// Replaces the broker configuration with one loaded from a JSON file
    pub fn load_broker(&mut self, path: impl AsRef<Path>) -> Result<(), ProfiledError> {
        self.broker = BrokerConfig::from_path(path)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub report: ProfileReport,
}

impl RunOutcome {
    /// Renders the report for the host's stdout
    pub fn render(&self, json: bool) -> String {
        if json {
            serde_json::to_string_pretty(&self.report).unwrap_or_else(|_| self.report.to_string())
        } else {
            self.report.to_string()
        }
    }
}

pub struct ProfileRun {
    config: ProfiledConfig,
    device: Arc<SimulatedDevice>,
    pool: Arc<ResourcePool>,
}

impl ProfileRun {
    pub fn new(config: ProfiledConfig) -> Result<Self, ProfiledError> {
        let pool = Arc::new(ResourcePool::new(config.broker.clone())?);
        let device = Arc::new(SimulatedDevice::new(config.broker.topology));
        Ok(Self {
            config,
            device,
            pool,
        })
    }

    pub fn config(&self) -> &ProfiledConfig {
        &self.config
    }

    pub fn device(&self) -> &Arc<SimulatedDevice> {
        &self.device
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// Runs the measurement and checks the pool is empty afterwards
    pub fn execute(&self) -> Result<RunOutcome, ProfiledError> {
        let config = &self.config;
        let mut io = ProfileIo::new(self.device.clone(), Arc::clone(&self.pool));
        io.configure(config.start, config.start_port, config.end, config.end_port)?;

        let device = &self.device;
        let report = io.session(|io| -> Result<ProfileReport, ProfileError> {
            let path = io.path();
            let selector = |index: usize| {
                path.and_then(|p| p.selectors().get(index))
                    .and_then(|s| s.instance())
            };

            device.advance(config.lead_cycles);
            if let Some(instance) = selector(0) {
                device.drive_port(config.start, instance);
            }
            device.advance(config.span_cycles);
            if let Some(instance) = selector(1) {
                device.drive_port(config.end, instance);
            }
            io.report()
        })??;

        let leaked = self.pool.usage_snapshot().len();
        if leaked > 0 {
            return Err(ProfiledError::Leak { buckets: leaked });
        }
        debug!(ops = device.ops().len(), "device operations issued");
        info!(readings = report.readings.len(), "profile run complete");
        Ok(RunOutcome { report })
    }
}
