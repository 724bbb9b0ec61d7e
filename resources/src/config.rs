//! Broker configuration

use crate::audit::DEFAULT_AUDIT_CAPACITY;
use crate::error::ResourceError;
use crate::kind::CapacityTable;
use aie_types::PartitionTopology;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Topology plus capacities: everything the pool needs to size its buckets
///
/// Every field falls back to its default when absent from the JSON
/// document, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub topology: PartitionTopology,
    pub capacities: CapacityTable,
    /// Entries the audit log keeps before dropping the oldest; 0 disables it
    pub audit_capacity: usize,
}

impl BrokerConfig {
    pub fn new(topology: PartitionTopology, capacities: CapacityTable) -> Self {
        Self {
            topology,
            capacities,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
        }
    }

    pub fn with_audit_capacity(mut self, audit_capacity: usize) -> Self {
        self.audit_capacity = audit_capacity;
        self
    }

    /// Parses and validates a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ResourceError> {
        let config: BrokerConfig =
            serde_json::from_str(json).map_err(|e| ResourceError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ResourceError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), ResourceError> {
        self.topology
            .validate()
            .map_err(|e| ResourceError::config(e.to_string()))
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new(PartitionTopology::default(), CapacityTable::default())
    }
}
