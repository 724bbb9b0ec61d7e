//! Reservation audit log
//!
//! Every lease grant, lease return and exhaustion is recorded with a
//! pool-wide sequence number. The log is test-visible and never consulted
//! by the reservation logic itself.
//!
//! The log keeps a bounded history: once `capacity` entries are held, the
//! oldest entry is dropped for each new one. Sequence numbers keep counting,
//! so a gap at the front shows how much history was trimmed.

use crate::kind::ResourceKind;
use crate::pool::LeaseId;
use aie_types::{ControllerId, ModuleType, TileLocation};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of entries a pool keeps
pub const DEFAULT_AUDIT_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceEvent {
    /// A lease was granted
    Reserved {
        lease: LeaseId,
        owner: ControllerId,
        kind: ResourceKind,
        module: ModuleType,
        instance: u8,
        tiles: Vec<TileLocation>,
    },

    /// A lease was returned to the pool
    Released {
        lease: LeaseId,
        owner: ControllerId,
        kind: ResourceKind,
        module: ModuleType,
        instance: u8,
        tiles: Vec<TileLocation>,
    },

    /// A reservation failed for lack of a free instance
    Exhausted {
        owner: ControllerId,
        kind: ResourceKind,
        module: ModuleType,
        tile: TileLocation,
    },
}

impl ResourceEvent {
    pub fn owner(&self) -> ControllerId {
        match self {
            ResourceEvent::Reserved { owner, .. }
            | ResourceEvent::Released { owner, .. }
            | ResourceEvent::Exhausted { owner, .. } => *owner,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceEvent::Reserved { kind, .. }
            | ResourceEvent::Released { kind, .. }
            | ResourceEvent::Exhausted { kind, .. } => *kind,
        }
    }
}

/// Audit entry with its position in the pool-wide order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAuditEntry {
    pub sequence: u64,
    pub event: ResourceEvent,
}

#[derive(Debug, Clone)]
pub struct ResourceAuditLog {
    entries: VecDeque<ResourceAuditEntry>,
    capacity: usize,
    trimmed: u64,
}

impl ResourceAuditLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }

    /// Creates a log holding at most `capacity` entries
    ///
    /// A capacity of zero disables recording.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            trimmed: 0,
        }
    }

    pub fn record_event(&mut self, sequence: u64, event: ResourceEvent) {
        if self.capacity == 0 {
            self.trimmed += 1;
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.trimmed += 1;
        }
        self.entries.push_back(ResourceAuditEntry { sequence, event });
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries dropped to stay within capacity
    pub fn trimmed(&self) -> u64 {
        self.trimmed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in recording order, oldest first
    pub fn get_entries(&self) -> impl Iterator<Item = &ResourceAuditEntry> + '_ {
        self.entries.iter()
    }

    /// Checks if any entry matches a predicate
    pub fn has_event<F>(&self, predicate: F) -> bool
    where
        F: Fn(&ResourceEvent) -> bool,
    {
        self.entries.iter().any(|entry| predicate(&entry.event))
    }

    /// Counts events matching a predicate
    pub fn count_events<F>(&self, predicate: F) -> usize
    where
        F: Fn(&ResourceEvent) -> bool,
    {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.event))
            .count()
    }

    /// Sequence number of the last entry matching a predicate
    pub fn last_sequence<F>(&self, predicate: F) -> Option<u64>
    where
        F: Fn(&ResourceEvent) -> bool,
    {
        self.entries
            .iter()
            .rev()
            .find(|entry| predicate(&entry.event))
            .map(|entry| entry.sequence)
    }

    /// Sequence number of the first entry matching a predicate
    pub fn first_sequence<F>(&self, predicate: F) -> Option<u64>
    where
        F: Fn(&ResourceEvent) -> bool,
    {
        self.entries
            .iter()
            .find(|entry| predicate(&entry.event))
            .map(|entry| entry.sequence)
    }

    pub fn entries_for_owner(&self, owner: ControllerId) -> Vec<&ResourceAuditEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.event.owner() == owner)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ResourceAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserved(owner: ControllerId, lease: u64, kind: ResourceKind) -> ResourceEvent {
        ResourceEvent::Reserved {
            lease: LeaseId(lease),
            owner,
            kind,
            module: ModuleType::Pl,
            instance: 0,
            tiles: vec![TileLocation::new(6, 0)],
        }
    }

    #[test]
    fn test_audit_log_creation() {
        let log = ResourceAuditLog::new();
        assert_eq!(log.len(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_count_events() {
        let mut log = ResourceAuditLog::new();
        let owner = ControllerId::new();
        log.record_event(1, reserved(owner, 1, ResourceKind::PerformanceCounter));
        log.record_event(2, reserved(owner, 2, ResourceKind::BroadcastChannel));
        log.record_event(
            3,
            ResourceEvent::Exhausted {
                owner,
                kind: ResourceKind::PerformanceCounter,
                module: ModuleType::Pl,
                tile: TileLocation::new(6, 0),
            },
        );

        assert_eq!(
            log.count_events(|e| matches!(e, ResourceEvent::Reserved { .. })),
            2
        );
        assert!(log.has_event(|e| matches!(e, ResourceEvent::Exhausted { .. })));
    }

    #[test]
    fn test_first_and_last_sequence() {
        let mut log = ResourceAuditLog::new();
        let owner = ControllerId::new();
        log.record_event(4, reserved(owner, 1, ResourceKind::PerformanceCounter));
        log.record_event(7, reserved(owner, 2, ResourceKind::PerformanceCounter));

        let is_counter = |e: &ResourceEvent| e.kind() == ResourceKind::PerformanceCounter;
        assert_eq!(log.first_sequence(is_counter), Some(4));
        assert_eq!(log.last_sequence(is_counter), Some(7));
        assert_eq!(
            log.last_sequence(|e| e.kind() == ResourceKind::BroadcastChannel),
            None
        );
    }

    #[test]
    fn test_entries_for_owner() {
        let mut log = ResourceAuditLog::new();
        let a = ControllerId::new();
        let b = ControllerId::new();
        log.record_event(1, reserved(a, 1, ResourceKind::PerformanceCounter));
        log.record_event(2, reserved(b, 2, ResourceKind::PerformanceCounter));
        log.record_event(3, reserved(a, 3, ResourceKind::StreamPortSelector));

        assert_eq!(log.entries_for_owner(a).len(), 2);
        assert_eq!(log.entries_for_owner(b).len(), 1);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut log = ResourceAuditLog::with_capacity(3);
        let owner = ControllerId::new();
        for seq in 1..=10 {
            log.record_event(seq, reserved(owner, seq, ResourceKind::PerformanceCounter));
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.trimmed(), 7);
        let seqs: Vec<u64> = log.get_entries().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![8, 9, 10]);
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let mut log = ResourceAuditLog::with_capacity(0);
        log.record_event(1, reserved(ControllerId::new(), 1, ResourceKind::BroadcastChannel));
        assert!(log.is_empty());
        assert_eq!(log.trimmed(), 1);
    }
}
