//! The resource pool
//!
//! One pool exists per partition and is shared (`Arc<ResourcePool>`) by
//! every controller that reserves hardware on it. The pool owns one bucket
//! per `(kind, tile, module)` triple; each bucket is its own critical
//! section, so reservations on different tiles never contend.
//!
//! A [`Lease`] is an exclusive claim on one instance index. It is not
//! `Clone`, and [`ResourcePool::release`] consumes it, so an instance can be
//! returned at most once and never aliased.
//!
//! Multi-tile leases (broadcast channels) claim the same instance index on
//! every covered tile. Their buckets are locked in ascending key order,
//! which is the only place the pool holds more than one bucket lock.

use crate::audit::{ResourceAuditEntry, ResourceAuditLog, ResourceEvent};
use crate::config::BrokerConfig;
use crate::error::ResourceError;
use crate::kind::ResourceKind;
use aie_types::{ControllerId, ModuleType, PartitionTopology, TileLocation};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Identifies one bucket of interchangeable instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    pub kind: ResourceKind,
    pub loc: TileLocation,
    pub module: ModuleType,
}

impl BucketKey {
    pub fn new(kind: ResourceKind, loc: TileLocation, module: ModuleType) -> Self {
        Self { kind, loc, module }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.kind, self.loc, self.module)
    }
}

#[derive(Debug)]
struct Bucket {
    slots: Vec<Option<ControllerId>>,
}

impl Bucket {
    fn new(capacity: u8) -> Self {
        Self {
            slots: vec![None; usize::from(capacity)],
        }
    }

    fn is_free(&self, instance: usize) -> bool {
        matches!(self.slots.get(instance), Some(None))
    }

    fn in_use(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Unique lease number, for audit correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeaseId(pub(crate) u64);

impl LeaseId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Exclusive claim on one hardware instance
///
/// For single-tile kinds `tiles` has one entry. For broadcast channels it
/// lists every covered tile, all holding the same `instance`.
#[derive(Debug, PartialEq, Eq)]
pub struct Lease {
    id: LeaseId,
    owner: ControllerId,
    kind: ResourceKind,
    module: ModuleType,
    instance: u8,
    tiles: Vec<TileLocation>,
}

impl Lease {
    pub fn id(&self) -> LeaseId {
        self.id
    }

    pub fn owner(&self) -> ControllerId {
        self.owner
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn module(&self) -> ModuleType {
        self.module
    }

    pub fn instance(&self) -> u8 {
        self.instance
    }

    pub fn tiles(&self) -> &[TileLocation] {
        &self.tiles
    }

    /// Checks if the lease covers a tile
    pub fn covers(&self, loc: TileLocation) -> bool {
        self.tiles.contains(&loc)
    }

    fn keys(&self) -> impl Iterator<Item = BucketKey> + '_ {
        self.tiles
            .iter()
            .map(move |loc| BucketKey::new(self.kind, *loc, self.module))
    }
}

/// Process-wide broker of per-tile hardware instances
pub struct ResourcePool {
    config: BrokerConfig,
    buckets: HashMap<BucketKey, Mutex<Bucket>>,
    audit: Mutex<ResourceAuditLog>,
    sequence: AtomicU64,
    next_lease: AtomicU64,
}

impl ResourcePool {
    /// Creates a pool sized by the configuration
    pub fn new(config: BrokerConfig) -> Result<Self, ResourceError> {
        config.validate()?;

        let mut buckets = HashMap::new();
        for loc in config.topology.tiles() {
            let Ok(class) = config.topology.class_of(loc) else {
                continue;
            };
            for module in class.modules() {
                for kind in ResourceKind::ALL {
                    let capacity = config.capacities.capacity(class, *module, kind);
                    if capacity > 0 {
                        buckets.insert(
                            BucketKey::new(kind, loc, *module),
                            Mutex::new(Bucket::new(capacity)),
                        );
                    }
                }
            }
        }
        debug!(
            buckets = buckets.len(),
            audit_capacity = config.audit_capacity,
            "resource pool created"
        );

        Ok(Self {
            audit: Mutex::new(ResourceAuditLog::with_capacity(config.audit_capacity)),
            config,
            buckets,
            sequence: AtomicU64::new(1),
            next_lease: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    pub fn topology(&self) -> &PartitionTopology {
        &self.config.topology
    }

    /// Checks that `kind` exists in `module` of `loc`
    ///
    /// Touches no bucket; this is pure validation.
    pub fn validate_site(
        &self,
        kind: ResourceKind,
        loc: TileLocation,
        module: ModuleType,
    ) -> Result<(), ResourceError> {
        let class = self
            .config
            .topology
            .class_of(loc)
            .map_err(|_| ResourceError::OutOfGrid { loc })?;
        if !class.has_module(module) {
            return Err(ResourceError::ModuleUnavailable { loc, module });
        }
        if !self.buckets.contains_key(&BucketKey::new(kind, loc, module)) {
            return Err(ResourceError::KindUnavailable { kind, loc, module });
        }
        Ok(())
    }

    /// Total instances of `kind` at a site; zero if the kind does not exist there
    pub fn capacity(&self, kind: ResourceKind, loc: TileLocation, module: ModuleType) -> usize {
        self.buckets
            .get(&BucketKey::new(kind, loc, module))
            .map_or(0, |b| b.lock().slots.len())
    }

    /// Instances of `kind` currently leased at a site
    pub fn in_use(&self, kind: ResourceKind, loc: TileLocation, module: ModuleType) -> usize {
        self.buckets
            .get(&BucketKey::new(kind, loc, module))
            .map_or(0, |b| b.lock().in_use())
    }

    /// Free instances of `kind` at a site
    pub fn available(&self, kind: ResourceKind, loc: TileLocation, module: ModuleType) -> usize {
        self.buckets
            .get(&BucketKey::new(kind, loc, module))
            .map_or(0, |b| {
                let bucket = b.lock();
                bucket.slots.len() - bucket.in_use()
            })
    }

    /// Non-empty buckets and their in-use counts
    ///
    /// Buckets are locked one at a time, so under concurrent reservation
    /// the snapshot is per-bucket consistent only.
    pub fn usage_snapshot(&self) -> BTreeMap<BucketKey, usize> {
        self.buckets
            .iter()
            .filter_map(|(key, bucket)| {
                let used = bucket.lock().in_use();
                (used > 0).then_some((*key, used))
            })
            .collect()
    }

    /// Leases one instance of `kind` on every tile of `tiles`
    ///
    /// The same instance index is claimed on all tiles, or nothing is
    /// claimed. Fails immediately with `CapacityExhausted` when no index is
    /// free on every tile; never blocks beyond the bucket locks.
    pub fn acquire(
        &self,
        owner: ControllerId,
        kind: ResourceKind,
        tiles: &[TileLocation],
        module: ModuleType,
    ) -> Result<Lease, ResourceError> {
        let mut tiles = tiles.to_vec();
        tiles.sort();
        tiles.dedup();
        if tiles.is_empty() {
            return Err(ResourceError::EmptySpan { kind });
        }
        for loc in &tiles {
            self.validate_site(kind, *loc, module)?;
        }

        let mut guards = self.lock_buckets(kind, &tiles, module);
        let width = guards.iter().map(|(_, g)| g.slots.len()).min().unwrap_or(0);
        let instance = (0..width).find(|i| guards.iter().all(|(_, g)| g.is_free(*i)));

        let Some(instance) = instance else {
            // A full bucket is named directly. Otherwise every index is
            // blocked somewhere along the span, and the busiest tile is the
            // one recorded.
            let full = guards
                .iter()
                .find(|(_, g)| g.in_use() == g.slots.len())
                .map(|(key, _)| key.loc);
            let busiest = guards
                .iter()
                .max_by_key(|(_, g)| g.in_use())
                .map_or(tiles[0], |(key, _)| key.loc);
            let tile = full.unwrap_or(busiest);
            self.record(ResourceEvent::Exhausted {
                owner,
                kind,
                module,
                tile,
            });
            drop(guards);
            warn!(%owner, %kind, %tile, %module, "reservation failed, no free instance");
            return Err(match full {
                Some(loc) => ResourceError::CapacityExhausted { kind, loc, module },
                None => ResourceError::NoCommonInstance {
                    kind,
                    module,
                    first: tiles[0],
                    last: tiles[tiles.len() - 1],
                },
            });
        };

        for (_, guard) in guards.iter_mut() {
            guard.slots[instance] = Some(owner);
        }
        let lease = Lease {
            id: LeaseId(self.next_lease.fetch_add(1, Ordering::Relaxed)),
            owner,
            kind,
            module,
            // bucket capacities are u8
            instance: instance as u8,
            tiles,
        };
        // Recorded before the buckets unlock, so the audit order matches
        // the order in which slots changed hands.
        self.record(ResourceEvent::Reserved {
            lease: lease.id,
            owner,
            kind,
            module,
            instance: lease.instance,
            tiles: lease.tiles.clone(),
        });
        drop(guards);

        debug!(
            %owner,
            %kind,
            %module,
            instance = lease.instance,
            tiles = lease.tiles.len(),
            "lease granted"
        );
        Ok(lease)
    }

    /// Returns a lease to the pool
    pub fn release(&self, lease: Lease) {
        let mut guards = self.lock_buckets(lease.kind, &lease.tiles, lease.module);
        for (key, guard) in guards.iter_mut() {
            match guard.slots.get_mut(usize::from(lease.instance)) {
                Some(slot) if *slot == Some(lease.owner) => *slot = None,
                _ => warn!(%key, instance = lease.instance, "releasing a slot the lease does not hold"),
            }
        }
        self.record(ResourceEvent::Released {
            lease: lease.id,
            owner: lease.owner,
            kind: lease.kind,
            module: lease.module,
            instance: lease.instance,
            tiles: lease.tiles.clone(),
        });
        drop(guards);

        debug!(
            owner = %lease.owner,
            kind = %lease.kind,
            instance = lease.instance,
            "lease returned"
        );
        debug_assert!(lease.keys().all(|k| self.buckets.contains_key(&k)));
    }

    /// Locks the buckets of `tiles` in ascending key order
    fn lock_buckets(
        &self,
        kind: ResourceKind,
        tiles: &[TileLocation],
        module: ModuleType,
    ) -> Vec<(BucketKey, MutexGuard<'_, Bucket>)> {
        let mut keys: Vec<BucketKey> = tiles
            .iter()
            .map(|loc| BucketKey::new(kind, *loc, module))
            .collect();
        keys.sort();
        keys.dedup();
        keys.into_iter()
            .filter_map(|key| self.buckets.get(&key).map(|b| (key, b.lock())))
            .collect()
    }

    /// Appends to the audit log
    ///
    /// Callers may hold bucket locks. The audit lock is always taken after
    /// them and never the other way round.
    fn record(&self, event: ResourceEvent) {
        let mut audit = self.audit.lock();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        audit.record_event(sequence, event);
    }

    /// Number of entries currently held by the audit log
    pub fn audit_len(&self) -> usize {
        self.audit.lock().len()
    }

    /// Copy of the audit log
    ///
    /// The log is bounded by `BrokerConfig::audit_capacity`, so the copy is too.
    pub fn audit_snapshot(&self) -> ResourceAuditLog {
        self.audit.lock().clone()
    }

    /// Copy of the audit entries recorded for one owner
    pub fn audit_for(&self, owner: ControllerId) -> Vec<ResourceAuditEntry> {
        self.audit
            .lock()
            .entries_for_owner(owner)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("topology", &self.config.topology)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}
