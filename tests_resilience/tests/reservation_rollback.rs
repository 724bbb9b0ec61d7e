//! Reservation Rollback Tests
//!
//! Validates that a failed reservation never leaves a partial hold, at the
//! group level and across the controller's three reservation stages.

use aie_types::{ControllerId, Event, ModuleType, PortSpec, StreamPortType, TileClass};
use profile_io::{ProfileError, ProfileState, Transition};
use resources::{
    CapacityTable, PerfCounter, ResourceError, ResourceGroup, ResourceHandle, ResourceKind,
    StreamPortSelect,
};
use tests_resilience::{configured_controller, shim, test_bootstrap, test_bootstrap_with};

const PL: ModuleType = ModuleType::Pl;

/// Test: a group whose last member cannot be reserved holds nothing
#[test]
fn test_group_failure_releases_all_members() {
    let capacities =
        CapacityTable::default().with(TileClass::Shim, PL, ResourceKind::PerformanceCounter, 1);
    let (_, pool) = test_bootstrap_with(capacities);
    let owner = ControllerId::new();

    let mut group = ResourceGroup::new();
    for col in [2, 3, 4, 2] {
        let mut counter =
            ResourceHandle::new(&pool, owner, shim(col), PL, PerfCounter::new()).unwrap();
        counter
            .initialize(PL, Event::TRIGGER, PL, Event::PortRunning(0))
            .unwrap();
        group.add(counter).unwrap();
    }

    let err = group.reserve().unwrap_err();
    assert!(matches!(err, ResourceError::CapacityExhausted { loc, .. } if loc == shim(2)));
    for member in &group {
        assert!(!member.is_reserved(), "{:?} kept a lease", member.loc());
    }
    assert!(pool.usage_snapshot().is_empty());
}

/// Test: selector exhaustion releases the already reserved broadcast channel
#[test]
fn test_selector_failure_releases_broadcast() {
    let (device, pool) = test_bootstrap();

    // Another owner takes every selector on the end tile
    let squatter = ControllerId::new();
    let mut taken = ResourceGroup::new();
    for number in 0..8 {
        let mut selector =
            ResourceHandle::new(&pool, squatter, shim(9), PL, StreamPortSelect::new()).unwrap();
        selector
            .set_port_to_select(PortSpec::slave(StreamPortType::South, number % 6))
            .unwrap();
        taken.add(selector).unwrap();
    }
    taken.reserve().unwrap();
    let before = pool.usage_snapshot();

    let mut io = configured_controller(&device, &pool, 6, 9);
    let err = io.reserve().unwrap_err();
    assert!(matches!(err, ProfileError::CapacityExhausted(_)));
    assert_eq!(io.state(), ProfileState::Configured);

    let path = io.path().unwrap();
    assert!(!path.broadcast().is_reserved());
    assert!(path.selectors().iter().all(|s| !s.is_reserved()));
    assert!(path.counters().iter().all(|c| !c.is_reserved()));
    assert_eq!(pool.usage_snapshot(), before);

    // Once the squatter leaves, the same controller reserves normally
    taken.release();
    assert_eq!(io.reserve().unwrap(), Transition::Applied);
}

/// Test: broadcast exhaustion on one intermediate column fails the whole span
#[test]
fn test_broadcast_needs_every_column() {
    let capacities =
        CapacityTable::default().with(TileClass::Shim, PL, ResourceKind::BroadcastChannel, 1);
    let (device, pool) = test_bootstrap_with(capacities);

    let mut middle = ResourceHandle::spanning(&pool, ControllerId::new(), [shim(7)], PL).unwrap();
    middle.reserve().unwrap();

    let mut io = configured_controller(&device, &pool, 6, 9);
    assert!(matches!(
        io.reserve(),
        Err(ProfileError::CapacityExhausted(ResourceError::CapacityExhausted {
            kind: ResourceKind::BroadcastChannel,
            ..
        }))
    ));
    for col in [6, 8, 9] {
        assert_eq!(pool.in_use(ResourceKind::BroadcastChannel, shim(col), PL), 0);
    }
}

/// Test: reserve and release are idempotent
#[test]
fn test_reserve_release_idempotent() {
    let (device, pool) = test_bootstrap();
    let mut io = configured_controller(&device, &pool, 6, 9);

    assert_eq!(io.reserve().unwrap(), Transition::Applied);
    let held = pool.usage_snapshot();
    let audit_len = pool.audit_snapshot().len();

    assert_eq!(io.reserve().unwrap(), Transition::AlreadySatisfied);
    assert_eq!(pool.usage_snapshot(), held);
    assert_eq!(pool.audit_snapshot().len(), audit_len);

    assert_eq!(io.release(), Transition::Applied);
    let audit_len = pool.audit_snapshot().len();
    assert_eq!(io.release(), Transition::AlreadySatisfied);
    assert_eq!(pool.audit_snapshot().len(), audit_len);
    assert!(pool.usage_snapshot().is_empty());
}
