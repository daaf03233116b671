//! Replica Module Tests
//!
//! Unit tests for the state machine (driven with explicit clocks, no I/O)
//! and behavioral tests for the serializer actor with compressed sweep
//! intervals. Cluster-wide behavior is covered in `coordinator/tests.rs`.

#[cfg(test)]
mod tests {
    use crate::cluster::types::{Membership, NodeId};
    use crate::replica::handle::ReplicaHandle;
    use crate::replica::state::ReplicaState;
    use crate::replica::types::{
        ExtendStatus, LockStatus, ReleaseLockStatus, ReleaseStatus, SweepConfig, Tag,
    };
    use serde_json::json;
    use std::time::Duration;

    fn node(port: u16) -> NodeId {
        NodeId(format!("127.0.0.1:{}", port))
    }

    /// A primary-only node: the usual voting participant.
    fn primary_state() -> ReplicaState {
        ReplicaState::new(node(7000), Membership::solo(node(7000)))
    }

    /// A node listed in the replica set, for the catch-up rule.
    fn replica_state() -> ReplicaState {
        let membership = Membership {
            primaries: vec![node(7000)],
            replicas: vec![node(7001)],
            w: 1,
        };
        ReplicaState::new(node(7001), membership)
    }

    // ============================================================
    // WRITE LOCK ACQUISITION
    // ============================================================

    #[test]
    fn test_lock_granted_when_key_absent() {
        let mut state = primary_state();

        let status = state.get_write_lock("a".into(), None, Tag::mint(), 1_000);
        assert_eq!(status, LockStatus::Ok);
    }

    #[test]
    fn test_lock_refused_when_expecting_value_on_absent_key() {
        let mut state = primary_state();

        let status = state.get_write_lock("a".into(), Some(json!(1)), Tag::mint(), 1_000);
        assert_eq!(status, LockStatus::NotExpectedValue);
        assert!(state.snapshot().locks.is_empty());
    }

    #[test]
    fn test_lock_granted_when_stored_value_matches() {
        let mut state = primary_state();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);

        let status = state.get_write_lock("a".into(), Some(json!(1)), Tag::mint(), 1_100);
        assert_eq!(status, LockStatus::Ok);
    }

    #[test]
    fn test_lock_refused_when_stored_value_differs() {
        let mut state = primary_state();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);

        let status = state.get_write_lock("a".into(), Some(json!(2)), Tag::mint(), 1_100);
        assert_eq!(status, LockStatus::NotExpectedValue);
    }

    #[test]
    fn test_lock_refused_when_key_present_but_absence_expected() {
        let mut state = primary_state();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);

        let status = state.get_write_lock("a".into(), None, Tag::mint(), 1_100);
        assert_eq!(status, LockStatus::NotExpectedValue);
    }

    #[test]
    fn test_at_most_one_lock_per_key() {
        let mut state = primary_state();

        assert_eq!(
            state.get_write_lock("a".into(), None, Tag::mint(), 1_000),
            LockStatus::Ok
        );
        // Second acquisition refuses regardless of its precondition.
        assert_eq!(
            state.get_write_lock("a".into(), None, Tag::mint(), 1_001),
            LockStatus::AlreadyLocked
        );
        assert_eq!(state.snapshot().locks.len(), 1);
    }

    #[test]
    fn test_locks_on_different_keys_are_independent() {
        let mut state = primary_state();

        assert_eq!(
            state.get_write_lock("a".into(), None, Tag::mint(), 1_000),
            LockStatus::Ok
        );
        assert_eq!(
            state.get_write_lock("b".into(), None, Tag::mint(), 1_000),
            LockStatus::Ok
        );
        assert_eq!(state.snapshot().locks.len(), 2);
    }

    // ============================================================
    // WRITE LOCK RELEASE
    // ============================================================

    #[test]
    fn test_release_write_lock_removes_the_tagged_lock() {
        let mut state = primary_state();
        let tag = Tag::mint();
        state.get_write_lock("a".into(), None, tag.clone(), 1_000);

        assert_eq!(state.release_write_lock(&tag), ReleaseLockStatus::Ok);
        assert!(state.snapshot().locks.is_empty());

        // Once gone, further releases report the lock as expired.
        assert_eq!(
            state.release_write_lock(&tag),
            ReleaseLockStatus::LockExpired
        );
    }

    #[test]
    fn test_release_write_lock_unknown_tag() {
        let mut state = primary_state();
        assert_eq!(
            state.release_write_lock(&Tag::mint()),
            ReleaseLockStatus::LockExpired
        );
    }

    // ============================================================
    // COMMIT (write)
    // ============================================================

    #[test]
    fn test_write_installs_value_and_consumes_lock() {
        let mut state = primary_state();
        let tag = Tag::mint();
        state.get_write_lock("a".into(), None, tag.clone(), 1_000);

        state.write(&tag, "a".into(), json!(42), 5_000, 1_200);

        assert_eq!(state.dirty_read(&"a".into()), Some(json!(42)));
        assert!(state.snapshot().locks.is_empty());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.store[0].lease_expiry_ms, 6_200);
    }

    #[test]
    fn test_write_overwrites_existing_entry() {
        let mut state = primary_state();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);
        state.write(&Tag::mint(), "a".into(), json!(2), 5_000, 2_000);

        assert_eq!(state.dirty_read(&"a".into()), Some(json!(2)));
        assert_eq!(state.snapshot().store.len(), 1);
    }

    #[test]
    fn test_write_commits_without_a_lock() {
        // The replica trusts the coordinator: a commit whose lock already
        // timed out (or never existed here) still lands.
        let mut state = primary_state();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);

        assert_eq!(state.dirty_read(&"a".into()), Some(json!(1)));
    }

    // ============================================================
    // RELEASE (delete)
    // ============================================================

    #[test]
    fn test_release_deletes_owned_entry() {
        let mut state = primary_state();
        let tag = Tag::mint();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);
        state.get_write_lock("a".into(), Some(json!(1)), tag.clone(), 1_100);

        assert_eq!(
            state.release(&"a".into(), &json!(1), &tag),
            ReleaseStatus::Ok
        );
        assert_eq!(state.dirty_read(&"a".into()), None);
        assert!(state.snapshot().locks.is_empty());
    }

    #[test]
    fn test_release_wrong_value_is_not_owner() {
        let mut state = primary_state();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);

        assert_eq!(
            state.release(&"a".into(), &json!(2), &Tag::mint()),
            ReleaseStatus::NotOwner
        );
        // The entry survives a refused delete.
        assert_eq!(state.dirty_read(&"a".into()), Some(json!(1)));
    }

    #[test]
    fn test_release_absent_key_is_not_found() {
        let mut state = primary_state();
        assert_eq!(
            state.release(&"a".into(), &json!(1), &Tag::mint()),
            ReleaseStatus::NotFound
        );
    }

    // ============================================================
    // EXTEND LEASE
    // ============================================================

    #[test]
    fn test_extend_lease_sets_absolute_expiry() {
        let mut state = primary_state();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);

        // The new expiry is now + extend, not old expiry + extend.
        let status = state.extend_lease(&Tag::mint(), "a".into(), json!(1), 3_000, 10_000);
        assert_eq!(status, ExtendStatus::Ok);
        assert_eq!(state.snapshot().store[0].lease_expiry_ms, 13_000);
    }

    #[test]
    fn test_extend_lease_consumes_lock() {
        let mut state = primary_state();
        let tag = Tag::mint();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);
        state.get_write_lock("a".into(), Some(json!(1)), tag.clone(), 1_100);

        state.extend_lease(&tag, "a".into(), json!(1), 3_000, 1_200);
        assert!(state.snapshot().locks.is_empty());
    }

    #[test]
    fn test_extend_lease_wrong_value_is_not_owner() {
        let mut state = primary_state();
        state.write(&Tag::mint(), "a".into(), json!(1), 5_000, 1_000);

        assert_eq!(
            state.extend_lease(&Tag::mint(), "a".into(), json!(2), 3_000, 1_100),
            ExtendStatus::NotOwner
        );
    }

    #[test]
    fn test_extend_lease_absent_key_on_primary_is_not_found() {
        let mut state = primary_state();
        assert_eq!(
            state.extend_lease(&Tag::mint(), "a".into(), json!(1), 3_000, 1_000),
            ExtendStatus::NotFound
        );
        assert_eq!(state.dirty_read(&"a".into()), None);
    }

    #[test]
    fn test_extend_lease_installs_entry_on_replica() {
        // A late-joining replica never saw the original write; extending
        // the lease doubles as its install mechanism.
        let mut state = replica_state();

        let status = state.extend_lease(&Tag::mint(), "a".into(), json!(9), 5_000, 2_000);
        assert_eq!(status, ExtendStatus::Ok);
        assert_eq!(state.dirty_read(&"a".into()), Some(json!(9)));
        assert_eq!(state.snapshot().store[0].lease_expiry_ms, 7_000);
    }

    // ============================================================
    // DIRTY READ
    // ============================================================

    #[test]
    fn test_dirty_read_ignores_expired_lease() {
        let mut state = primary_state();
        state.write(&Tag::mint(), "a".into(), json!(1), 100, 1_000);

        // Lease expired long ago, but the sweeper has not run: the entry
        // is still visible.
        assert_eq!(state.dirty_read(&"a".into()), Some(json!(1)));
    }

    // ============================================================
    // SWEEPERS
    // ============================================================

    #[test]
    fn test_lock_sweep_removes_only_stale_locks() {
        let mut state = primary_state();
        state.get_write_lock("old".into(), None, Tag::mint(), 1_000);
        state.get_write_lock("fresh".into(), None, Tag::mint(), 1_500);

        // TTL is 1000 ms: "old" is exactly at the boundary and goes,
        // "fresh" has 500 ms left and stays.
        state.sweep_locks(2_000);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.locks.len(), 1);
        assert_eq!(snapshot.locks[0].key, "fresh");
    }

    #[test]
    fn test_lock_sweep_allows_reacquisition() {
        let mut state = primary_state();
        state.get_write_lock("a".into(), None, Tag::mint(), 1_000);
        assert_eq!(
            state.get_write_lock("a".into(), None, Tag::mint(), 1_500),
            LockStatus::AlreadyLocked
        );

        state.sweep_locks(2_100);

        assert_eq!(
            state.get_write_lock("a".into(), None, Tag::mint(), 2_200),
            LockStatus::Ok
        );
    }

    #[test]
    fn test_lease_sweep_removes_expired_entries() {
        let mut state = primary_state();
        state.write(&Tag::mint(), "short".into(), json!(1), 100, 1_000);
        state.write(&Tag::mint(), "long".into(), json!(2), 60_000, 1_000);

        state.sweep_leases(5_000);

        assert_eq!(state.dirty_read(&"short".into()), None);
        assert_eq!(state.dirty_read(&"long".into()), Some(json!(2)));
    }

    #[test]
    fn test_lease_sweep_spares_locked_keys() {
        let mut state = primary_state();
        let tag = Tag::mint();
        state.write(&Tag::mint(), "a".into(), json!(1), 100, 1_000);
        state.get_write_lock("a".into(), Some(json!(1)), tag.clone(), 1_050);

        // Expired lease, but the key is mid-rewrite: the entry must not
        // vanish underneath the lock holder.
        state.sweep_leases(5_000);
        assert_eq!(state.dirty_read(&"a".into()), Some(json!(1)));

        // Once the lock is gone the next sweep collects it.
        state.release_write_lock(&tag);
        state.sweep_leases(5_100);
        assert_eq!(state.dirty_read(&"a".into()), None);
    }

    // ============================================================
    // MEMBERSHIP OPERATIONS
    // ============================================================

    #[test]
    fn test_set_nodes_replaces_both_sets() {
        let mut state = primary_state();
        state.set_nodes(vec![node(1), node(2)], vec![node(3)]);

        let membership = state.membership();
        assert_eq!(membership.primaries, vec![node(1), node(2)]);
        assert_eq!(membership.replicas, vec![node(3)]);
    }

    #[test]
    fn test_set_w_floors_at_one() {
        let mut state = primary_state();
        state.set_w(0);
        assert_eq!(state.membership().w, 1);

        state.set_w(3);
        assert_eq!(state.membership().w, 3);
    }

    #[test]
    fn test_remove_node_drops_from_primaries() {
        let mut state = primary_state();
        state.set_nodes(vec![node(1), node(2)], vec![node(3)]);

        state.remove_node(&node(2));

        let membership = state.membership();
        assert_eq!(membership.primaries, vec![node(1)]);
        // Replica membership is edited wholesale via set_nodes.
        assert_eq!(membership.replicas, vec![node(3)]);
    }

    // ============================================================
    // SERIALIZER ACTOR
    // ============================================================

    #[tokio::test]
    async fn test_handle_round_trip() {
        let replica = ReplicaHandle::spawn(
            node(7100),
            Membership::solo(node(7100)),
            SweepConfig::default(),
        );

        let tag = Tag::mint();
        assert_eq!(
            replica.get_write_lock("a".into(), None, tag.clone()).await,
            LockStatus::Ok
        );
        replica.write(tag, "a".into(), json!(5), 5_000).await;
        assert_eq!(replica.dirty_read("a".into()).await, Some(json!(5)));
    }

    #[tokio::test]
    async fn test_concurrent_acquisitions_one_winner() {
        let replica = ReplicaHandle::spawn(
            node(7101),
            Membership::solo(node(7101)),
            SweepConfig::default(),
        );

        let (first, second) = tokio::join!(
            replica.get_write_lock("a".into(), None, Tag::mint()),
            replica.get_write_lock("a".into(), None, Tag::mint()),
        );

        // The serializer handles one at a time: whichever lands first wins,
        // the other is refused.
        let oks = [first, second]
            .iter()
            .filter(|status| **status == LockStatus::Ok)
            .count();
        assert_eq!(oks, 1);
    }

    #[tokio::test]
    async fn test_actor_lock_sweeper_reclaims_stale_lock() {
        let replica = ReplicaHandle::spawn(
            node(7102),
            Membership::solo(node(7102)),
            SweepConfig {
                lock_sweep: Duration::from_millis(50),
                lease_sweep: Duration::from_secs(3600),
            },
        );

        assert_eq!(
            replica.get_write_lock("a".into(), None, Tag::mint()).await,
            LockStatus::Ok
        );
        assert_eq!(
            replica.get_write_lock("a".into(), None, Tag::mint()).await,
            LockStatus::AlreadyLocked
        );

        // TTL is 1 s; with a 50 ms sweep cadence the lock is gone shortly
        // after.
        tokio::time::sleep(Duration::from_millis(1_300)).await;

        assert_eq!(
            replica.get_write_lock("a".into(), None, Tag::mint()).await,
            LockStatus::Ok
        );
    }

    #[tokio::test]
    async fn test_actor_lease_sweeper_honors_lock_join() {
        let replica = ReplicaHandle::spawn(
            node(7103),
            Membership::solo(node(7103)),
            SweepConfig {
                lock_sweep: Duration::from_millis(50),
                lease_sweep: Duration::from_millis(100),
            },
        );

        let tag = Tag::mint();
        replica.write(Tag::mint(), "a".into(), json!(1), 50).await;
        assert_eq!(
            replica
                .get_write_lock("a".into(), Some(json!(1)), tag.clone())
                .await,
            LockStatus::Ok
        );

        // The lease expires almost immediately, but the live lock shields
        // the entry from the sweeper.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(replica.dirty_read("a".into()).await, Some(json!(1)));

        // Drop the lock; the next lease sweep collects the entry.
        replica.release_write_lock(tag).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(replica.dirty_read("a".into()).await, None);
    }
}
