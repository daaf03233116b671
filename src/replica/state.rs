//! The synchronous replica state machine.
//!
//! One struct owns the store, the lock table, and the membership view. Every
//! method is a complete request-reply cycle; the serializer in `handle.rs`
//! guarantees no two of them ever run concurrently, and reads the clock once
//! per message so all comparisons inside one operation agree.

use super::protocol::{DebugStateReply, LockInfo, StoreInfo};
use super::types::{
    ExtendStatus, Key, LockStatus, ReleaseLockStatus, ReleaseStatus, StoreEntry, Tag, Value,
    WRITE_LOCK_TTL_MS, WriteLock,
};
use crate::cluster::types::{Membership, NodeId};

use std::collections::HashMap;

pub struct ReplicaState {
    self_id: NodeId,
    store: HashMap<Key, StoreEntry>,
    /// Small association list; at most one entry per key.
    locks: Vec<WriteLock>,
    membership: Membership,
    lock_sweeps: u64,
    lease_sweeps: u64,
}

impl ReplicaState {
    pub fn new(self_id: NodeId, membership: Membership) -> Self {
        Self {
            self_id,
            store: HashMap::new(),
            locks: Vec::new(),
            membership,
            lock_sweeps: 0,
            lease_sweeps: 0,
        }
    }

    /// Phase 1: try to acquire the per-key write lock.
    ///
    /// A key with any live lock refuses further acquisitions outright; the
    /// value precondition is only consulted for unlocked keys.
    pub fn get_write_lock(
        &mut self,
        key: Key,
        expected: Option<Value>,
        tag: Tag,
        now: u64,
    ) -> LockStatus {
        if self.locks.iter().any(|lock| lock.key == key) {
            return LockStatus::AlreadyLocked;
        }

        let matches = match (self.store.get(&key), &expected) {
            (Some(entry), Some(value)) => entry.value == *value,
            (None, None) => true,
            _ => false,
        };

        if !matches {
            return LockStatus::NotExpectedValue;
        }

        self.locks.push(WriteLock {
            tag,
            key,
            expected,
            acquired_ms: now,
        });

        LockStatus::Ok
    }

    /// Remove the lock minted under `tag`, if it still exists.
    pub fn release_write_lock(&mut self, tag: &Tag) -> ReleaseLockStatus {
        match self.drop_lock(tag) {
            true => ReleaseLockStatus::Ok,
            false => ReleaseLockStatus::LockExpired,
        }
    }

    /// Phase 2 commit: unconditional upsert.
    ///
    /// No precondition check: the coordinator proved quorum in phase 1 and
    /// is trusted here. Folding the lock release into the commit saves the
    /// extra round trip.
    pub fn write(&mut self, tag: &Tag, key: Key, value: Value, lease_length_ms: u64, now: u64) {
        self.store.insert(
            key,
            StoreEntry {
                value,
                lease_expiry_ms: now + lease_length_ms,
            },
        );
        self.drop_lock(tag);
    }

    /// Phase 2 delete: remove the entry if the caller proves ownership by
    /// value.
    pub fn release(&mut self, key: &Key, value: &Value, tag: &Tag) -> ReleaseStatus {
        match self.store.get(key) {
            Some(entry) if entry.value == *value => {
                self.store.remove(key);
                self.drop_lock(tag);
                ReleaseStatus::Ok
            }
            Some(_) => ReleaseStatus::NotOwner,
            None => ReleaseStatus::NotFound,
        }
    }

    /// Phase 2 lease renewal. The new expiry is absolute (`now + extend`),
    /// not an increment of the old one, so a node that never saw the
    /// original write can still install the lease correctly.
    ///
    /// That is also the replica catch-up path: a non-voting replica with no
    /// entry for the key creates it here.
    pub fn extend_lease(
        &mut self,
        tag: &Tag,
        key: Key,
        value: Value,
        extend_length_ms: u64,
        now: u64,
    ) -> ExtendStatus {
        match self.store.get_mut(&key) {
            Some(entry) if entry.value == value => {
                entry.lease_expiry_ms = now + extend_length_ms;
                self.drop_lock(tag);
                ExtendStatus::Ok
            }
            Some(_) => ExtendStatus::NotOwner,
            None => {
                if self.membership.replicas.contains(&self.self_id) {
                    self.store.insert(
                        key,
                        StoreEntry {
                            value,
                            lease_expiry_ms: now + extend_length_ms,
                        },
                    );
                    ExtendStatus::Ok
                } else {
                    ExtendStatus::NotFound
                }
            }
        }
    }

    /// Local uncoordinated read. Leases are not consulted: an entry still in
    /// the store is returned even if its expiry has passed and the sweeper
    /// has not caught up yet.
    pub fn dirty_read(&self, key: &Key) -> Option<Value> {
        self.store.get(key).map(|entry| entry.value.clone())
    }

    /// Reclaim locks past the TTL.
    pub fn sweep_locks(&mut self, now: u64) {
        let before = self.locks.len();
        self.locks
            .retain(|lock| lock.acquired_ms + WRITE_LOCK_TTL_MS > now);
        let removed = before - self.locks.len();
        if removed > 0 {
            tracing::debug!("Lock sweep reclaimed {} stale lock(s)", removed);
        }
        self.lock_sweeps += 1;
    }

    /// Remove entries with expired leases, skipping keys that are currently
    /// locked. A key mid-rewrite must not be observed as missing, and a
    /// racing phase-2 write with a short lease must survive until its lock
    /// is resolved.
    pub fn sweep_leases(&mut self, now: u64) {
        let expired: Vec<Key> = self
            .store
            .iter()
            .filter(|(key, entry)| {
                entry.lease_expiry_ms < now && !self.locks.iter().any(|lock| lock.key == **key)
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.store.remove(key);
        }
        if !expired.is_empty() {
            tracing::debug!("Lease sweep removed {} expired entr(ies)", expired.len());
        }
        self.lease_sweeps += 1;
    }

    pub fn set_nodes(&mut self, primaries: Vec<NodeId>, replicas: Vec<NodeId>) {
        tracing::info!(
            "Installing topology: {} primar(ies), {} replica(s)",
            primaries.len(),
            replicas.len()
        );
        self.membership.primaries = primaries;
        self.membership.replicas = replicas;
    }

    pub fn set_w(&mut self, w: usize) {
        self.membership.w = w.max(1);
    }

    pub fn remove_node(&mut self, node: &NodeId) {
        self.membership.primaries.retain(|n| n != node);
    }

    pub fn membership(&self) -> Membership {
        self.membership.clone()
    }

    pub fn snapshot(&self) -> DebugStateReply {
        DebugStateReply {
            locks: self
                .locks
                .iter()
                .map(|lock| LockInfo {
                    tag: lock.tag.clone(),
                    key: lock.key.clone(),
                    acquired_ms: lock.acquired_ms,
                })
                .collect(),
            store: self
                .store
                .iter()
                .map(|(key, entry)| StoreInfo {
                    key: key.clone(),
                    value: entry.value.clone(),
                    lease_expiry_ms: entry.lease_expiry_ms,
                })
                .collect(),
            lock_sweeps: self.lock_sweeps,
            lease_sweeps: self.lease_sweeps,
        }
    }

    fn drop_lock(&mut self, tag: &Tag) -> bool {
        match self.locks.iter().position(|lock| lock.tag == *tag) {
            Some(index) => {
                self.locks.remove(index);
                true
            }
            None => false,
        }
    }
}
