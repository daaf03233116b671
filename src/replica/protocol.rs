//! Replica Network Protocol
//!
//! Defines the internal API endpoints and Data Transfer Objects (DTOs) used
//! for node-to-node communication: the two-phase write RPCs, dirty reads,
//! and the administrative topology RPCs.
//!
//! These structures are serialized as JSON and sent over HTTP. Reply
//! statuses are data, not transport errors: a replica always answers with a
//! structured status, and only an unreachable node or a malformed request
//! shows up as an HTTP-level failure.

use super::types::{ExtendStatus, Key, LockStatus, ReleaseLockStatus, ReleaseStatus, Tag, Value};
use crate::cluster::types::{Membership, NodeId};
use serde::{Deserialize, Serialize};

// --- Internal endpoints (node-to-node) ---

/// Phase 1: acquire the per-key write lock.
pub const ENDPOINT_GET_WRITE_LOCK: &str = "/internal/get_write_lock";
/// Abort path: drop a phase-1 lock that will not be committed.
pub const ENDPOINT_RELEASE_WRITE_LOCK: &str = "/internal/release_write_lock";
/// Phase 2: commit a value.
pub const ENDPOINT_WRITE: &str = "/internal/write";
/// Phase 2: delete a value (ownership proven by value equality).
pub const ENDPOINT_RELEASE: &str = "/internal/release";
/// Phase 2: renew (or install) a lease.
pub const ENDPOINT_EXTEND_LEASE: &str = "/internal/extend_lease";
/// Replace the primary/replica sets wholesale.
pub const ENDPOINT_SET_NODES: &str = "/internal/set_nodes";
/// Replace the quorum size.
pub const ENDPOINT_SET_W: &str = "/internal/set_w";
/// Remove one node from the primary set.
pub const ENDPOINT_REMOVE_NODE: &str = "/internal/remove_node";
/// Read the local topology view.
pub const ENDPOINT_GET_NODES: &str = "/internal/get_nodes";
/// Inspect locks, store contents, and sweep counters.
pub const ENDPOINT_DEBUG: &str = "/internal/debug";
/// Local uncoordinated read.
pub const ENDPOINT_READ: &str = "/read";

// --- Data Transfer Objects ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetWriteLockRequest {
    pub key: Key,
    /// The value the entry must currently hold, or `None` to require that
    /// the key is absent.
    pub expected: Option<Value>,
    pub tag: Tag,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetWriteLockReply {
    pub status: LockStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseWriteLockRequest {
    pub tag: Tag,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReleaseWriteLockReply {
    pub status: ReleaseLockStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    pub tag: Tag,
    pub key: Key,
    pub value: Value,
    pub lease_length_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub key: Key,
    pub value: Value,
    pub tag: Tag,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReleaseReply {
    pub status: ReleaseStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtendLeaseRequest {
    pub tag: Tag,
    pub key: Key,
    pub value: Value,
    pub extend_length_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtendLeaseReply {
    pub status: ExtendStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetNodesRequest {
    pub primaries: Vec<NodeId>,
    pub replicas: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetWRequest {
    pub w: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveNodeRequest {
    pub node: NodeId,
    /// Set on the one-hop call back to the removed node, so the removal does
    /// not recurse forever between the two.
    pub reciprocal: bool,
}

/// Plain acknowledgment for operations whose only outcome is OK.
#[derive(Debug, Serialize, Deserialize)]
pub struct AckReply {
    pub ok: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetNodesReply {
    pub membership: Membership,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DirtyReadReply {
    /// The locally stored value; `None` when the key is unknown here.
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    pub tag: Tag,
    pub key: Key,
    pub acquired_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreInfo {
    pub key: Key,
    pub value: Value,
    pub lease_expiry_ms: u64,
}

/// Full observable state of a replica, for debugging and tests.
#[derive(Debug, Serialize, Deserialize)]
pub struct DebugStateReply {
    pub locks: Vec<LockInfo>,
    pub store: Vec<StoreInfo>,
    pub lock_sweeps: u64,
    pub lease_sweeps: u64,
}
