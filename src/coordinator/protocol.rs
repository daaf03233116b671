//! Coordinator Network Protocol
//!
//! Client-facing API contracts: the `/kv/*` write operations and the
//! `/admin/*` topology broadcasts. Internal node-to-node DTOs live in
//! `replica::protocol`; these are the shapes external callers see.

use crate::cluster::types::NodeId;
use crate::replica::types::{Key, Value};
use serde::{Deserialize, Serialize};

// --- Public endpoints ---

/// Quorum-coordinated create-if-absent write.
pub const ENDPOINT_KV_LOCK: &str = "/kv/lock";
/// Quorum-coordinated delete (ownership proven by value).
pub const ENDPOINT_KV_RELEASE: &str = "/kv/release";
/// Quorum-coordinated lease renewal.
pub const ENDPOINT_KV_EXTEND_LEASE: &str = "/kv/extend_lease";
/// Broadcast a topology install to a whole cluster.
pub const ENDPOINT_ADMIN_SET_NODES: &str = "/admin/set_nodes";
/// Broadcast a quorum-size change to a whole cluster.
pub const ENDPOINT_ADMIN_SET_W: &str = "/admin/set_w";
/// Remove a node (with the reciprocal hop to the removed node).
pub const ENDPOINT_ADMIN_REMOVE_NODE: &str = "/admin/remove_node";
/// Node and store statistics.
pub const ENDPOINT_HEALTH_STATS: &str = "/health/stats";

// --- Data Transfer Objects ---

/// Outcome of a successful quorum write: the quorum size it was judged
/// against, the phase-1 vote count, and the phase-2 commit count. Committing
/// on fewer than all members is not an error; callers that care can compare
/// `committed` against cluster size themselves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WriteSummary {
    pub w: usize,
    pub voted: usize,
    pub committed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LockRequest {
    pub key: Key,
    pub value: Value,
    /// Lease length in milliseconds; defaults to `DEFAULT_LEASE_MS`.
    pub lease_length_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReleaseKvRequest {
    pub key: Key,
    pub value: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExtendLeaseKvRequest {
    pub key: Key,
    pub value: Value,
    pub lease_length_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuorumWriteResponse {
    pub ok: bool,
    pub w: usize,
    pub voted: usize,
    pub committed: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoQuorumResponse {
    pub error: String,
    pub needed: usize,
    pub got: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminAckResponse {
    pub ok: bool,
    /// Present when `ok` is false.
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetNodesBroadcastRequest {
    /// Every node that must install the new view.
    pub cluster: Vec<NodeId>,
    pub primaries: Vec<NodeId>,
    pub replicas: Vec<NodeId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetWBroadcastRequest {
    pub cluster: Vec<NodeId>,
    pub w: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveNodeAdminRequest {
    pub node: NodeId,
}
