//! Replica API Handlers
//!
//! HTTP endpoints that expose the replica state machine to the rest of the
//! cluster. Each handler translates one request into a single serialized
//! call on the `ReplicaHandle` and wraps the structured reply.
//!
//! They act as the bridge between the Axum web framework and the logic in
//! `state.rs`; nothing here touches the state directly.

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
};

use super::handle::ReplicaHandle;
use super::protocol::{
    AckReply, DebugStateReply, DirtyReadReply, ExtendLeaseReply, ExtendLeaseRequest, GetNodesReply,
    GetWriteLockReply, GetWriteLockRequest, ReleaseReply, ReleaseRequest, ReleaseWriteLockReply,
    ReleaseWriteLockRequest, SetNodesRequest, SetWRequest, WriteRequest,
};

pub async fn handle_get_write_lock(
    Extension(replica): Extension<ReplicaHandle>,
    Json(req): Json<GetWriteLockRequest>,
) -> Json<GetWriteLockReply> {
    let status = replica.get_write_lock(req.key, req.expected, req.tag).await;
    Json(GetWriteLockReply { status })
}

pub async fn handle_release_write_lock(
    Extension(replica): Extension<ReplicaHandle>,
    Json(req): Json<ReleaseWriteLockRequest>,
) -> Json<ReleaseWriteLockReply> {
    let status = replica.release_write_lock(req.tag).await;
    Json(ReleaseWriteLockReply { status })
}

/// Phase-2 commit. Always acknowledged: the replica trusts the coordinator
/// to have secured a quorum in phase 1.
pub async fn handle_write(
    Extension(replica): Extension<ReplicaHandle>,
    Json(req): Json<WriteRequest>,
) -> Json<AckReply> {
    replica
        .write(req.tag, req.key, req.value, req.lease_length_ms)
        .await;
    Json(AckReply { ok: true })
}

pub async fn handle_release(
    Extension(replica): Extension<ReplicaHandle>,
    Json(req): Json<ReleaseRequest>,
) -> Json<ReleaseReply> {
    let status = replica.release(req.key, req.value, req.tag).await;
    Json(ReleaseReply { status })
}

pub async fn handle_extend_lease(
    Extension(replica): Extension<ReplicaHandle>,
    Json(req): Json<ExtendLeaseRequest>,
) -> Json<ExtendLeaseReply> {
    let status = replica
        .extend_lease(req.tag, req.key, req.value, req.extend_length_ms)
        .await;
    Json(ExtendLeaseReply { status })
}

pub async fn handle_set_nodes(
    Extension(replica): Extension<ReplicaHandle>,
    Json(req): Json<SetNodesRequest>,
) -> Json<AckReply> {
    replica.set_nodes(req.primaries, req.replicas).await;
    Json(AckReply { ok: true })
}

pub async fn handle_set_w(
    Extension(replica): Extension<ReplicaHandle>,
    Json(req): Json<SetWRequest>,
) -> Json<AckReply> {
    replica.set_w(req.w).await;
    Json(AckReply { ok: true })
}

pub async fn handle_get_nodes(
    Extension(replica): Extension<ReplicaHandle>,
) -> Json<GetNodesReply> {
    let membership = replica.get_nodes().await;
    Json(GetNodesReply { membership })
}

pub async fn handle_debug_state(
    Extension(replica): Extension<ReplicaHandle>,
) -> Json<DebugStateReply> {
    Json(replica.debug_state().await)
}

/// Local dirty read. Serves whatever the store currently holds, expired
/// lease or not.
pub async fn handle_dirty_read(
    Extension(replica): Extension<ReplicaHandle>,
    Path(key): Path<String>,
) -> (StatusCode, Json<DirtyReadReply>) {
    match replica.dirty_read(key).await {
        Some(value) => (StatusCode::OK, Json(DirtyReadReply { value: Some(value) })),
        None => (StatusCode::NOT_FOUND, Json(DirtyReadReply { value: None })),
    }
}
