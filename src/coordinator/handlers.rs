//! Coordinator API Handlers
//!
//! HTTP endpoints for client write operations and cluster administration.
//! Each handler drives one coordinator procedure and maps its outcome onto
//! an HTTP shape: quorum failures become 409s with the vote counts, admin
//! broadcast failures become 500s with the offending nodes named.

use axum::{Json, extract::Extension, http::StatusCode};
use std::sync::Arc;

use super::coordinator::{Coordinator, CoordinatorError};
use super::protocol::{
    AdminAckResponse, ExtendLeaseKvRequest, LockRequest, NoQuorumResponse, QuorumWriteResponse,
    ReleaseKvRequest, RemoveNodeAdminRequest, SetNodesBroadcastRequest, SetWBroadcastRequest,
};
use crate::replica::protocol::{AckReply, RemoveNodeRequest};
use crate::replica::types::DEFAULT_LEASE_MS;

type QuorumResult = Result<Json<QuorumWriteResponse>, (StatusCode, Json<NoQuorumResponse>)>;

fn no_quorum(error: CoordinatorError) -> (StatusCode, Json<NoQuorumResponse>) {
    let CoordinatorError::NoQuorum { needed, got } = error;
    (
        StatusCode::CONFLICT,
        Json(NoQuorumResponse {
            error: "no_quorum".to_string(),
            needed,
            got,
        }),
    )
}

pub async fn handle_kv_lock(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<LockRequest>,
) -> QuorumResult {
    let lease = req.lease_length_ms.unwrap_or(DEFAULT_LEASE_MS);
    match coordinator.lock(req.key, req.value, lease).await {
        Ok(summary) => Ok(Json(QuorumWriteResponse {
            ok: true,
            w: summary.w,
            voted: summary.voted,
            committed: summary.committed,
        })),
        Err(error) => Err(no_quorum(error)),
    }
}

pub async fn handle_kv_release(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<ReleaseKvRequest>,
) -> QuorumResult {
    match coordinator.release(req.key, req.value).await {
        Ok(summary) => Ok(Json(QuorumWriteResponse {
            ok: true,
            w: summary.w,
            voted: summary.voted,
            committed: summary.committed,
        })),
        Err(error) => Err(no_quorum(error)),
    }
}

/// Lease renewal reports only success or `no_quorum`; phase-2 stragglers are
/// cleaned up inside the coordinator and logged, not surfaced.
pub async fn handle_kv_extend_lease(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<ExtendLeaseKvRequest>,
) -> Result<Json<AckReply>, (StatusCode, Json<NoQuorumResponse>)> {
    let lease = req.lease_length_ms.unwrap_or(DEFAULT_LEASE_MS);
    match coordinator.extend_lease(req.key, req.value, lease).await {
        Ok(()) => Ok(Json(AckReply { ok: true })),
        Err(error) => Err(no_quorum(error)),
    }
}

pub async fn handle_admin_set_nodes(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<SetNodesBroadcastRequest>,
) -> (StatusCode, Json<AdminAckResponse>) {
    match coordinator
        .set_nodes(&req.cluster, req.primaries, req.replicas)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(AdminAckResponse {
                ok: true,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("set_nodes broadcast failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminAckResponse {
                    ok: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_admin_set_w(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<SetWBroadcastRequest>,
) -> (StatusCode, Json<AdminAckResponse>) {
    match coordinator.set_w(&req.cluster, req.w).await {
        Ok(()) => (
            StatusCode::OK,
            Json(AdminAckResponse {
                ok: true,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!("set_w broadcast failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminAckResponse {
                    ok: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

pub async fn handle_admin_remove_node(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<RemoveNodeAdminRequest>,
) -> (StatusCode, Json<AdminAckResponse>) {
    match coordinator.remove_node(req.node, false).await {
        Ok(()) => (
            StatusCode::OK,
            Json(AdminAckResponse {
                ok: true,
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AdminAckResponse {
                ok: false,
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Internal route: a peer (or an admin acting through a peer) asks this node
/// to drop `node` from its primary set. The reciprocal flag marks the
/// one-hop call back to a removed node and stops the recursion there.
pub async fn handle_remove_node_internal(
    Extension(coordinator): Extension<Arc<Coordinator>>,
    Json(req): Json<RemoveNodeRequest>,
) -> Json<AckReply> {
    if let Err(e) = coordinator.remove_node(req.node, req.reciprocal).await {
        tracing::warn!("remove_node failed: {}", e);
        return Json(AckReply { ok: false });
    }
    Json(AckReply { ok: true })
}
