//! Node bootstrap: one replica serializer, one coordinator, one HTTP router.
//!
//! `start` binds the listener first so a `:0` bind resolves to the node's
//! real identity before the replica is spawned. The returned `Node` keeps
//! the handles; integration tests use them to drive in-process clusters.

use axum::{
    Json, Router,
    extract::Extension,
    routing::{get, post},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use sysinfo::System;
use tokio::net::TcpListener;

use crate::cluster::types::{Membership, NodeId};
use crate::coordinator::coordinator::Coordinator;
use crate::coordinator::handlers::{
    handle_admin_remove_node, handle_admin_set_nodes, handle_admin_set_w, handle_kv_extend_lease,
    handle_kv_lock, handle_kv_release, handle_remove_node_internal,
};
use crate::coordinator::protocol::{
    ENDPOINT_ADMIN_REMOVE_NODE, ENDPOINT_ADMIN_SET_NODES, ENDPOINT_ADMIN_SET_W,
    ENDPOINT_HEALTH_STATS, ENDPOINT_KV_EXTEND_LEASE, ENDPOINT_KV_LOCK, ENDPOINT_KV_RELEASE,
};
use crate::replica::handle::ReplicaHandle;
use crate::replica::handlers::{
    handle_debug_state, handle_dirty_read, handle_extend_lease, handle_get_nodes,
    handle_get_write_lock, handle_release, handle_release_write_lock, handle_set_nodes,
    handle_set_w, handle_write,
};
use crate::replica::protocol::{
    ENDPOINT_DEBUG, ENDPOINT_EXTEND_LEASE, ENDPOINT_GET_NODES, ENDPOINT_GET_WRITE_LOCK,
    ENDPOINT_READ, ENDPOINT_RELEASE, ENDPOINT_RELEASE_WRITE_LOCK, ENDPOINT_REMOVE_NODE,
    ENDPOINT_SET_NODES, ENDPOINT_SET_W, ENDPOINT_WRITE,
};
use crate::replica::types::SweepConfig;

pub struct NodeConfig {
    pub bind: SocketAddr,
    /// Initial topology; `None` boots the node as a lone primary with W = 1
    /// until an administrative `set_nodes` arrives.
    pub membership: Option<Membership>,
    pub sweep: SweepConfig,
}

/// A running node: the listener address plus the two live handles.
pub struct Node {
    pub addr: SocketAddr,
    pub id: NodeId,
    pub replica: ReplicaHandle,
    pub coordinator: Arc<Coordinator>,
}

pub async fn start(config: NodeConfig) -> anyhow::Result<Node> {
    let listener = TcpListener::bind(config.bind).await?;
    let addr = listener.local_addr()?;
    let id = NodeId::from_addr(addr);

    let membership = config
        .membership
        .unwrap_or_else(|| Membership::solo(id.clone()));
    let replica = ReplicaHandle::spawn(id.clone(), membership, config.sweep);
    let coordinator = Arc::new(Coordinator::new(id.clone(), replica.clone()));

    let app = router(replica.clone(), coordinator.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server exited: {}", e);
        }
    });

    tracing::info!("Node {} listening", id.http_addr());

    Ok(Node {
        addr,
        id,
        replica,
        coordinator,
    })
}

pub fn router(replica: ReplicaHandle, coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        // Internal (node-to-node) routes
        .route(ENDPOINT_GET_WRITE_LOCK, post(handle_get_write_lock))
        .route(ENDPOINT_RELEASE_WRITE_LOCK, post(handle_release_write_lock))
        .route(ENDPOINT_WRITE, post(handle_write))
        .route(ENDPOINT_RELEASE, post(handle_release))
        .route(ENDPOINT_EXTEND_LEASE, post(handle_extend_lease))
        .route(ENDPOINT_SET_NODES, post(handle_set_nodes))
        .route(ENDPOINT_SET_W, post(handle_set_w))
        .route(ENDPOINT_REMOVE_NODE, post(handle_remove_node_internal))
        .route(ENDPOINT_GET_NODES, get(handle_get_nodes))
        .route(ENDPOINT_DEBUG, get(handle_debug_state))
        .route(&format!("{}/:key", ENDPOINT_READ), get(handle_dirty_read))
        // Public client + admin routes
        .route(ENDPOINT_KV_LOCK, post(handle_kv_lock))
        .route(ENDPOINT_KV_RELEASE, post(handle_kv_release))
        .route(ENDPOINT_KV_EXTEND_LEASE, post(handle_kv_extend_lease))
        .route(ENDPOINT_ADMIN_SET_NODES, post(handle_admin_set_nodes))
        .route(ENDPOINT_ADMIN_SET_W, post(handle_admin_set_w))
        .route(ENDPOINT_ADMIN_REMOVE_NODE, post(handle_admin_remove_node))
        .route(ENDPOINT_HEALTH_STATS, get(handle_stats))
        .layer(Extension(replica))
        .layer(Extension(coordinator))
}

#[derive(Serialize)]
struct NodeStatsResponse {
    node_id: String,
    primaries: usize,
    replicas: usize,
    w: usize,
    store_entries: usize,
    active_locks: usize,
    lock_sweeps: u64,
    lease_sweeps: u64,
    cpu_usage: f32,
    mem_used_mb: u64,
    mem_total_mb: u64,
}

async fn handle_stats(
    Extension(replica): Extension<ReplicaHandle>,
    Extension(coordinator): Extension<Arc<Coordinator>>,
) -> Json<NodeStatsResponse> {
    let membership = replica.get_nodes().await;
    let debug = replica.debug_state().await;

    let mut sys = System::new_all();
    sys.refresh_cpu();
    sys.refresh_memory();
    let cpu_usage = sys.global_cpu_info().cpu_usage();
    // sysinfo returns bytes for memory values.
    let mem_total_mb = sys.total_memory() / (1024 * 1024);
    let mem_used_mb = sys.used_memory() / (1024 * 1024);

    Json(NodeStatsResponse {
        node_id: coordinator.self_id().0.clone(),
        primaries: membership.primaries.len(),
        replicas: membership.replicas.len(),
        w: membership.w,
        store_entries: debug.store.len(),
        active_locks: debug.locks.len(),
        lock_sweeps: debug.lock_sweeps,
        lease_sweeps: debug.lease_sweeps,
        cpu_usage,
        mem_used_mb,
        mem_total_mb,
    })
}
