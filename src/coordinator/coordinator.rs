use super::protocol::WriteSummary;
use crate::cluster::types::{Membership, NodeId};
use crate::replica::handle::ReplicaHandle;
use crate::replica::protocol::{
    AckReply, ENDPOINT_EXTEND_LEASE, ENDPOINT_GET_WRITE_LOCK, ENDPOINT_RELEASE,
    ENDPOINT_RELEASE_WRITE_LOCK, ENDPOINT_REMOVE_NODE, ENDPOINT_SET_NODES, ENDPOINT_SET_W,
    ENDPOINT_WRITE, ExtendLeaseReply, ExtendLeaseRequest, GetWriteLockReply, GetWriteLockRequest,
    ReleaseReply, ReleaseRequest, ReleaseWriteLockReply, ReleaseWriteLockRequest,
    RemoveNodeRequest, SetNodesRequest, SetWRequest, WriteRequest,
};
use crate::replica::types::{Key, RPC_DEADLINE, Tag, Value};

use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// The single client-visible failure: phase 1 did not reach W OKs.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("quorum not reached: need {needed}, got {got}")]
    NoQuorum { needed: usize, got: usize },
}

pub struct Coordinator {
    self_id: NodeId,
    replica: ReplicaHandle,
    http: reqwest::Client,
}

impl Coordinator {
    pub fn new(self_id: NodeId, replica: ReplicaHandle) -> Self {
        Self {
            self_id,
            replica,
            http: reqwest::Client::new(),
        }
    }

    pub fn self_id(&self) -> &NodeId {
        &self.self_id
    }

    /// Create-if-absent write. Phase 1 requires the key to be missing on
    /// each voting primary, so an existing key fails the precondition and
    /// (usually) the quorum.
    pub async fn lock(
        &self,
        key: Key,
        value: Value,
        lease_length_ms: u64,
    ) -> Result<WriteSummary, CoordinatorError> {
        let membership = self.replica.get_nodes().await;
        let tag = Tag::mint();

        let voted = self.acquire_quorum(&membership, &key, None, &tag).await?;

        let request = WriteRequest {
            tag,
            key,
            value,
            lease_length_ms,
        };
        let replies = self
            .broadcast::<_, AckReply>(&membership.all_members(), ENDPOINT_WRITE, &request)
            .await;
        let committed = replies
            .iter()
            .filter(|(_, reply)| matches!(reply, Some(ack) if ack.ok))
            .count();

        tracing::debug!(
            "Committed {} with {}/{} votes, {} commit ack(s)",
            request.key,
            voted,
            membership.primaries.len(),
            committed
        );

        Ok(WriteSummary {
            w: membership.w,
            voted,
            committed,
        })
    }

    /// Delete. Phase 1 proves ownership by requiring the stored value to
    /// equal `value` on each voting primary.
    pub async fn release(
        &self,
        key: Key,
        value: Value,
    ) -> Result<WriteSummary, CoordinatorError> {
        let membership = self.replica.get_nodes().await;
        let tag = Tag::mint();

        let voted = self
            .acquire_quorum(&membership, &key, Some(value.clone()), &tag)
            .await?;

        let request = ReleaseRequest { key, value, tag };
        let replies = self
            .broadcast::<_, ReleaseReply>(&membership.all_members(), ENDPOINT_RELEASE, &request)
            .await;
        let committed = replies
            .iter()
            .filter(|(_, reply)| matches!(reply, Some(r) if r.status.is_ok()))
            .count();

        Ok(WriteSummary {
            w: membership.w,
            voted,
            committed,
        })
    }

    /// Renew the lease on an owned key across the cluster. Also the path by
    /// which a late-joining replica receives the entry at all.
    ///
    /// Unlike `write`, a failed `extend_lease` on a node leaves that node's
    /// phase-1 lock unconsumed, so every non-OK phase-2 member gets an
    /// explicit `release_write_lock`. The sweeper would catch those locks
    /// anyway; the cleanup just shortens the window.
    pub async fn extend_lease(
        &self,
        key: Key,
        value: Value,
        extend_length_ms: u64,
    ) -> Result<(), CoordinatorError> {
        let membership = self.replica.get_nodes().await;
        let tag = Tag::mint();

        self.acquire_quorum(&membership, &key, Some(value.clone()), &tag)
            .await?;

        let request = ExtendLeaseRequest {
            tag: tag.clone(),
            key,
            value,
            extend_length_ms,
        };
        let replies = self
            .broadcast::<_, ExtendLeaseReply>(
                &membership.all_members(),
                ENDPOINT_EXTEND_LEASE,
                &request,
            )
            .await;

        let stragglers: Vec<NodeId> = replies
            .into_iter()
            .filter(|(_, reply)| !matches!(reply, Some(r) if r.status.is_ok()))
            .map(|(node, _)| node)
            .collect();
        if !stragglers.is_empty() {
            tracing::warn!(
                "Lease extension missed {} node(s); releasing their locks",
                stragglers.len()
            );
            self.abort_locks(&stragglers, &tag).await;
        }

        Ok(())
    }

    /// Install the primary/replica sets on every node in `cluster`.
    /// Topology installs are administrative and must land everywhere.
    pub async fn set_nodes(
        &self,
        cluster: &[NodeId],
        primaries: Vec<NodeId>,
        replicas: Vec<NodeId>,
    ) -> Result<()> {
        let request = SetNodesRequest {
            primaries,
            replicas,
        };
        let replies = self
            .broadcast::<_, AckReply>(cluster, ENDPOINT_SET_NODES, &request)
            .await;
        ensure_all_acked(replies, "set_nodes")
    }

    /// Install a new quorum size on every node in `cluster`.
    pub async fn set_w(&self, cluster: &[NodeId], w: usize) -> Result<()> {
        let request = SetWRequest { w };
        let replies = self
            .broadcast::<_, AckReply>(cluster, ENDPOINT_SET_W, &request)
            .await;
        ensure_all_acked(replies, "set_w")
    }

    /// Drop `node` from the local primary set and, unless this call is
    /// itself the reciprocal hop, tell the removed node to drop us too.
    pub async fn remove_node(&self, node: NodeId, reciprocal: bool) -> Result<()> {
        self.replica.remove_node(node.clone()).await;

        if !reciprocal {
            let request = RemoveNodeRequest {
                node: self.self_id.clone(),
                reciprocal: true,
            };
            if self
                .post_rpc::<_, AckReply>(&node, ENDPOINT_REMOVE_NODE, &request)
                .await
                .is_none()
            {
                tracing::warn!(
                    "Removed node {} did not acknowledge the reciprocal removal",
                    node.http_addr()
                );
            }
        }

        Ok(())
    }

    /// Phase 1: lock the key on all primaries and count the OKs.
    ///
    /// On a failed quorum the acquired locks are released best-effort; a
    /// node we cannot reach for the release will drop its lock through the
    /// sweeper within the lock TTL.
    async fn acquire_quorum(
        &self,
        membership: &Membership,
        key: &Key,
        expected: Option<Value>,
        tag: &Tag,
    ) -> Result<usize, CoordinatorError> {
        let request = GetWriteLockRequest {
            key: key.clone(),
            expected,
            tag: tag.clone(),
        };
        let votes = self
            .broadcast::<_, GetWriteLockReply>(
                &membership.primaries,
                ENDPOINT_GET_WRITE_LOCK,
                &request,
            )
            .await;
        let voted = votes
            .iter()
            .filter(|(_, reply)| matches!(reply, Some(r) if r.status.is_ok()))
            .count();

        if voted >= membership.w {
            Ok(voted)
        } else {
            tracing::info!(
                "No quorum for {}: {}/{} primaries voted OK (need {})",
                key,
                voted,
                membership.primaries.len(),
                membership.w
            );
            self.abort_locks(&membership.primaries, tag).await;
            Err(CoordinatorError::NoQuorum {
                needed: membership.w,
                got: voted,
            })
        }
    }

    async fn abort_locks(&self, nodes: &[NodeId], tag: &Tag) {
        let request = ReleaseWriteLockRequest { tag: tag.clone() };
        // Best-effort; replies (Ok or LockExpired alike) mean "released".
        self.broadcast::<_, ReleaseWriteLockReply>(nodes, ENDPOINT_RELEASE_WRITE_LOCK, &request)
            .await;
    }

    /// Fan one request out to every node in parallel, pairing each node
    /// with its reply. `None` covers timeouts, transport errors, and
    /// malformed replies alike; the quorum logic only distinguishes OK
    /// from everything else.
    async fn broadcast<Req, Rep>(
        &self,
        nodes: &[NodeId],
        endpoint: &str,
        request: &Req,
    ) -> Vec<(NodeId, Option<Rep>)>
    where
        Req: Serialize,
        Rep: DeserializeOwned,
    {
        let calls = nodes.iter().map(|node| {
            let node = node.clone();
            async move {
                let reply = self.post_rpc::<Req, Rep>(&node, endpoint, request).await;
                (node, reply)
            }
        });
        join_all(calls).await
    }

    async fn post_rpc<Req, Rep>(&self, node: &NodeId, endpoint: &str, request: &Req) -> Option<Rep>
    where
        Req: Serialize,
        Rep: DeserializeOwned,
    {
        let url = format!("http://{}{}", node.http_addr(), endpoint);
        match self
            .http
            .post(url)
            .json(request)
            .timeout(RPC_DEADLINE)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                match response.json::<Rep>().await {
                    Ok(reply) => Some(reply),
                    Err(e) => {
                        tracing::warn!(
                            "Malformed reply from {} on {}: {}",
                            node.http_addr(),
                            endpoint,
                            e
                        );
                        None
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(
                    "{} answered {} on {}",
                    node.http_addr(),
                    response.status(),
                    endpoint
                );
                None
            }
            Err(e) => {
                tracing::debug!("{} unreachable on {}: {}", node.http_addr(), endpoint, e);
                None
            }
        }
    }
}

fn ensure_all_acked(replies: Vec<(NodeId, Option<AckReply>)>, operation: &str) -> Result<()> {
    let failed: Vec<String> = replies
        .into_iter()
        .filter(|(_, reply)| !matches!(reply, Some(ack) if ack.ok))
        .map(|(node, _)| node.0)
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} was not acknowledged by: {}", operation, failed.join(", "))
    }
}
