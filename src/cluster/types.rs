use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Unique identifier for a node in the cluster.
/// Wrapper around the node's HTTP address string, which is what every other
/// node needs in order to reach it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn from_addr(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }

    /// The address used to build `http://{addr}/...` request URLs.
    pub fn http_addr(&self) -> &str {
        &self.0
    }
}

/// The locally known cluster topology.
///
/// Installed wholesale by `set_nodes` and adjusted by `set_w` /
/// `remove_node`. Primaries vote in phase 1 of a write; replicas receive
/// phase-2 commits and serve dirty reads but never vote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    /// Nodes that participate in write quorums, in install order.
    pub primaries: Vec<NodeId>,
    /// Nodes that receive commits but do not vote.
    pub replicas: Vec<NodeId>,
    /// Minimum number of primary OKs required in phase 1. Always >= 1.
    pub w: usize,
}

impl Membership {
    /// A single-node view: `node` is the only primary, W = 1.
    pub fn solo(node: NodeId) -> Self {
        Self {
            primaries: vec![node],
            replicas: Vec::new(),
            w: 1,
        }
    }

    /// Primaries followed by replicas, deduplicated, preserving order.
    /// This is the phase-2 broadcast set.
    pub fn all_members(&self) -> Vec<NodeId> {
        let mut members = self.primaries.clone();
        for replica in &self.replicas {
            if !members.contains(replica) {
                members.push(replica.clone());
            }
        }
        members
    }
}
