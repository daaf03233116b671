//! Cluster Topology Module
//!
//! Holds the administratively installed view of the cluster: which nodes
//! participate in write quorums (primaries), which only receive commits and
//! serve dirty reads (replicas), and the quorum size W.
//!
//! There is no discovery and no failure detection here. Topology changes
//! arrive as explicit `set_nodes` / `set_w` / `remove_node` operations and
//! are applied on each node's serializer.

pub mod types;

#[cfg(test)]
mod tests;
