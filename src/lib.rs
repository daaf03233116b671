//! Distributed Quorum Key-Value Store Library
//!
//! This library crate defines the core modules that make up the store.
//! It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of four loosely coupled subsystems:
//!
//! - **`cluster`**: The administratively installed cluster topology: node
//!   identities, the primary and replica sets, and the write quorum size W.
//! - **`replica`**: The per-node state machine. A single-writer serializer
//!   owns the in-memory store, the per-key write-lock table, and the two
//!   periodic sweepers (lock expiry, lease expiry).
//! - **`coordinator`**: The client-facing write path. Drives the two-phase
//!   quorum protocol (lock a write quorum of primaries, then broadcast the
//!   commit) and the administrative topology broadcasts.
//! - **`node`**: Glues a replica and a coordinator behind one HTTP router
//!   and boots the whole thing on a listener.

pub mod cluster;
pub mod coordinator;
pub mod node;
pub mod replica;
