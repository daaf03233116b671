//! Replica State Machine Module
//!
//! Implements the per-node half of the protocol: the in-memory store, the
//! per-key write-lock table, and the two periodic sweepers.
//!
//! ## Core Mechanisms
//! - **Single-Writer Serializer**: every operation (and both sweepers) runs
//!   on one actor task that exclusively owns the state. No two handlers ever
//!   execute concurrently on the same replica, which makes each operation
//!   trivially atomic without locks.
//! - **Write Locks**: phase 1 of a write acquires a short-lived per-key lock
//!   with a value precondition. A node grants at most one lock per key, and
//!   the lock sweeper reclaims locks older than the 1 s TTL, so a crashed
//!   coordinator can only stall a key briefly.
//! - **Leases**: every stored value carries an absolute expiry timestamp.
//!   The lease sweeper removes expired entries, except for keys that are
//!   currently locked (a racing commit must not be garbage-collected).
//!
//! ## Submodules
//! - **`types`**: keys, values, tags, lock/store entries, protocol timing.
//! - **`state`**: the synchronous state machine, one method per operation.
//! - **`handle`**: the serializer actor and its cloneable handle.
//! - **`protocol`**: HTTP endpoint constants and DTOs for the node-to-node RPCs.
//! - **`handlers`**: axum handlers translating HTTP requests into handle calls.

pub mod handle;
pub mod handlers;
pub mod protocol;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
