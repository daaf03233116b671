//! Write Coordinator Module
//!
//! Implements the client-facing half of the protocol. Any node can
//! coordinate: it mints a fresh tag, locks the key on a write quorum of
//! primaries (phase 1), then broadcasts the commit to every member
//! (phase 2).
//!
//! ## Architecture Overview
//! 1. **Phase 1**: `get_write_lock` fans out to all primaries in parallel
//!    with a per-call deadline. Timeouts and refusals just count as non-OK.
//! 2. **Quorum check**: fewer than W OKs aborts the attempt; the acquired
//!    locks are released best-effort and the client sees `NoQuorum`.
//! 3. **Phase 2**: the commit (`write` / `release` / `extend_lease`) goes to
//!    primaries and replicas alike. Partial phase-2 success is reported in
//!    the `(voted, committed)` counts, never as an error: any two quorums
//!    intersect, so a later writer is guaranteed to observe the commit.
//!
//! There are no per-node retries inside an attempt and no cross-call state;
//! one coordinator may drive any number of client operations in parallel.
//!
//! ## Submodules
//! - **`coordinator`**: the two-phase procedures and admin broadcasts.
//! - **`protocol`**: client-facing HTTP contracts.
//! - **`handlers`**: axum handlers for the `/kv/*` and `/admin/*` routes.

pub mod coordinator;
pub mod handlers;
pub mod protocol;
