use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Keys are opaque externally supplied strings.
pub type Key = String;

/// Values are opaque JSON documents. Equality on `serde_json::Value` is what
/// the lock preconditions and ownership checks compare with.
///
/// The "no entry" precondition is expressed as `Option<Value>::None` at the
/// API boundary, so a stored entry always holds a real value.
pub type Value = serde_json::Value;

/// Per-call deadline for every inter-node RPC.
pub const RPC_DEADLINE: Duration = Duration::from_millis(1000);

/// How long a granted write lock survives without being consumed.
pub const WRITE_LOCK_TTL_MS: u64 = 1000;

/// Lease length applied when a client does not ask for one explicitly.
pub const DEFAULT_LEASE_MS: u64 = 2000;

/// Globally unique token minted once per coordinator attempt.
/// Correlates phase-1 lock acquisitions with the phase-2 commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    pub fn mint() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// A stored value and its lease.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreEntry {
    pub value: Value,
    /// Absolute expiry in epoch milliseconds. Once passed, the lease sweeper
    /// removes the entry (unless the key is currently locked).
    pub lease_expiry_ms: u64,
}

/// An active per-key write lock.
///
/// At most one lock per key exists on a node at any moment. Consumed by the
/// phase-2 operation carrying the same tag, or reclaimed by the lock sweeper
/// after `WRITE_LOCK_TTL_MS`.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteLock {
    pub tag: Tag,
    pub key: Key,
    /// The value precondition the lock was granted under. `None` means the
    /// key was required to be absent.
    pub expected: Option<Value>,
    pub acquired_ms: u64,
}

/// Sweeper cadence. The defaults are the protocol values; tests compress
/// them to keep wall-clock time down.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub lock_sweep: Duration,
    pub lease_sweep: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            lock_sweep: Duration::from_millis(1000),
            lease_sweep: Duration::from_millis(10_000),
        }
    }
}

/// Reply to `get_write_lock`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    Ok,
    AlreadyLocked,
    NotExpectedValue,
}

/// Reply to `release_write_lock`. `LockExpired` covers both a sweeper
/// reclaim and a lock already consumed by phase 2; callers treat either as
/// "released".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseLockStatus {
    Ok,
    LockExpired,
}

/// Reply to the phase-2 `release` (delete).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Ok,
    NotOwner,
    NotFound,
}

/// Reply to the phase-2 `extend_lease`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtendStatus {
    Ok,
    NotOwner,
    NotFound,
}

impl LockStatus {
    pub fn is_ok(self) -> bool {
        self == LockStatus::Ok
    }
}

impl ReleaseStatus {
    pub fn is_ok(self) -> bool {
        self == ReleaseStatus::Ok
    }
}

impl ExtendStatus {
    pub fn is_ok(self) -> bool {
        self == ExtendStatus::Ok
    }
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
