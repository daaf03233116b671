//! The single-writer serializer.
//!
//! One background task owns the `ReplicaState` and drains a command channel;
//! the two sweepers are just periodic branches of the same `select!` loop,
//! so they observe consistent snapshots and never race a request handler.
//!
//! `ReplicaHandle` is the cloneable façade handed to the HTTP handlers and
//! the local coordinator. Every call enqueues one command and awaits its
//! oneshot reply.

use super::protocol::DebugStateReply;
use super::state::ReplicaState;
use super::types::{
    ExtendStatus, Key, LockStatus, ReleaseLockStatus, ReleaseStatus, SweepConfig, Tag, Value,
    now_ms,
};
use crate::cluster::types::{Membership, NodeId};

use tokio::sync::{mpsc, oneshot};

enum Command {
    GetWriteLock {
        key: Key,
        expected: Option<Value>,
        tag: Tag,
        reply: oneshot::Sender<LockStatus>,
    },
    ReleaseWriteLock {
        tag: Tag,
        reply: oneshot::Sender<ReleaseLockStatus>,
    },
    Write {
        tag: Tag,
        key: Key,
        value: Value,
        lease_length_ms: u64,
        reply: oneshot::Sender<()>,
    },
    Release {
        key: Key,
        value: Value,
        tag: Tag,
        reply: oneshot::Sender<ReleaseStatus>,
    },
    ExtendLease {
        tag: Tag,
        key: Key,
        value: Value,
        extend_length_ms: u64,
        reply: oneshot::Sender<ExtendStatus>,
    },
    DirtyRead {
        key: Key,
        reply: oneshot::Sender<Option<Value>>,
    },
    SetNodes {
        primaries: Vec<NodeId>,
        replicas: Vec<NodeId>,
        reply: oneshot::Sender<()>,
    },
    SetW {
        w: usize,
        reply: oneshot::Sender<()>,
    },
    RemoveNode {
        node: NodeId,
        reply: oneshot::Sender<()>,
    },
    GetNodes {
        reply: oneshot::Sender<Membership>,
    },
    DebugState {
        reply: oneshot::Sender<DebugStateReply>,
    },
}

/// Cloneable handle to the serializer task.
#[derive(Clone)]
pub struct ReplicaHandle {
    tx: mpsc::Sender<Command>,
}

impl ReplicaHandle {
    /// Start the serializer for `self_id` with an initial topology view and
    /// spawn its sweep timers.
    pub fn spawn(self_id: NodeId, membership: Membership, sweep: SweepConfig) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let state = ReplicaState::new(self_id, membership);
        tokio::spawn(run(state, rx, sweep));
        Self { tx }
    }

    pub async fn get_write_lock(&self, key: Key, expected: Option<Value>, tag: Tag) -> LockStatus {
        self.call(|reply| Command::GetWriteLock {
            key,
            expected,
            tag,
            reply,
        })
        .await
    }

    pub async fn release_write_lock(&self, tag: Tag) -> ReleaseLockStatus {
        self.call(|reply| Command::ReleaseWriteLock { tag, reply }).await
    }

    pub async fn write(&self, tag: Tag, key: Key, value: Value, lease_length_ms: u64) {
        self.call(|reply| Command::Write {
            tag,
            key,
            value,
            lease_length_ms,
            reply,
        })
        .await
    }

    pub async fn release(&self, key: Key, value: Value, tag: Tag) -> ReleaseStatus {
        self.call(|reply| Command::Release {
            key,
            value,
            tag,
            reply,
        })
        .await
    }

    pub async fn extend_lease(
        &self,
        tag: Tag,
        key: Key,
        value: Value,
        extend_length_ms: u64,
    ) -> ExtendStatus {
        self.call(|reply| Command::ExtendLease {
            tag,
            key,
            value,
            extend_length_ms,
            reply,
        })
        .await
    }

    pub async fn dirty_read(&self, key: Key) -> Option<Value> {
        self.call(|reply| Command::DirtyRead { key, reply }).await
    }

    pub async fn set_nodes(&self, primaries: Vec<NodeId>, replicas: Vec<NodeId>) {
        self.call(|reply| Command::SetNodes {
            primaries,
            replicas,
            reply,
        })
        .await
    }

    pub async fn set_w(&self, w: usize) {
        self.call(|reply| Command::SetW { w, reply }).await
    }

    pub async fn remove_node(&self, node: NodeId) {
        self.call(|reply| Command::RemoveNode { node, reply }).await
    }

    pub async fn get_nodes(&self) -> Membership {
        self.call(|reply| Command::GetNodes { reply }).await
    }

    pub async fn debug_state(&self) -> DebugStateReply {
        self.call(|reply| Command::DebugState { reply }).await
    }

    /// Enqueue one command and wait for its reply. The serializer outlives
    /// every handle, so a dead channel is a programming error, not a runtime
    /// condition.
    async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> T {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .expect("replica serializer terminated");
        reply_rx.await.expect("replica serializer dropped a reply")
    }
}

async fn run(mut state: ReplicaState, mut rx: mpsc::Receiver<Command>, sweep: SweepConfig) {
    let mut lock_sweep = tokio::time::interval(sweep.lock_sweep);
    let mut lease_sweep = tokio::time::interval(sweep.lease_sweep);

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(command) => apply(&mut state, command),
                // Every handle dropped: the node is shutting down.
                None => break,
            },
            _ = lock_sweep.tick() => state.sweep_locks(now_ms()),
            _ = lease_sweep.tick() => state.sweep_leases(now_ms()),
        }
    }
}

fn apply(state: &mut ReplicaState, command: Command) {
    // One clock reading per message; all comparisons within the operation
    // see the same instant.
    let now = now_ms();

    match command {
        Command::GetWriteLock {
            key,
            expected,
            tag,
            reply,
        } => {
            let _ = reply.send(state.get_write_lock(key, expected, tag, now));
        }
        Command::ReleaseWriteLock { tag, reply } => {
            let _ = reply.send(state.release_write_lock(&tag));
        }
        Command::Write {
            tag,
            key,
            value,
            lease_length_ms,
            reply,
        } => {
            state.write(&tag, key, value, lease_length_ms, now);
            let _ = reply.send(());
        }
        Command::Release {
            key,
            value,
            tag,
            reply,
        } => {
            let _ = reply.send(state.release(&key, &value, &tag));
        }
        Command::ExtendLease {
            tag,
            key,
            value,
            extend_length_ms,
            reply,
        } => {
            let _ = reply.send(state.extend_lease(&tag, key, value, extend_length_ms, now));
        }
        Command::DirtyRead { key, reply } => {
            let _ = reply.send(state.dirty_read(&key));
        }
        Command::SetNodes {
            primaries,
            replicas,
            reply,
        } => {
            state.set_nodes(primaries, replicas);
            let _ = reply.send(());
        }
        Command::SetW { w, reply } => {
            state.set_w(w);
            let _ = reply.send(());
        }
        Command::RemoveNode { node, reply } => {
            state.remove_node(&node);
            let _ = reply.send(());
        }
        Command::GetNodes { reply } => {
            let _ = reply.send(state.membership());
        }
        Command::DebugState { reply } => {
            let _ = reply.send(state.snapshot());
        }
    }
}
