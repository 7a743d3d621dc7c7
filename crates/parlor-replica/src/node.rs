//! Shared per-process replica state.
//!
//! A single [`Node`] is constructed at startup and shared (via [`Arc`])
//! between the client-facing handler, the peer-facing handler, the fan-out
//! worker and the heartbeat/election loop. Every field group is guarded by
//! its own short-lived lock; callers snapshot and release before making any
//! outbound call, so an in-flight peer RPC never holds `peer_set` or
//! `leader` locked.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use parlor_store::Store;
use parlor_types::{ClusterMember, NodeId};

use crate::config::ReplicationConfig;
use crate::queue::UpdateQueue;

/// The node's current position in the state machine described in the
/// design notes (`FOLLOWER -> PROMOTING -> LEADER`, `FOLLOWER -> RESYNCING
/// -> FOLLOWER`, `LEADER` terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Follower,
    Promoting,
    Leader,
    Resyncing,
}

/// Thread-safe registry of known cluster peers, excluding the local node.
#[derive(Debug, Default)]
pub struct PeerSet {
    members: Mutex<Vec<ClusterMember>>,
}

impl PeerSet {
    /// Returns a point-in-time copy, safe to iterate after the lock is
    /// released (P5: the local node is never present).
    pub fn snapshot(&self) -> Vec<ClusterMember> {
        self.members.lock().unwrap().clone()
    }

    /// Inserts `member` unless it is already present or names the local
    /// node, satisfying P5.
    pub fn insert(&self, member: ClusterMember, local_id: NodeId) {
        if member.node_id == local_id {
            return;
        }
        let mut members = self.members.lock().unwrap();
        if !members.iter().any(|m| m.node_id == member.node_id) {
            members.push(member);
        }
    }

    pub fn remove(&self, node_id: NodeId) {
        self.members.lock().unwrap().retain(|m| m.node_id != node_id);
    }

    pub fn replace(&self, members: Vec<ClusterMember>) {
        *self.members.lock().unwrap() = members;
    }

    pub fn len(&self) -> usize {
        self.members.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().unwrap().is_empty()
    }
}

/// Who the local node currently believes is the leader.
#[derive(Debug, Clone)]
pub struct LeaderPointer {
    pub leader_id: NodeId,
    pub leader_address: String,
}

/// Shared handle every task and RPC handler operates on.
pub struct Node {
    pub self_id: NodeId,
    pub self_peer_address: String,
    pub self_client_address: String,
    pub store: Arc<dyn Store>,
    pub peer_set: PeerSet,
    pub leader: Mutex<LeaderPointer>,
    pub role: Mutex<Role>,
    pub queue: Arc<UpdateQueue>,
    pub config: ReplicationConfig,
    /// Guards promotion/resync so a second concurrent trigger is a no-op
    /// (R3, and the idempotent-promotion guarantee in the design notes).
    transitioning: AtomicBool,
}

impl Node {
    pub fn new_leader(
        self_id: NodeId,
        self_peer_address: String,
        self_client_address: String,
        store: Arc<dyn Store>,
        config: ReplicationConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            leader: Mutex::new(LeaderPointer {
                leader_id: self_id,
                leader_address: self_peer_address.clone(),
            }),
            self_id,
            self_peer_address,
            self_client_address,
            store,
            peer_set: PeerSet::default(),
            role: Mutex::new(Role::Leader),
            queue: UpdateQueue::new(),
            config,
            transitioning: AtomicBool::new(false),
        })
    }

    pub fn new_follower(
        self_id: NodeId,
        self_peer_address: String,
        self_client_address: String,
        leader_id: NodeId,
        leader_address: String,
        store: Arc<dyn Store>,
        config: ReplicationConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            self_id,
            self_peer_address,
            self_client_address,
            store,
            peer_set: PeerSet::default(),
            leader: Mutex::new(LeaderPointer {
                leader_id,
                leader_address,
            }),
            role: Mutex::new(Role::Follower),
            queue: UpdateQueue::new(),
            config,
            transitioning: AtomicBool::new(false),
        })
    }

    pub fn role(&self) -> Role {
        *self.role.lock().unwrap()
    }

    pub fn set_role(&self, role: Role) {
        *self.role.lock().unwrap() = role;
    }

    pub fn leader_snapshot(&self) -> LeaderPointer {
        self.leader.lock().unwrap().clone()
    }

    pub fn set_leader(&self, leader_id: NodeId, leader_address: String) {
        *self.leader.lock().unwrap() = LeaderPointer {
            leader_id,
            leader_address,
        };
    }

    /// Attempts to begin a promotion or resync. Returns `false` if one is
    /// already in progress, so the caller should treat the trigger as a
    /// no-op rather than racing a second transition.
    pub fn begin_transition(&self) -> bool {
        self.transitioning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_transition(&self) {
        self.transitioning.store(false, Ordering::SeqCst);
    }

    /// The candidate set for an election: every known peer plus the local
    /// node, per the design notes' `candidates = peer_set ∪ {self}`.
    pub fn election_candidates(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.peer_set.snapshot().into_iter().map(|m| m.node_id).collect();
        ids.push(self.self_id);
        ids.sort_unstable();
        ids
    }
}
