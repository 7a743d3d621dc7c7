//! # parlor-replica: leader/follower replication and failover
//!
//! Owns the shared per-node state ([`Node`]), the leader's fan-out worker,
//! the follower's bootstrap/resync/promotion logic, the peer-RPC dispatch
//! that serves both roles from one listener, and the heartbeat/election
//! loop that drives failover.

mod config;
mod error;
mod fanout;
mod follower;
mod heartbeat;
mod node;
mod peer_client;
mod peer;
mod queue;

pub use config::ReplicationConfig;
pub use error::{ReplicaError, Result};
pub use fanout::run_fanout_loop;
pub use follower::{promote_self, register_with_leader};
pub use heartbeat::run_heartbeat_loop;
pub use node::{LeaderPointer, Node, PeerSet, Role};
pub use peer::handle_peer_request;
pub use peer_client::call_peer;
pub use queue::UpdateQueue;
