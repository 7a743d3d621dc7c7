//! Follower-side bootstrap, resync and promotion.

use std::sync::Arc;

use parlor_types::{ClusterMember, NodeId};
use tracing::{info, warn};

use crate::error::{ReplicaError, Result};
use crate::fanout::run_fanout_loop;
use crate::node::{Node, Role};
use crate::peer_client::call_peer;

use parlor_wire::{decode_snapshot, encode_snapshot, PeerRequest, PeerResponse};

/// Registers with the leader at `node`'s current `leader` pointer, applies
/// the returned snapshot, and replaces the local peer set with the leader's
/// view of the other followers. Called at startup and after adopting a new
/// leader.
pub async fn register_with_leader(node: &Arc<Node>) -> Result<()> {
    let leader = node.leader_snapshot();
    let request = PeerRequest::RegisterFollower {
        follower_id: node.self_id,
        follower_address: node.self_peer_address.clone(),
    };
    let response = call_peer(&leader.leader_address, request, node.config.peer_timeout).await?;
    match response {
        PeerResponse::RegisterFollowerOk {
            snapshot_bytes,
            other_followers,
        } => {
            let snapshot = decode_snapshot(&snapshot_bytes)?;
            node.store.wipe_and_recreate();
            node.store.load_snapshot(snapshot);
            node.peer_set.replace(other_followers);
            info!(leader = %leader.leader_id, "registered with leader and applied snapshot");
            Ok(())
        }
        PeerResponse::Error(message) => Err(ReplicaError::UnexpectedResponse(message)),
        PeerResponse::Ack => Err(ReplicaError::UnexpectedResponse(
            "leader acked RegisterFollower instead of returning a snapshot".to_string(),
        )),
    }
}

/// Handles an incoming `UpdateLeader` peer call: wipes local state, points
/// at the new leader, and re-registers. A no-op when `new_leader_id` names
/// the local node (R3).
pub async fn handle_update_leader(node: &Arc<Node>, new_leader_id: NodeId, new_leader_address: String) {
    if new_leader_id == node.self_id {
        return;
    }
    if !node.begin_transition() {
        warn!("ignoring UpdateLeader: a transition is already in progress");
        return;
    }
    node.set_role(Role::Resyncing);
    // A follower's peer_set tracks *other followers*, never the current
    // leader; drop the old leader's entry (if it was ever present) before
    // re-registering, which will replace the set wholesale anyway.
    let old_leader = node.leader_snapshot().leader_id;
    node.peer_set.remove(old_leader);
    node.set_leader(new_leader_id, new_leader_address);

    if let Err(e) = register_with_leader(node).await {
        warn!(error = %e, "resync after UpdateLeader failed; will retry on the next heartbeat cycle");
    }

    node.set_role(Role::Follower);
    node.end_transition();
}

/// Promotes the local node to leader in place: reuses the existing store,
/// starts owning the peer set as a leader would, and broadcasts
/// `UpdateLeader` to every known peer.
pub async fn promote_self(node: &Arc<Node>) -> Result<()> {
    if !node.begin_transition() {
        return Ok(());
    }
    node.set_role(Role::Promoting);

    let peers = node.peer_set.snapshot();
    for peer in &peers {
        let request = PeerRequest::UpdateLeader {
            new_leader_id: node.self_id,
            new_leader_address: node.self_peer_address.clone(),
        };
        if call_peer(&peer.peer_address, request, node.config.peer_timeout)
            .await
            .is_err()
        {
            warn!(peer = %peer.node_id, "peer unreachable during promotion broadcast, dropping from peer set");
            node.peer_set.remove(peer.node_id);
        }
    }

    node.set_leader(node.self_id, node.self_peer_address.clone());
    node.set_role(Role::Leader);
    tokio::spawn(run_fanout_loop(Arc::clone(node)));
    node.end_transition();
    info!(node_id = %node.self_id, "promoted to leader");
    Ok(())
}

/// Inserts a newly announced peer into the local peer set unless it names
/// the local node (P5).
pub fn accept_peer_announcement(node: &Arc<Node>, member: ClusterMember) {
    node.peer_set.insert(member, node.self_id);
}

/// Encodes the current store as a snapshot, for `RegisterFollower` replies.
pub fn snapshot_bytes(node: &Arc<Node>) -> Result<Vec<u8>> {
    let snapshot = node.store.snapshot_all();
    Ok(encode_snapshot(&snapshot)?)
}
