//! Follower-side heartbeat probing and the deterministic minimum-id
//! election described in the design notes.

use std::sync::Arc;

use parlor_types::NodeId;
use parlor_wire::{PeerRequest, PeerResponse};
use tracing::{info, warn};

use crate::follower::promote_self;
use crate::node::{Node, Role};
use crate::peer_client::call_peer;

/// Runs the heartbeat loop until the local node becomes leader (at which
/// point the caller's responsibility shifts to the fan-out worker) or the
/// task is aborted by its caller at shutdown.
pub async fn run_heartbeat_loop(node: Arc<Node>) {
    loop {
        if node.role() == Role::Leader {
            return;
        }
        tokio::time::sleep(node.config.heartbeat_interval).await;
        if node.role() != Role::Follower {
            // Resyncing/Promoting: a transition owns the role right now,
            // skip this tick rather than racing it.
            continue;
        }

        let leader = node.leader_snapshot();
        if probe_leader(&node, &leader.leader_address).await {
            continue;
        }

        warn!(leader = %leader.leader_id, "leader heartbeat failed, starting election");
        run_election(&node).await;
    }
}

async fn probe_leader(node: &Arc<Node>, leader_address: &str) -> bool {
    for attempt in 0..=node.config.heartbeat_retries {
        match call_peer(leader_address, PeerRequest::HeartBeat, node.config.peer_timeout).await {
            Ok(PeerResponse::Ack) => return true,
            Ok(other) => warn!(?other, attempt, "unexpected heartbeat response"),
            Err(e) => warn!(error = %e, attempt, "heartbeat attempt failed"),
        }
    }
    false
}

/// Runs one round of the election protocol: determine the candidate with
/// the smallest id, self-promote if it is the local node, otherwise wait
/// and verify the presumed winner before adopting it.
async fn run_election(node: &Arc<Node>) {
    let candidates = node.election_candidates();
    let Some(&winner) = candidates.first() else {
        // peer_set is empty and somehow so is self — unreachable in
        // practice since self is always pushed onto the candidate list.
        return;
    };

    if winner == node.self_id {
        info!(node_id = %node.self_id, "won the election, promoting self");
        if let Err(e) = promote_self(node).await {
            warn!(error = %e, "promotion failed");
        }
        return;
    }

    info!(winner = %winner, "waiting to verify the presumed new leader before adopting it");
    tokio::time::sleep(node.config.election_settle).await;

    let Some(winner_address) = peer_address_for(node, winner) else {
        warn!(winner = %winner, "presumed winner is no longer a known peer, re-electing");
        return;
    };

    match call_peer(&winner_address, PeerRequest::CheckLeader, node.config.peer_timeout).await {
        Ok(PeerResponse::Ack) => {
            info!(winner = %winner, "presumed winner confirmed itself as leader, adopting");
            node.set_leader(winner, winner_address);
        }
        _ => {
            warn!(winner = %winner, "presumed winner did not confirm, removing it from the peer set");
            node.peer_set.remove(winner);
        }
    }
}

fn peer_address_for(node: &Arc<Node>, id: NodeId) -> Option<String> {
    node.peer_set
        .snapshot()
        .into_iter()
        .find(|m| m.node_id == id)
        .map(|m| m.peer_address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplicationConfig;
    use parlor_store::{MemoryStore, Store};
    use parlor_types::ClusterMember;

    #[tokio::test]
    async fn election_promotes_self_when_self_has_the_smallest_id() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let node = Node::new_follower(
            NodeId::new(1),
            "127.0.0.1:0".into(),
            "127.0.0.1:0".into(),
            NodeId::new(9),
            "127.0.0.1:1".into(),
            store,
            ReplicationConfig::default(),
        );
        node.peer_set
            .insert(ClusterMember::new(NodeId::new(5), "127.0.0.1:2".into()), node.self_id);

        run_election(&node).await;

        assert_eq!(node.role(), Role::Leader);
        assert_eq!(node.leader_snapshot().leader_id, NodeId::new(1));
    }

    #[tokio::test]
    async fn election_removes_an_unconfirmed_winner_from_the_peer_set() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let node = Node::new_follower(
            NodeId::new(9),
            "127.0.0.1:0".into(),
            "127.0.0.1:0".into(),
            NodeId::new(99),
            "127.0.0.1:1".into(),
            store,
            ReplicationConfig {
                election_settle: std::time::Duration::from_millis(5),
                peer_timeout: std::time::Duration::from_millis(20),
                ..ReplicationConfig::default()
            },
        );
        // Node 2 is the minimum and unreachable on this closed port.
        node.peer_set
            .insert(ClusterMember::new(NodeId::new(2), "127.0.0.1:1".into()), node.self_id);

        run_election(&node).await;

        assert_eq!(node.role(), Role::Follower);
        assert_eq!(node.peer_set.len(), 0);
    }
}
