//! Dispatch for the cluster (peer) service.
//!
//! A single handler serves both roles: which [`PeerRequest`] variants are
//! accepted depends on [`Node::role`] at the moment the call lands, since
//! promotion and resync swap the role in place rather than rebinding a
//! listener.

use std::sync::Arc;

use parlor_wire::{PeerRequest, PeerResponse};
use tracing::{instrument, warn};

use crate::follower::{accept_peer_announcement, handle_update_leader, snapshot_bytes};
use crate::node::{Node, Role};
use crate::peer_client::call_peer;

#[instrument(skip_all, fields(self_id = %node.self_id, role = ?node.role()))]
pub async fn handle_peer_request(node: &Arc<Node>, request: PeerRequest) -> PeerResponse {
    match request {
        PeerRequest::RegisterFollower {
            follower_id,
            follower_address,
        } => handle_register_follower(node, follower_id, follower_address).await,
        PeerRequest::HeartBeat | PeerRequest::CheckLeader => {
            if node.role() == Role::Leader {
                PeerResponse::Ack
            } else {
                PeerResponse::Error("not leader".to_string())
            }
        }
        PeerRequest::AcceptUpdates { event_bytes } => {
            // Always acks, even on a decode/apply failure: delivery is
            // at-most-once and never retried, so a poisoned event must not
            // block the leader's fan-out of subsequent events.
            match parlor_wire::decode_event(&event_bytes) {
                Ok(event) => {
                    if let Err(e) = node.store.apply_event(&event) {
                        warn!(error = %e, "failed to apply replicated event");
                    }
                }
                Err(e) => warn!(error = %e, "failed to decode replicated event"),
            }
            PeerResponse::Ack
        }
        PeerRequest::UpdateLeader {
            new_leader_id,
            new_leader_address,
        } => {
            handle_update_leader(node, new_leader_id, new_leader_address).await;
            PeerResponse::Ack
        }
        PeerRequest::UpdateFollowers { member } => {
            accept_peer_announcement(node, member);
            PeerResponse::Ack
        }
    }
}

async fn handle_register_follower(
    node: &Arc<Node>,
    follower_id: parlor_types::NodeId,
    follower_address: String,
) -> PeerResponse {
    if node.role() != Role::Leader {
        return PeerResponse::Error("not leader".to_string());
    }

    let member = parlor_types::ClusterMember::new(follower_id, follower_address.clone());
    node.peer_set.insert(member.clone(), node.self_id);

    // Notify every other known follower about the new member before
    // answering the registrant, matching the leader's synchronous
    // notify-then-reply ordering.
    let others: Vec<_> = node
        .peer_set
        .snapshot()
        .into_iter()
        .filter(|m| m.node_id != follower_id)
        .collect();
    for peer in &others {
        let request = PeerRequest::UpdateFollowers {
            member: member.clone(),
        };
        if call_peer(&peer.peer_address, request, node.config.peer_timeout)
            .await
            .is_err()
        {
            warn!(peer = %peer.node_id, "failed to notify peer of new follower");
        }
    }

    match snapshot_bytes(node) {
        Ok(snapshot_bytes) => PeerResponse::RegisterFollowerOk {
            snapshot_bytes,
            other_followers: others,
        },
        Err(e) => PeerResponse::Error(e.to_string()),
    }
}
