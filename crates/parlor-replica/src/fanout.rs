//! The leader's fan-out worker: one event at a time, one follower at a time,
//! best-effort, never retried.

use std::sync::Arc;

use parlor_wire::{encode_event, PeerRequest};
use tracing::warn;

use crate::node::Node;
use crate::peer_client::call_peer;

/// Runs until `node` stops being the leader or the task is aborted by its
/// caller. Dequeues one event, delivers it to every current peer, then
/// either waits for the next push or the idle poll interval, whichever
/// comes first.
pub async fn run_fanout_loop(node: Arc<Node>) {
    loop {
        if node.role() != crate::node::Role::Leader {
            return;
        }
        match node.queue.try_pop() {
            Some(event) => {
                deliver_to_all_peers(&node, &event).await;
            }
            None => {
                node.queue.wait_for_push(node.config.fanout_poll_interval).await;
            }
        }
    }
}

async fn deliver_to_all_peers(node: &Arc<Node>, event: &parlor_store::MutationEvent) {
    let event_bytes = match encode_event(event) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "failed to encode event for fan-out, dropping it");
            return;
        }
    };
    for peer in node.peer_set.snapshot() {
        let request = PeerRequest::AcceptUpdates {
            event_bytes: event_bytes.clone(),
        };
        if let Err(e) = call_peer(&peer.peer_address, request, node.config.peer_timeout).await {
            warn!(peer = %peer.node_id, error = %e, "fan-out to follower failed, continuing with the rest of the peer set");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplicationConfig;
    use crate::node::Node;
    use parlor_store::{MemoryStore, MutationEvent, Op, Row, Store, User};
    use parlor_types::{NodeId, UserId};

    #[tokio::test]
    async fn fanout_loop_exits_once_the_node_is_no_longer_leader() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let node = Node::new_leader(
            NodeId::new(1),
            "127.0.0.1:0".into(),
            "127.0.0.1:0".into(),
            store,
            ReplicationConfig {
                fanout_poll_interval: std::time::Duration::from_millis(10),
                ..ReplicationConfig::default()
            },
        );
        let event = MutationEvent {
            op: Op::Add,
            row: Row::User(User {
                id: UserId::new(1),
                username: "alice".into(),
                password_hash: "h".into(),
                logged_in: false,
                session_id: String::new(),
            }),
        };
        node.queue.push(event);
        node.set_role(crate::node::Role::Follower);
        // No peers are registered, so this should return promptly without
        // ever attempting a network call.
        tokio::time::timeout(std::time::Duration::from_secs(2), run_fanout_loop(node))
            .await
            .unwrap();
    }
}
