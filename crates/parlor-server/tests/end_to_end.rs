//! End-to-end scenarios driven entirely over loopback TCP, exercising the
//! same wire path a real client and a real peer would use.

use std::sync::Arc;
use std::time::Duration;

use parlor_client::{Client, ClientError};
use parlor_replica::{register_with_leader, run_fanout_loop, Node, ReplicationConfig};
use parlor_server::auth::Argon2Hasher;
use parlor_server::handler::ClientContext;
use parlor_server::listener::{run_client_listener, run_peer_listener};
use parlor_store::{MemoryStore, Store};
use parlor_types::{ErrorCode, NodeId};
use tokio::net::TcpListener;

async fn spawn_leader(id: u64) -> (String, String, Arc<Node>) {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let peer_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let peer_addr = peer_listener.local_addr().unwrap().to_string();
    let client_addr = client_listener.local_addr().unwrap().to_string();
    let node = Node::new_leader(
        NodeId::new(id),
        peer_addr.clone(),
        client_addr.clone(),
        store,
        ReplicationConfig::default(),
    );
    tokio::spawn(run_peer_listener(peer_listener, Arc::clone(&node), 20));
    let ctx = Arc::new(ClientContext {
        node: Arc::clone(&node),
        hasher: Arc::new(Argon2Hasher),
    });
    tokio::spawn(run_client_listener(client_listener, ctx, 10));
    tokio::spawn(run_fanout_loop(Arc::clone(&node)));
    (client_addr, peer_addr, node)
}

async fn spawn_follower(id: u64, leader_peer_addr: &str) -> Arc<Node> {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let peer_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let client_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let peer_addr = peer_listener.local_addr().unwrap().to_string();
    let client_addr = client_listener.local_addr().unwrap().to_string();
    let node = Node::new_follower(
        NodeId::new(id),
        peer_addr,
        client_addr,
        NodeId::new(0),
        leader_peer_addr.to_string(),
        store,
        ReplicationConfig::default(),
    );
    tokio::spawn(run_peer_listener(peer_listener, Arc::clone(&node), 20));
    let ctx = Arc::new(ClientContext {
        node: Arc::clone(&node),
        hasher: Arc::new(Argon2Hasher),
    });
    tokio::spawn(run_client_listener(client_listener, ctx, 10));
    register_with_leader(&node).await.unwrap();
    node
}

#[tokio::test]
async fn create_and_login_against_a_lone_leader() {
    let (client_addr, _peer_addr, _node) = spawn_leader(1).await;
    let client = Client::new(vec![client_addr], Duration::from_secs(2));

    client.create_account("alice", "pw").await.unwrap();
    let session = client.login("alice", "pw").await.unwrap();
    assert!(!session.is_empty());

    let err = client.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Server(ErrorCode::IncorrectPassword)
    ));
}

#[tokio::test]
async fn a_message_sent_on_the_leader_replicates_to_the_follower() {
    let (leader_client_addr, leader_peer_addr, _leader_node) = spawn_leader(1).await;
    let follower_node = spawn_follower(2, &leader_peer_addr).await;

    let client = Client::new(vec![leader_client_addr], Duration::from_secs(2));
    client.create_account("alice", "pw").await.unwrap();
    client.create_account("bob", "pw").await.unwrap();
    let session = client.login("alice", "pw").await.unwrap();
    client.send(&session, "bob", "hi").await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let snapshot = follower_node.store.snapshot_all();
    assert_eq!(snapshot.users.len(), 2);
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].content, "hi");
}

#[tokio::test]
async fn send_to_a_nonexistent_user_returns_receiver_doesnt_exist() {
    let (client_addr, _peer_addr, _node) = spawn_leader(1).await;
    let client = Client::new(vec![client_addr], Duration::from_secs(2));

    client.create_account("alice", "pw").await.unwrap();
    let session = client.login("alice", "pw").await.unwrap();
    let err = client.send(&session, "ghost", "hi").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Server(ErrorCode::ReceiverDoesntExist)
    ));
}

#[tokio::test]
async fn a_follower_redirects_every_client_call() {
    let (_leader_client_addr, leader_peer_addr, _leader_node) = spawn_leader(1).await;
    let follower_node = spawn_follower(2, &leader_peer_addr).await;

    let client = Client::new(vec![follower_node.self_client_address.clone()], Duration::from_secs(2));
    let err = client.list_users("*").await.unwrap_err();
    assert!(matches!(err, ClientError::Server(ErrorCode::NotLeader)));
}

#[tokio::test]
async fn client_address_rotation_finds_the_leader_after_a_follower_address() {
    let (leader_client_addr, leader_peer_addr, _leader_node) = spawn_leader(1).await;
    let follower_node = spawn_follower(2, &leader_peer_addr).await;

    // List the follower's client address first; the client must rotate
    // past its NOT_LEADER response and reach the leader.
    let client = Client::new(
        vec![
            follower_node.self_client_address.clone(),
            leader_client_addr,
        ],
        Duration::from_secs(2),
    );
    client.create_account("carol", "pw").await.unwrap();
}
