//! `parlor-server`: a single replica process in a parlor chat cluster.
//!
//! ```text
//! parlor-server <id> leader   <client_addr> <peer_addr>
//! parlor-server <id> follower <client_addr> <peer_addr> --leader-address=<addr>
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parlor_replica::{
    register_with_leader, run_fanout_loop, run_heartbeat_loop, Node, ReplicationConfig,
};
use parlor_server::auth::Argon2Hasher;
use parlor_server::handler::ClientContext;
use parlor_server::listener::{bind_with_retries, run_client_listener, run_peer_listener};
use parlor_store::{MemoryStore, Store};
use parlor_types::NodeId;
use tracing_subscriber::EnvFilter;

/// How many times a listener retries a failed bind before the process exits.
const BIND_RETRIES: u32 = 5;
const BIND_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Recommended worker-pool sizes from the concurrency model: roughly 10 for
/// the client-facing service, 20 for the peer-facing one.
const CLIENT_WORKER_POOL: usize = 10;
const PEER_WORKER_POOL: usize = 20;

#[derive(Parser)]
#[command(name = "parlor-server", author, version, about)]
struct Cli {
    /// This node's cluster id, unique and compared as an integer during
    /// elections.
    node_id: NodeId,

    /// Overrides `PARLOR_HEARTBEAT_INTERVAL_MS` for this process.
    #[arg(long, global = true)]
    heartbeat_interval_ms: Option<u64>,

    /// Overrides `PARLOR_PEER_TIMEOUT_MS` for this process.
    #[arg(long, global = true)]
    peer_timeout_ms: Option<u64>,

    #[command(subcommand)]
    role: RoleArgs,
}

#[derive(Subcommand)]
enum RoleArgs {
    /// Start as the cluster's leader.
    Leader {
        /// Address the client-facing service binds to.
        client_addr: String,
        /// Address the peer (cluster) service binds to.
        peer_addr: String,
    },
    /// Start as a follower, bootstrapping from an existing leader.
    Follower {
        /// Address the client-facing service binds to (serves NOT_LEADER).
        client_addr: String,
        /// Address the peer (cluster) service binds to.
        peer_addr: String,
        /// Address of the leader's peer service to register with.
        #[arg(long)]
        leader_address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = ReplicationConfig::from_env();
    if let Some(ms) = cli.heartbeat_interval_ms {
        config.heartbeat_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.peer_timeout_ms {
        config.peer_timeout = Duration::from_millis(ms);
    }
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let node = match cli.role {
        RoleArgs::Leader {
            client_addr,
            peer_addr,
        } => {
            tracing::info!(node_id = %cli.node_id, %client_addr, %peer_addr, "starting as leader");
            Node::new_leader(cli.node_id, peer_addr, client_addr, store, config)
        }
        RoleArgs::Follower {
            client_addr,
            peer_addr,
            leader_address,
        } => {
            tracing::info!(node_id = %cli.node_id, %client_addr, %peer_addr, %leader_address, "starting as follower");
            // The leader assigns no id to itself from our perspective until
            // RegisterFollower's reply is applied; 0 is a placeholder that
            // register_with_leader only uses to dial the address below.
            Node::new_follower(
                cli.node_id,
                peer_addr,
                client_addr,
                NodeId::new(0),
                leader_address,
                store,
                config,
            )
        }
    };

    let peer_listener = bind_with_retries(&node.self_peer_address, BIND_RETRIES, BIND_RETRY_DELAY)
        .await
        .with_context(|| format!("could not bind peer address {}", node.self_peer_address))?;
    let client_listener =
        bind_with_retries(&node.self_client_address, BIND_RETRIES, BIND_RETRY_DELAY)
            .await
            .with_context(|| {
                format!(
                    "could not bind client address {}",
                    node.self_client_address
                )
            })?;

    tokio::spawn(run_peer_listener(
        peer_listener,
        Arc::clone(&node),
        PEER_WORKER_POOL,
    ));
    let client_ctx = Arc::new(ClientContext {
        node: Arc::clone(&node),
        hasher: Arc::new(Argon2Hasher),
    });
    tokio::spawn(run_client_listener(
        client_listener,
        client_ctx,
        CLIENT_WORKER_POOL,
    ));

    if node.role() == parlor_replica::Role::Leader {
        tokio::spawn(run_fanout_loop(Arc::clone(&node)));
    } else {
        register_with_leader(&node)
            .await
            .context("initial registration with leader failed")?;
        tokio::spawn(run_heartbeat_loop(Arc::clone(&node)));
    }

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutting down");
    Ok(())
}
