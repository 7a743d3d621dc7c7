//! Per-call TCP accept loops for the peer and client services.
//!
//! Neither listener pools connections: each accepted stream is read for one
//! request, dispatched, and answered with one response before the stream is
//! dropped, mirroring [`parlor_replica::peer_client::call_peer`]'s per-call
//! connection on the outbound side. A [`Semaphore`] caps how many requests
//! are in flight at once, standing in for a bounded worker pool.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parlor_replica::{handle_peer_request, Node};
use parlor_wire::{read_message, write_message, PeerRequest};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::handler::{handle_client_request, ClientContext};
use crate::error::ServerError;

/// Binds `addr`, retrying with backoff up to `attempts` times. A bind
/// failure after every attempt is the one fatal startup condition this
/// process recognizes (besides store corruption on snapshot apply).
pub async fn bind_with_retries(
    addr: &str,
    attempts: u32,
    retry_delay: Duration,
) -> Result<TcpListener, ServerError> {
    let mut last_err = None;
    for attempt in 0..attempts {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) => {
                warn!(addr, attempt, error = %e, "bind failed, retrying");
                last_err = Some(e);
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
    Err(ServerError::BindFailed {
        address: addr.to_string(),
        source: last_err.unwrap_or_else(|| std::io::Error::other("no bind attempt recorded")),
    })
}

/// Serves the peer (cluster) RPC surface until the listener is dropped.
pub async fn run_peer_listener(listener: TcpListener, node: Arc<Node>, max_in_flight: usize) {
    let local_addr = listener.local_addr().ok();
    let permits = Arc::new(Semaphore::new(max_in_flight));
    info!(?local_addr, "peer listener ready");
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "peer listener accept failed");
                continue;
            }
        };
        let node = Arc::clone(&node);
        let permit = Arc::clone(&permits);
        tokio::spawn(async move {
            let Ok(_guard) = permit.acquire_owned().await else {
                return;
            };
            serve_one_peer_call(stream, peer_addr, &node).await;
        });
    }
}

async fn serve_one_peer_call(mut stream: TcpStream, peer_addr: SocketAddr, node: &Arc<Node>) {
    let request: PeerRequest = match read_message(&mut stream).await {
        Ok(request) => request,
        Err(e) => {
            warn!(?peer_addr, error = %e, "failed to read peer request");
            return;
        }
    };
    let response = handle_peer_request(node, request).await;
    if let Err(e) = write_message(&mut stream, &response).await {
        warn!(?peer_addr, error = %e, "failed to write peer response");
    }
}

/// Serves the client-facing RPC surface until the listener is dropped.
pub async fn run_client_listener(
    listener: TcpListener,
    ctx: Arc<ClientContext>,
    max_in_flight: usize,
) {
    let local_addr = listener.local_addr().ok();
    let permits = Arc::new(Semaphore::new(max_in_flight));
    info!(?local_addr, "client listener ready");
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "client listener accept failed");
                continue;
            }
        };
        let ctx = Arc::clone(&ctx);
        let permit = Arc::clone(&permits);
        tokio::spawn(async move {
            let Ok(_guard) = permit.acquire_owned().await else {
                return;
            };
            serve_one_client_call(stream, peer_addr, &ctx).await;
        });
    }
}

async fn serve_one_client_call(mut stream: TcpStream, peer_addr: SocketAddr, ctx: &Arc<ClientContext>) {
    let request = match read_message(&mut stream).await {
        Ok(request) => request,
        Err(e) => {
            warn!(?peer_addr, error = %e, "failed to read client request");
            return;
        }
    };
    let response = handle_client_request(ctx, request).await;
    if let Err(e) = write_message(&mut stream, &response).await {
        warn!(?peer_addr, error = %e, "failed to write client response");
    }
}
