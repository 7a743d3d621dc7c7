//! Outbound peer-RPC calls: open a connection, send one request, read one
//! response, close. There is no connection pool — matching the original's
//! per-call channel.

use std::time::Duration;

use parlor_wire::{read_message, write_message, PeerRequest, PeerResponse};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::{ReplicaError, Result};

/// Calls `address` with `request`, enforcing `timeout_after` on the whole
/// connect+send+receive sequence.
pub async fn call_peer(
    address: &str,
    request: PeerRequest,
    timeout_after: Duration,
) -> Result<PeerResponse> {
    timeout(timeout_after, call_peer_inner(address, request))
        .await
        .map_err(|_| ReplicaError::Timeout(address.to_string()))?
}

async fn call_peer_inner(address: &str, request: PeerRequest) -> Result<PeerResponse> {
    let mut stream = TcpStream::connect(address)
        .await
        .map_err(|_| ReplicaError::PeerUnreachable(address.to_string()))?;
    write_message(&mut stream, &request).await?;
    let response = read_message(&mut stream).await?;
    Ok(response)
}
