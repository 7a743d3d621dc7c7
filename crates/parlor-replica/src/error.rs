use parlor_types::NodeId;
use thiserror::Error;

/// Errors raised by replication, heartbeat and election machinery.
#[derive(Debug, Error)]
pub enum ReplicaError {
    #[error("peer call failed")]
    Wire(#[from] parlor_wire::WireError),

    #[error("store operation failed")]
    Store(#[from] parlor_store::StoreError),

    #[error("peer call to {0} timed out")]
    Timeout(String),

    #[error("peer {0} is unreachable")]
    PeerUnreachable(String),

    #[error("unexpected response from peer {0}")]
    UnexpectedResponse(String),

    #[error("node {0} cannot bind its listener: {1}")]
    BindFailed(String, #[source] std::io::Error),

    #[error("a promotion or resync is already in progress")]
    TransitionInProgress,

    #[error("node {0} is not a known peer")]
    UnknownPeer(NodeId),
}

pub type Result<T> = std::result::Result<T, ReplicaError>;
