use thiserror::Error;

/// Top-level error type for the server binary.
///
/// Handlers never raise this across an RPC boundary (every request/response
/// exit goes through a typed [`parlor_wire::ClientResponse`] or
/// [`parlor_wire::PeerResponse`] instead); this type covers only the
/// process-fatal conditions raised during startup.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("store operation failed")]
    Store(#[from] parlor_store::StoreError),

    #[error("replication operation failed")]
    Replica(#[from] parlor_replica::ReplicaError),

    #[error("auth error")]
    Auth(#[from] crate::auth::AuthError),

    #[error("cannot bind {address} after repeated retries")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },
}
