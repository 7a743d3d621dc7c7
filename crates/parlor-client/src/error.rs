use parlor_types::ErrorCode;
use thiserror::Error;

/// Errors a caller of [`crate::Client`] may observe.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("wire error talking to the cluster")]
    Wire(#[from] parlor_wire::WireError),

    #[error("every configured address was unreachable or refused the call")]
    AllAddressesExhausted,

    #[error("the session was invalidated, probably by a leader failover; log in again")]
    SessionInvalidated,

    #[error("server rejected the request: {0}")]
    Server(ErrorCode),
}

impl ClientError {
    /// True for the one error code that means "try logging in again"
    /// rather than "this specific call failed".
    pub fn is_session_invalidated(&self) -> bool {
        matches!(self, ClientError::SessionInvalidated)
            || matches!(self, ClientError::Server(ErrorCode::UserNotLoggedIn))
    }
}
