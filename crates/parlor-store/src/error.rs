use parlor_types::UserId;
use thiserror::Error;

/// Errors raised by [`crate::Store`] operations.
///
/// These are translated into [`parlor_types::ErrorCode`] values at the RPC
/// handler layer; the store itself never knows about wire error codes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already exists: {0}")]
    UserNameExists(String),

    #[error("user does not exist: {0}")]
    UserDoesntExist(String),

    #[error("user id {0} does not exist")]
    UserIdDoesntExist(UserId),

    #[error("no such session")]
    SessionNotFound,

    #[error("empty content is not a valid message body")]
    EmptyContent,

    #[error("empty username or password is not valid")]
    EmptyCredential,

    #[error("mutation event references an unknown table or malformed row: {0}")]
    MalformedEvent(String),
}
