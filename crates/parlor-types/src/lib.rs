//! # parlor-types: shared types for the parlor chat cluster
//!
//! Entity identifiers ([`UserId`], [`MessageId`], [`NodeId`]), the stable
//! [`ErrorCode`] taxonomy shared between the client and the leader/follower
//! agents, and the [`Timestamp`] newtype used on every wire payload.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Unique identifier for a [`User`](#) row, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(u64);

impl UserId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<UserId> for u64 {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Unique identifier for a `Message` or `DeletedMessage` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<MessageId> for u64 {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

/// Identifier of a cluster node, provided on the command line at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(NodeId)
    }
}

/// UTC instant attached to every `Message` and event envelope.
///
/// Wraps `chrono::DateTime<Utc>` so the rest of the crate graph never names
/// `chrono` directly, keeping the dependency swappable at one seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(chrono::DateTime<chrono::Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    pub fn from_inner(inner: chrono::DateTime<chrono::Utc>) -> Self {
        Self(inner)
    }

    pub fn inner(self) -> chrono::DateTime<chrono::Utc> {
        self.0
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Stable numeric error codes shared by every RPC response.
///
/// These values are part of the wire contract: once assigned, a variant's
/// discriminant never changes, even if new variants are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    InvalidArguments = 2,
    UserNameExists = 8,
    UserDoesntExist = 9,
    IncorrectPassword = 10,
    UserNotLoggedIn = 14,
    ReceiverDoesntExist = 15,
    NoMessages = 17,
    NotLeader = 18,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::InvalidArguments => "invalid arguments",
            ErrorCode::UserNameExists => "username already exists",
            ErrorCode::UserDoesntExist => "user does not exist",
            ErrorCode::IncorrectPassword => "incorrect password",
            ErrorCode::UserNotLoggedIn => "user not logged in",
            ErrorCode::ReceiverDoesntExist => "receiver does not exist",
            ErrorCode::NoMessages => "no messages",
            ErrorCode::NotLeader => "not leader",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.message())
    }
}

/// Opaque per-session token minted by the leader on `Login`.
///
/// Rendered on the wire as its hyphenated UUID string; never replicated to
/// followers (sessions are leader-local, see the design notes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new_random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A known peer in the cluster's peer set: a node id paired with the
/// address its peer-facing (cluster) RPC listener binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub node_id: NodeId,
    pub peer_address: String,
}

impl ClusterMember {
    pub fn new(node_id: NodeId, peer_address: impl Into<String>) -> Self {
        Self {
            node_id,
            peer_address: peer_address.into(),
        }
    }
}

impl Display for ClusterMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.node_id, self.peer_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_roundtrips_through_u64() {
        let id = UserId::new(42);
        assert_eq!(u64::from(id), 42);
        assert_eq!(UserId::from(42u64), id);
    }

    #[test]
    fn error_code_discriminants_match_the_stable_table() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::InvalidArguments.code(), 2);
        assert_eq!(ErrorCode::UserNameExists.code(), 8);
        assert_eq!(ErrorCode::UserDoesntExist.code(), 9);
        assert_eq!(ErrorCode::IncorrectPassword.code(), 10);
        assert_eq!(ErrorCode::UserNotLoggedIn.code(), 14);
        assert_eq!(ErrorCode::ReceiverDoesntExist.code(), 15);
        assert_eq!(ErrorCode::NoMessages.code(), 17);
        assert_eq!(ErrorCode::NotLeader.code(), 18);
    }

    #[test]
    fn session_token_empty_is_distinguishable() {
        let empty = SessionToken::empty();
        assert!(empty.is_empty());
        let minted = SessionToken::new_random();
        assert!(!minted.is_empty());
        assert_ne!(empty, minted);
    }

    #[test]
    fn node_id_parses_from_cli_string() {
        let id: NodeId = "7".parse().unwrap();
        assert_eq!(id, NodeId::new(7));
        assert!("not-a-number".parse::<NodeId>().is_err());
    }
}
