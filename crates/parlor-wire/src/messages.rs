//! Request/response envelopes for the peer (cluster) and client services.

use parlor_types::{ClusterMember, ErrorCode, MessageId, NodeId, Timestamp};
use serde::{Deserialize, Serialize};

/// A `Message` row shaped for the wire: no internal sender/receiver ids, just
/// the fields a client needs to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub from: String,
    pub content: String,
    pub message_id: MessageId,
    pub time_stamp: Timestamp,
}

/// Requests a follower's or leader's peer-facing (cluster) service accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRequest {
    RegisterFollower {
        follower_id: NodeId,
        follower_address: String,
    },
    HeartBeat,
    CheckLeader,
    AcceptUpdates {
        event_bytes: Vec<u8>,
    },
    UpdateLeader {
        new_leader_id: NodeId,
        new_leader_address: String,
    },
    UpdateFollowers {
        member: ClusterMember,
    },
}

/// Responses to [`PeerRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerResponse {
    Ack,
    RegisterFollowerOk {
        snapshot_bytes: Vec<u8>,
        other_followers: Vec<ClusterMember>,
    },
    Error(String),
}

/// Requests the client-facing service accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientRequest {
    CreateAccount {
        username: String,
        password: String,
    },
    Login {
        username: String,
        password: String,
    },
    Logout {
        session_id: String,
    },
    DeleteAccount {
        session_id: String,
    },
    Send {
        session_id: String,
        to: String,
        message: String,
    },
    GetMessages {
        session_id: String,
    },
    GetChat {
        session_id: String,
        username: String,
    },
    DeleteMessages {
        session_id: String,
        message_ids: Vec<MessageId>,
    },
    ListUsers {
        wildcard: String,
    },
    GetUnreadCounts {
        session_id: String,
    },
}

/// Responses to [`ClientRequest`]. Every variant carries the [`ErrorCode`]
/// that resulted, `Success` on the happy path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientResponse {
    CreateAccount {
        code: ErrorCode,
    },
    Login {
        code: ErrorCode,
        session_id: String,
    },
    Logout {
        code: ErrorCode,
    },
    DeleteAccount {
        code: ErrorCode,
    },
    Send {
        code: ErrorCode,
    },
    GetMessages {
        code: ErrorCode,
        messages: Vec<WireMessage>,
    },
    GetChat {
        code: ErrorCode,
        messages: Vec<WireMessage>,
    },
    DeleteMessages {
        code: ErrorCode,
    },
    ListUsers {
        code: ErrorCode,
        users: Vec<(String, String)>,
    },
    GetUnreadCounts {
        code: ErrorCode,
        counts: Vec<(String, usize)>,
    },
}
