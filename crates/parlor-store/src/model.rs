//! Row types persisted by the store.

use parlor_types::{MessageId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// An account row.
///
/// `session_id` is non-empty exactly when `logged_in` is true; this invariant
/// is maintained by [`crate::Store::set_session`] / [`crate::Store::clear_session`]
/// and never checked lazily.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Argon2id PHC string (`$argon2id$v=19$...`), never the raw password.
    pub password_hash: String,
    pub logged_in: bool,
    pub session_id: String,
}

/// A point-to-point message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub is_received: bool,
    pub time_stamp: Timestamp,
}

/// A tombstone written in place of a deleted [`Message`].
///
/// Never modified once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeletedMessage {
    pub id: MessageId,
    pub original_message_id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub time_stamp: Timestamp,
}

impl DeletedMessage {
    /// Builds the tombstone a deleted [`Message`] turns into. Used both by
    /// the store internally and by callers that need to construct the
    /// matching `(deleted_messages, add, row)` replication event.
    pub fn from_message(message: &Message) -> Self {
        Self {
            id: message.id,
            original_message_id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            time_stamp: message.time_stamp,
        }
    }
}

/// The complete set of rows in a store, used both as the snapshot payload
/// sent to a newly registering follower and as the internal table set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub messages: Vec<Message>,
    pub deleted_messages: Vec<DeletedMessage>,
}
