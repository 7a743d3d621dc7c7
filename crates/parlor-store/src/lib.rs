//! # parlor-store: the relational data model for a single cluster node
//!
//! [`Store`] is the trait every leader and follower agent programs against;
//! [`MemoryStore`] is the only implementation shipped here (a disk-backed
//! store is a natural extension point but outside this crate's scope). Every
//! write method that feeds the replication fan-out returns the committed row
//! so the caller can build a [`MutationEvent`] without a second read.

mod error;
mod event;
mod memory;
mod model;

pub use error::StoreError;
pub use event::{MutationEvent, Op, Row, Table};
pub use memory::MemoryStore;
pub use model::{DeletedMessage, Message, Snapshot, User};

use parlor_types::{MessageId, UserId};

/// The transactional API every replica agent programs against.
///
/// Implementors must guarantee that a write and the row it returns reflect
/// the same committed state — no intervening write from another caller can
/// be observed between the commit and the value handed back.
pub trait Store: Send + Sync {
    fn create_user(&self, username: &str, password_hash: String) -> Result<User, StoreError>;
    fn find_user_by_name(&self, username: &str) -> Option<User>;
    fn find_user_by_id(&self, user_id: UserId) -> Option<User>;
    fn find_user_by_session(&self, session: &str) -> Option<User>;
    fn set_session(&self, user_id: UserId, session: String) -> Result<(), StoreError>;
    fn clear_session(&self, user_id: UserId) -> Result<(), StoreError>;
    fn insert_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: String,
    ) -> Result<Message, StoreError>;
    fn fetch_unread_for(&self, user_id: UserId) -> Vec<Message>;
    fn mark_received(&self, ids: &[MessageId], user_id: UserId);
    fn fetch_chat(&self, user_id: UserId, other_id: UserId) -> Vec<Message>;
    /// Deletes the subset of `ids` accessible to `caller` (sender or
    /// receiver), skipping foreign or unknown ids rather than erroring.
    fn delete_messages(&self, ids: &[MessageId], caller: UserId) -> Vec<Message>;
    fn delete_user_cascade(&self, user_id: UserId) -> Result<(User, Vec<Message>), StoreError>;
    fn count_unread_by_sender(&self, user_id: UserId) -> Vec<(String, usize)>;
    /// Matches usernames against a shell-style glob (case-insensitive); an
    /// empty pattern matches everyone. Returns `(username, logged_in)`.
    fn list_users(&self, pattern: &str) -> Vec<(String, bool)>;
    fn snapshot_all(&self) -> Snapshot;
    /// Applies a replicated event. `Add`/`Update` on an existing row is
    /// last-write-wins (see R2): never an error, always a well-defined
    /// overwrite, so a duplicate delivery is harmless to replay.
    fn apply_event(&self, event: &MutationEvent) -> Result<(), StoreError>;
    fn wipe_and_recreate(&self);
    /// Replaces all tables with the contents of a leader-provided snapshot,
    /// recomputing id counters so subsequently applied events never collide.
    fn load_snapshot(&self, snapshot: Snapshot);
}
