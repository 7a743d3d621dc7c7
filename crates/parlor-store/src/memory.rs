//! The shipped in-memory [`Store`] implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;

use parlor_types::{MessageId, Timestamp, UserId};
use wildmatch::WildMatch;

use crate::error::StoreError;
use crate::event::{MutationEvent, Op, Row};
use crate::model::{DeletedMessage, Message, Snapshot, User};
use crate::Store;

/// All rows held by a node, plus the id counters that assign new keys.
///
/// A single [`Mutex`] around this struct is the store's only lock: a write
/// and the read-back needed to build its replication event happen inside one
/// critical section, matching the "single transaction" rule for writes.
#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    username_index: BTreeMap<String, UserId>,
    session_index: BTreeMap<String, UserId>,
    messages: BTreeMap<MessageId, Message>,
    deleted_messages: BTreeMap<MessageId, DeletedMessage>,
    next_user_id: u64,
    next_message_id: u64,
}

impl Tables {
    fn username_key(username: &str) -> String {
        username.to_lowercase()
    }
}

/// In-memory implementation of [`Store`] backed by a single mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn create_user(&self, username: &str, password_hash: String) -> Result<User, StoreError> {
        if username.trim().is_empty() || password_hash.is_empty() {
            return Err(StoreError::EmptyCredential);
        }
        let mut t = self.tables.lock().unwrap();
        let key = Tables::username_key(username);
        if t.username_index.contains_key(&key) {
            return Err(StoreError::UserNameExists(username.to_string()));
        }
        let id = UserId::new(t.next_user_id);
        t.next_user_id += 1;
        let user = User {
            id,
            username: username.to_string(),
            password_hash,
            logged_in: false,
            session_id: String::new(),
        };
        t.username_index.insert(key, id);
        t.users.insert(id, user.clone());
        Ok(user)
    }

    fn find_user_by_name(&self, username: &str) -> Option<User> {
        let t = self.tables.lock().unwrap();
        let key = Tables::username_key(username);
        let id = t.username_index.get(&key)?;
        t.users.get(id).cloned()
    }

    fn find_user_by_id(&self, user_id: UserId) -> Option<User> {
        let t = self.tables.lock().unwrap();
        t.users.get(&user_id).cloned()
    }

    fn find_user_by_session(&self, session: &str) -> Option<User> {
        if session.is_empty() {
            return None;
        }
        let t = self.tables.lock().unwrap();
        let id = t.session_index.get(session)?;
        t.users.get(id).cloned()
    }

    fn set_session(&self, user_id: UserId, session: String) -> Result<(), StoreError> {
        let mut t = self.tables.lock().unwrap();
        let user = t
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserIdDoesntExist(user_id))?;
        let old_session = std::mem::replace(&mut user.session_id, session.clone());
        user.logged_in = true;
        if !old_session.is_empty() {
            t.session_index.remove(&old_session);
        }
        t.session_index.insert(session, user_id);
        Ok(())
    }

    fn clear_session(&self, user_id: UserId) -> Result<(), StoreError> {
        let mut t = self.tables.lock().unwrap();
        let user = t
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserIdDoesntExist(user_id))?;
        let old_session = std::mem::take(&mut user.session_id);
        user.logged_in = false;
        t.session_index.remove(&old_session);
        Ok(())
    }

    fn insert_message(
        &self,
        sender: UserId,
        receiver: UserId,
        content: String,
    ) -> Result<Message, StoreError> {
        if content.trim().is_empty() {
            return Err(StoreError::EmptyContent);
        }
        let mut t = self.tables.lock().unwrap();
        if !t.users.contains_key(&receiver) {
            return Err(StoreError::UserIdDoesntExist(receiver));
        }
        let id = MessageId::new(t.next_message_id);
        t.next_message_id += 1;
        let message = Message {
            id,
            sender_id: sender,
            receiver_id: receiver,
            content,
            is_received: false,
            time_stamp: Timestamp::now(),
        };
        t.messages.insert(id, message.clone());
        Ok(message)
    }

    fn fetch_unread_for(&self, user_id: UserId) -> Vec<Message> {
        let mut t = self.tables.lock().unwrap();
        let mut out: Vec<Message> = t
            .messages
            .values()
            .filter(|m| m.receiver_id == user_id && !m.is_received)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.time_stamp);
        for m in &mut out {
            m.is_received = true;
            if let Some(row) = t.messages.get_mut(&m.id) {
                row.is_received = true;
            }
        }
        out
    }

    fn mark_received(&self, ids: &[MessageId], user_id: UserId) {
        let mut t = self.tables.lock().unwrap();
        for id in ids {
            if let Some(m) = t.messages.get_mut(id) {
                if m.receiver_id == user_id {
                    m.is_received = true;
                }
            }
        }
    }

    fn fetch_chat(&self, user_id: UserId, other_id: UserId) -> Vec<Message> {
        let mut t = self.tables.lock().unwrap();
        let mut out: Vec<Message> = t
            .messages
            .values()
            .filter(|m| {
                (m.sender_id == user_id && m.receiver_id == other_id)
                    || (m.sender_id == other_id && m.receiver_id == user_id)
            })
            .cloned()
            .collect();
        out.sort_by_key(|m| m.time_stamp);
        for m in &mut out {
            if m.receiver_id == user_id {
                m.is_received = true;
                if let Some(row) = t.messages.get_mut(&m.id) {
                    row.is_received = true;
                }
            }
        }
        out
    }

    /// Deletes the subset of `ids` where `caller` is sender or receiver,
    /// silently skipping ids that don't exist or aren't accessible to
    /// `caller` — matching the original's `or_(sender_id==user.id,
    /// receiver_id==user.id)` filter rather than rejecting the whole batch
    /// over one foreign or unknown id.
    fn delete_messages(&self, ids: &[MessageId], caller: UserId) -> Vec<Message> {
        let mut t = self.tables.lock().unwrap();
        let mut deleted = Vec::with_capacity(ids.len());
        for id in ids {
            let accessible = t
                .messages
                .get(id)
                .is_some_and(|m| m.sender_id == caller || m.receiver_id == caller);
            if !accessible {
                continue;
            }
            if let Some(m) = t.messages.remove(id) {
                let tombstone = DeletedMessage::from_message(&m);
                t.deleted_messages.insert(tombstone.id, tombstone);
                deleted.push(m);
            }
        }
        deleted
    }

    fn delete_user_cascade(&self, user_id: UserId) -> Result<(User, Vec<Message>), StoreError> {
        let mut t = self.tables.lock().unwrap();
        let user = t
            .users
            .remove(&user_id)
            .ok_or(StoreError::UserIdDoesntExist(user_id))?;
        t.username_index.remove(&Tables::username_key(&user.username));
        if !user.session_id.is_empty() {
            t.session_index.remove(&user.session_id);
        }
        let ids: Vec<MessageId> = t
            .messages
            .values()
            .filter(|m| m.receiver_id == user_id)
            .map(|m| m.id)
            .collect();
        let mut tombstoned = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(m) = t.messages.remove(&id) {
                let tombstone = DeletedMessage::from_message(&m);
                t.deleted_messages.insert(tombstone.id, tombstone);
                tombstoned.push(m);
            }
        }
        Ok((user, tombstoned))
    }

    fn count_unread_by_sender(&self, user_id: UserId) -> Vec<(String, usize)> {
        let t = self.tables.lock().unwrap();
        let mut counts: BTreeMap<UserId, usize> = BTreeMap::new();
        for m in t.messages.values() {
            if m.receiver_id == user_id && !m.is_received && m.sender_id != user_id {
                *counts.entry(m.sender_id).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .filter_map(|(sender, count)| {
                t.users.get(&sender).map(|u| (u.username.clone(), count))
            })
            .collect()
    }

    fn list_users(&self, pattern: &str) -> Vec<(String, bool)> {
        let t = self.tables.lock().unwrap();
        let pattern = if pattern.trim().is_empty() {
            "*".to_string()
        } else {
            pattern.to_lowercase()
        };
        let matcher = WildMatch::new(&pattern);
        t.users
            .values()
            .filter(|u| matcher.matches(&u.username.to_lowercase()))
            .map(|u| (u.username.clone(), u.logged_in))
            .collect()
    }

    fn snapshot_all(&self) -> Snapshot {
        let t = self.tables.lock().unwrap();
        Snapshot {
            users: t.users.values().cloned().collect(),
            messages: t.messages.values().cloned().collect(),
            deleted_messages: t.deleted_messages.values().cloned().collect(),
        }
    }

    fn apply_event(&self, event: &MutationEvent) -> Result<(), StoreError> {
        let mut t = self.tables.lock().unwrap();
        match (&event.op, &event.row) {
            (Op::Add | Op::Update, Row::User(u)) => {
                t.username_index
                    .insert(Tables::username_key(&u.username), u.id);
                t.users.insert(u.id, u.clone());
            }
            (Op::Delete, Row::User(u)) => {
                t.users.remove(&u.id);
                t.username_index.remove(&Tables::username_key(&u.username));
            }
            (Op::Add | Op::Update, Row::Message(m)) => {
                t.messages.insert(m.id, m.clone());
            }
            (Op::Delete, Row::Message(m)) => {
                t.messages.remove(&m.id);
            }
            (Op::Add | Op::Update, Row::DeletedMessage(d)) => {
                t.deleted_messages.insert(d.id, d.clone());
            }
            (Op::Delete, Row::DeletedMessage(d)) => {
                t.deleted_messages.remove(&d.id);
            }
        }
        Ok(())
    }

    fn wipe_and_recreate(&self) {
        let mut t = self.tables.lock().unwrap();
        *t = Tables::default();
    }

    fn load_snapshot(&self, snapshot: Snapshot) {
        let mut t = self.tables.lock().unwrap();
        *t = Tables::default();
        for u in snapshot.users {
            t.next_user_id = t.next_user_id.max(u.id.as_u64() + 1);
            t.username_index.insert(Tables::username_key(&u.username), u.id);
            if !u.session_id.is_empty() {
                t.session_index.insert(u.session_id.clone(), u.id);
            }
            t.users.insert(u.id, u);
        }
        for m in snapshot.messages {
            t.next_message_id = t.next_message_id.max(m.id.as_u64() + 1);
            t.messages.insert(m.id, m);
        }
        for d in snapshot.deleted_messages {
            t.deleted_messages.insert(d.id, d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_rejects_duplicate_username_case_insensitively() {
        let store = MemoryStore::new();
        store.create_user("Alice", "hash".to_string()).unwrap();
        let err = store.create_user("alice", "hash2".to_string()).unwrap_err();
        assert!(matches!(err, StoreError::UserNameExists(_)));
    }

    #[test]
    fn send_to_unknown_receiver_fails_without_mutating_state() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "hash".to_string()).unwrap();
        let err = store
            .insert_message(alice.id, UserId::new(999), "hi".to_string())
            .unwrap_err();
        assert!(matches!(err, StoreError::UserIdDoesntExist(_)));
    }

    #[test]
    fn unread_messages_are_flipped_to_received_on_fetch() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "h".to_string()).unwrap();
        let bob = store.create_user("bob", "h".to_string()).unwrap();
        store.insert_message(alice.id, bob.id, "hi".to_string()).unwrap();
        let unread = store.fetch_unread_for(bob.id);
        assert_eq!(unread.len(), 1);
        let again = store.fetch_unread_for(bob.id);
        assert!(again.is_empty());
    }

    #[test]
    fn delete_account_tombstones_received_messages_and_removes_user() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "h".to_string()).unwrap();
        let bob = store.create_user("bob", "h".to_string()).unwrap();
        store.insert_message(alice.id, bob.id, "hi".to_string()).unwrap();
        let (deleted_user, tombstoned) = store.delete_user_cascade(bob.id).unwrap();
        assert_eq!(deleted_user.username, "bob");
        assert_eq!(tombstoned.len(), 1);
        assert!(store.find_user_by_name("bob").is_none());
    }

    #[test]
    fn list_users_matches_wildcard_case_insensitively() {
        let store = MemoryStore::new();
        store.create_user("Alice", "h".to_string()).unwrap();
        store.create_user("Bob", "h".to_string()).unwrap();
        let matches = store.list_users("al*");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].0, "Alice");
    }

    #[test]
    fn apply_add_event_twice_overwrites_rather_than_errors() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "h".to_string()).unwrap();
        let event = MutationEvent::add(Row::User(alice.clone()));
        store.apply_event(&event).unwrap();
        store.apply_event(&event).unwrap();
        assert_eq!(store.find_user_by_name("alice").unwrap().id, alice.id);
    }

    #[test]
    fn delete_messages_deletes_the_accessible_subset_and_skips_the_rest() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "h".to_string()).unwrap();
        let bob = store.create_user("bob", "h".to_string()).unwrap();
        let carol = store.create_user("carol", "h".to_string()).unwrap();
        let owned = store.insert_message(alice.id, bob.id, "hi".to_string()).unwrap();
        let foreign = store.insert_message(bob.id, carol.id, "secret".to_string()).unwrap();
        let unknown = MessageId::new(9_999);

        let deleted = store.delete_messages(&[owned.id, foreign.id, unknown], alice.id);

        assert_eq!(deleted.len(), 1);
        assert_eq!(deleted[0].id, owned.id);
        assert!(store.fetch_chat(bob.id, carol.id).iter().any(|m| m.id == foreign.id));
    }

    #[test]
    fn delete_messages_with_no_accessible_ids_deletes_nothing() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "h".to_string()).unwrap();
        let deleted = store.delete_messages(&[], alice.id);
        assert!(deleted.is_empty());
    }

    #[test]
    fn re_login_invalidates_the_previous_session_token() {
        let store = MemoryStore::new();
        let alice = store.create_user("alice", "h".to_string()).unwrap();
        store.set_session(alice.id, "first-token".to_string()).unwrap();
        assert!(store.find_user_by_session("first-token").is_some());

        store.set_session(alice.id, "second-token".to_string()).unwrap();

        assert!(store.find_user_by_session("first-token").is_none());
        assert!(store.find_user_by_session("second-token").is_some());
    }
}
