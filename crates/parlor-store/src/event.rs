//! The mutation event shape fanned out from leader to followers.

use serde::{Deserialize, Serialize};

use crate::model::{DeletedMessage, Message, User};

/// Which table a [`MutationEvent`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Table {
    Users,
    Messages,
    DeletedMessages,
}

/// The kind of mutation a [`MutationEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Add,
    Update,
    Delete,
}

/// The row payload of a [`MutationEvent`], tagged by table.
///
/// `#[serde(deny_unknown_fields)]` on the inner structs is enforced at the
/// model definitions; unknown columns fail to decode rather than being
/// silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Row {
    User(User),
    Message(Message),
    DeletedMessage(DeletedMessage),
}

impl Row {
    pub fn table(&self) -> Table {
        match self {
            Row::User(_) => Table::Users,
            Row::Message(_) => Table::Messages,
            Row::DeletedMessage(_) => Table::DeletedMessages,
        }
    }
}

/// A single replicated mutation: `(table, op, row)`.
///
/// Produced by the leader after a successful commit and applied by each
/// follower at-most-once, never retried. See [`crate::Store::apply_event`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationEvent {
    pub op: Op,
    pub row: Row,
}

impl MutationEvent {
    pub fn add(row: Row) -> Self {
        Self { op: Op::Add, row }
    }

    pub fn delete(row: Row) -> Self {
        Self { op: Op::Delete, row }
    }

    pub fn update(row: Row) -> Self {
        Self { op: Op::Update, row }
    }

    pub fn table(&self) -> Table {
        self.row.table()
    }
}
