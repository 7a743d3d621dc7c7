//! The leader-side fan-out queue.
//!
//! A non-blocking producer (`push`, called by client RPC handlers right
//! after a commit) paired with a consumer that can either block on a
//! [`tokio::sync::Notify`] or fall back to a periodic poll — combining both
//! strategies the design allows.

use std::sync::Arc;

use crossbeam_queue::SegQueue;
use parlor_store::MutationEvent;
use tokio::sync::Notify;

/// FIFO queue of events awaiting fan-out to followers.
#[derive(Debug, Default)]
pub struct UpdateQueue {
    events: SegQueue<MutationEvent>,
    notify: Notify,
}

impl UpdateQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Enqueues an event. Never blocks; called from the client RPC path
    /// immediately after the store commit that produced `event`.
    pub fn push(&self, event: MutationEvent) {
        self.events.push(event);
        self.notify.notify_one();
    }

    /// Returns the next event without waiting.
    pub fn try_pop(&self) -> Option<MutationEvent> {
        self.events.pop()
    }

    /// Waits until `push` is called or `timeout` elapses, whichever comes
    /// first — used by the fan-out worker as its idle tick so it can also
    /// notice shutdown without a dedicated cancellation channel.
    pub async fn wait_for_push(&self, timeout: std::time::Duration) {
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_store::{Op, Row, User};
    use parlor_types::UserId;

    fn sample_event() -> MutationEvent {
        MutationEvent {
            op: Op::Add,
            row: Row::User(User {
                id: UserId::new(1),
                username: "alice".to_string(),
                password_hash: "h".to_string(),
                logged_in: false,
                session_id: String::new(),
            }),
        }
    }

    #[test]
    fn fifo_order_is_preserved() {
        let queue = UpdateQueue::new();
        queue.push(sample_event());
        queue.push(sample_event());
        assert_eq!(queue.len(), 2);
        assert!(queue.try_pop().is_some());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn wait_for_push_returns_promptly_on_push() {
        let queue = UpdateQueue::new();
        let q2 = Arc::clone(&queue);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            q2.push(sample_event());
        });
        queue
            .wait_for_push(std::time::Duration::from_secs(5))
            .await;
        handle.await.unwrap();
        assert_eq!(queue.len(), 1);
    }
}
