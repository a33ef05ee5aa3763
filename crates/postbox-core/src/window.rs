//! Bounded in-memory window of recently observed messages.
//!
//! The window is a best-effort view of recent traffic across all recipients.
//! It is not synchronized; [`crate::relay::MessageCore`] owns it behind a lock.

use postbox_storage::Message;
use std::collections::{HashSet, VecDeque};

pub const DEFAULT_WINDOW_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct RecencyWindow {
    capacity: usize,
    entries: VecDeque<Message>,
    ids: HashSet<i64>,
}

impl RecencyWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
        }
    }

    /// Append messages not already present, then evict from the head until
    /// the window fits its capacity again.
    pub fn merge(&mut self, messages: &[Message]) {
        for message in messages {
            if self.ids.insert(message.id) {
                self.entries.push_back(message.clone());
            }
        }

        while self.entries.len() > self.capacity {
            if let Some(evicted) = self.entries.pop_front() {
                self.ids.remove(&evicted.id);
            }
        }
    }

    /// Current contents, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.entries.iter().cloned().collect()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RecencyWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64, recipient: &str) -> Message {
        Message {
            id,
            sender: "sender".to_string(),
            recipient: recipient.to_string(),
            content: format!("content-{id}"),
            created_at: 1_700_000_000_000 + id,
        }
    }

    fn ids(window: &RecencyWindow) -> Vec<i64> {
        window.snapshot().iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_starts_empty() {
        let window = RecencyWindow::default();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), DEFAULT_WINDOW_CAPACITY);
        assert!(window.snapshot().is_empty());
    }

    #[test]
    fn test_merge_skips_duplicates() {
        let mut window = RecencyWindow::new(10);
        window.merge(&[message(1, "a"), message(2, "b")]);
        window.merge(&[message(2, "b"), message(3, "a"), message(1, "a")]);

        assert_eq!(ids(&window), vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicates_within_one_batch_are_inserted_once() {
        let mut window = RecencyWindow::new(10);
        window.merge(&[message(5, "a"), message(5, "a")]);
        assert_eq!(ids(&window), vec![5]);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut window = RecencyWindow::new(2);
        window.merge(&[message(1, "r1")]);
        window.merge(&[message(2, "r2")]);
        window.merge(&[message(3, "r3")]);

        assert_eq!(ids(&window), vec![2, 3]);
        assert!(!window.contains(1));
        assert!(window.contains(3));
    }

    #[test]
    fn test_oversized_batch_keeps_its_tail() {
        let mut window = RecencyWindow::new(3);
        let batch: Vec<_> = (1..=5).map(|id| message(id, "a")).collect();
        window.merge(&batch);

        assert_eq!(ids(&window), vec![3, 4, 5]);
    }

    #[test]
    fn test_evicted_message_can_come_back() {
        let mut window = RecencyWindow::new(1);
        window.merge(&[message(1, "a")]);
        window.merge(&[message(2, "a")]);
        window.merge(&[message(1, "a")]);

        assert_eq!(ids(&window), vec![1]);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut window = RecencyWindow::new(4);
        window.merge(&[message(1, "a"), message(2, "a")]);
        let first = window.snapshot();
        let second = window.snapshot();
        assert_eq!(first, second);
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut window = RecencyWindow::new(7);
        for start in (0..100).step_by(3) {
            let batch: Vec<_> = (start..start + 5).map(|id| message(id, "a")).collect();
            window.merge(&batch);
            assert!(window.len() <= 7);
        }
    }
}
