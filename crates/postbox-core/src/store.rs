//! Durable store seam used by the relay.

use anyhow::Result;
use postbox_storage::{Message, MessageStorage, NewMessage};

/// Authoritative, append-only message store.
///
/// Implementations block on I/O; callers must keep them off async worker
/// threads and outside any in-memory lock.
pub trait MessageStore: Send + Sync {
    /// Persist a message. The returned id is assigned by the store itself.
    fn append(&self, message: NewMessage) -> Result<Message>;

    /// Every message for `recipient`, ordered by id ascending.
    fn list_by_recipient(&self, recipient: &str) -> Result<Vec<Message>>;

    fn count(&self) -> Result<usize>;
}

impl MessageStore for MessageStorage {
    fn append(&self, message: NewMessage) -> Result<Message> {
        MessageStorage::append(self, message)
    }

    fn list_by_recipient(&self, recipient: &str) -> Result<Vec<Message>> {
        MessageStorage::list_by_recipient(self, recipient)
    }

    fn count(&self) -> Result<usize> {
        MessageStorage::count(self)
    }
}
