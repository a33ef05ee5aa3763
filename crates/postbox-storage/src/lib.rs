//! Postbox Storage - durable message persistence
//!
//! This crate provides the persistence layer for Postbox, using redb as the
//! embedded database. Every message ever sent lives here; nothing is updated
//! or removed once written.
//!
//! # Tables
//!
//! - `messages:data` - Message records keyed by id
//! - `messages:recipient_index` - `(recipient, id)` lookup index
//! - `messages:meta` - Identifier sequence

pub mod message;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use message::{Message, MessageStorage, NewMessage};

/// Central storage manager that initializes all storage subsystems
pub struct Storage {
    pub messages: MessageStorage,
}

impl Storage {
    /// Create a new storage instance at the given path.
    ///
    /// This will create the database file if it doesn't exist and initialize
    /// all required tables.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);
        let messages = MessageStorage::new(db)?;

        Ok(Self { messages })
    }
}
