//! Message storage - append-only record of every message sent.

use anyhow::{Result, anyhow};
use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MESSAGE_DATA: TableDefinition<u64, &[u8]> = TableDefinition::new("messages:data");
const RECIPIENT_INDEX: TableDefinition<(&str, u64), ()> =
    TableDefinition::new("messages:recipient_index");
const MESSAGE_META: TableDefinition<&str, u64> = TableDefinition::new("messages:meta");

const NEXT_ID_KEY: &str = "next_id";
const FIRST_ID: u64 = 1;

/// A persisted message. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub content: String,
    /// Write time in Unix epoch milliseconds
    pub created_at: i64,
}

/// A message that has not been written yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub sender: String,
    pub recipient: String,
    #[serde(default)]
    pub content: String,
}

impl NewMessage {
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
            content: content.into(),
        }
    }
}

/// Message storage backed by redb.
///
/// Identifiers come from a sequence row that is read and advanced inside the
/// same write transaction as the insert. redb serializes write transactions,
/// so two concurrent appends can never observe the same sequence value.
#[derive(Debug, Clone)]
pub struct MessageStorage {
    db: Arc<Database>,
}

impl MessageStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(MESSAGE_DATA)?;
        write_txn.open_table(RECIPIENT_INDEX)?;
        write_txn.open_table(MESSAGE_META)?;
        write_txn.commit()?;
        Ok(Self { db })
    }

    /// Persist a message, assigning its id and timestamp.
    pub fn append(&self, new_message: NewMessage) -> Result<Message> {
        let txn = self.db.begin_write()?;
        let message = {
            let mut meta = txn.open_table(MESSAGE_META)?;
            let id = meta
                .get(NEXT_ID_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(FIRST_ID);
            meta.insert(NEXT_ID_KEY, id + 1)?;

            let message = Message {
                id: i64::try_from(id)?,
                sender: new_message.sender,
                recipient: new_message.recipient,
                content: new_message.content,
                created_at: Utc::now().timestamp_millis(),
            };

            let serialized = serde_json::to_vec(&message)?;
            let mut data_table = txn.open_table(MESSAGE_DATA)?;
            data_table.insert(id, serialized.as_slice())?;
            drop(data_table);

            let mut index_table = txn.open_table(RECIPIENT_INDEX)?;
            index_table.insert((message.recipient.as_str(), id), ())?;

            message
        };
        txn.commit()?;

        tracing::trace!(id = message.id, recipient = %message.recipient, "Message persisted");
        Ok(message)
    }

    /// List every message addressed to `recipient`, oldest first.
    pub fn list_by_recipient(&self, recipient: &str) -> Result<Vec<Message>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(RECIPIENT_INDEX)?;
        let data = read_txn.open_table(MESSAGE_DATA)?;

        let mut messages = Vec::new();
        for entry in index.range((recipient, 0u64)..=(recipient, u64::MAX))? {
            let (key, _) = entry?;
            let (_, id) = key.value();
            let bytes = data
                .get(id)?
                .ok_or_else(|| anyhow!("Message {id} is indexed but missing from data table"))?;
            messages.push(serde_json::from_slice::<Message>(bytes.value())?);
        }

        Ok(messages)
    }

    /// Count all persisted messages.
    pub fn count(&self) -> Result<usize> {
        let read_txn = self.db.begin_read()?;
        let data = read_txn.open_table(MESSAGE_DATA)?;
        Ok(data.len()? as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    /// Returns both the store and the TempDir to ensure the directory
    /// is not deleted while the store is in use.
    fn test_store() -> (MessageStorage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("messages.redb");
        let db = Arc::new(Database::create(db_path).unwrap());
        (MessageStorage::new(db).unwrap(), dir)
    }

    #[test]
    fn test_append_assigns_sequential_ids() {
        let (store, _temp_dir) = test_store();

        let first = store.append(NewMessage::new("alice", "bob", "hi")).unwrap();
        let second = store.append(NewMessage::new("carol", "bob", "yo")).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(first.sender, "alice");
        assert_eq!(first.recipient, "bob");
        assert_eq!(first.content, "hi");
        assert!(first.created_at > 0);
        assert_eq!(second.id, 2);
    }

    #[test]
    fn test_list_by_recipient_filters_and_orders() {
        let (store, _temp_dir) = test_store();

        store.append(NewMessage::new("a", "x", "m1")).unwrap();
        store.append(NewMessage::new("a", "y", "other")).unwrap();
        store.append(NewMessage::new("b", "x", "m2")).unwrap();

        let listed = store.list_by_recipient("x").unwrap();
        let ids: Vec<_> = listed.iter().map(|m| m.id).collect();
        let contents: Vec<_> = listed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    #[test]
    fn test_list_by_recipient_does_not_match_prefixes() {
        let (store, _temp_dir) = test_store();

        store.append(NewMessage::new("a", "bob", "exact")).unwrap();
        store.append(NewMessage::new("a", "bobby", "longer")).unwrap();
        store.append(NewMessage::new("a", "bo", "shorter")).unwrap();

        let listed = store.list_by_recipient("bob").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].content, "exact");
    }

    #[test]
    fn test_list_unknown_or_empty_recipient_is_empty() {
        let (store, _temp_dir) = test_store();
        store.append(NewMessage::new("a", "x", "m1")).unwrap();

        assert!(store.list_by_recipient("nobody").unwrap().is_empty());
        assert!(store.list_by_recipient("").unwrap().is_empty());
    }

    #[test]
    fn test_empty_content_is_kept() {
        let (store, _temp_dir) = test_store();
        let message = store.append(NewMessage::new("a", "x", "")).unwrap();
        assert_eq!(message.content, "");
        assert_eq!(store.list_by_recipient("x").unwrap(), vec![message]);
    }

    #[test]
    fn test_count() {
        let (store, _temp_dir) = test_store();
        assert_eq!(store.count().unwrap(), 0);

        store.append(NewMessage::new("a", "x", "m1")).unwrap();
        store.append(NewMessage::new("a", "y", "m2")).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_concurrent_appends_get_distinct_ids() {
        let (store, _temp_dir) = test_store();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .map(|i| {
                            store
                                .append(NewMessage::new(
                                    format!("worker-{worker}"),
                                    "shared",
                                    format!("{i}"),
                                ))
                                .unwrap()
                                .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(ids.len(), 80);
        assert_eq!(unique.len(), 80);
        assert_eq!(store.list_by_recipient("shared").unwrap().len(), 80);
    }
}
