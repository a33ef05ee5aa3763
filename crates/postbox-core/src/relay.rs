//! Message relay: send, fetch and pull over durable storage plus the
//! recency window.
//!
//! Storage calls run on the blocking pool and are never made while the
//! window lock is held. The window is only touched after storage has
//! confirmed a write or a read.

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::store::MessageStore;
use crate::window::RecencyWindow;
use parking_lot::Mutex;
use postbox_storage::{Message, NewMessage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Point-in-time counters for health reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RelayStats {
    pub messages: usize,
    pub window: usize,
    pub window_capacity: usize,
}

pub struct MessageCore {
    store: Arc<dyn MessageStore>,
    window: Mutex<RecencyWindow>,
    request_timeout: Duration,
}

impl MessageCore {
    pub fn new(store: Arc<dyn MessageStore>, config: &CoreConfig) -> Self {
        Self {
            store,
            window: Mutex::new(RecencyWindow::new(config.window_capacity)),
            request_timeout: config.request_timeout,
        }
    }

    /// Persist a new message and record it in the recency window.
    pub async fn send(
        &self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Message, CoreError> {
        let new_message = NewMessage::new(sender, recipient, content);
        if new_message.sender.trim().is_empty() {
            return Err(CoreError::Validation("sender must not be empty".to_string()));
        }
        if new_message.recipient.trim().is_empty() {
            return Err(CoreError::Validation(
                "recipient must not be empty".to_string(),
            ));
        }

        let recipient = new_message.recipient.clone();
        let message = self
            .with_store("send", Some(recipient.as_str()), move |store| store.append(new_message))
            .await?;

        self.window.lock().merge(std::slice::from_ref(&message));
        debug!(id = message.id, recipient = %message.recipient, "Message sent");
        Ok(message)
    }

    /// Full persisted history for `recipient`, each message exactly once.
    ///
    /// The result is also merged into the recency window.
    pub async fn fetch(&self, recipient: &str) -> Result<Vec<Message>, CoreError> {
        let messages = self.list_persisted("fetch", recipient).await?;

        self.window.lock().merge(&messages);
        debug!(recipient, count = messages.len(), "Fetched messages");
        Ok(messages)
    }

    /// Persisted history for `recipient` combined with everything currently
    /// in the recency window, deduplicated and ordered by id.
    pub async fn pull(&self, recipient: &str) -> Result<Vec<Message>, CoreError> {
        let persisted = self.list_persisted("pull", recipient).await?;
        let ambient = self.window.lock().snapshot();

        let mut merged: BTreeMap<i64, Message> =
            persisted.into_iter().map(|m| (m.id, m)).collect();
        for message in ambient {
            merged.entry(message.id).or_insert(message);
        }

        let messages: Vec<Message> = merged.into_values().collect();
        debug!(recipient, count = messages.len(), "Pulled messages");
        Ok(messages)
    }

    pub fn window_snapshot(&self) -> Vec<Message> {
        self.window.lock().snapshot()
    }

    pub fn window_len(&self) -> usize {
        self.window.lock().len()
    }

    pub async fn stats(&self) -> Result<RelayStats, CoreError> {
        let messages = self.with_store("stats", None, |store| store.count()).await?;
        let window = self.window.lock();
        Ok(RelayStats {
            messages,
            window: window.len(),
            window_capacity: window.capacity(),
        })
    }

    async fn list_persisted(
        &self,
        operation: &'static str,
        recipient: &str,
    ) -> Result<Vec<Message>, CoreError> {
        let owned = recipient.to_string();
        self.with_store(operation, Some(recipient), move |store| {
            store.list_by_recipient(&owned)
        })
        .await
    }

    /// Run a blocking storage call on the blocking pool, bounded by the
    /// configured request timeout.
    async fn with_store<T, F>(
        &self,
        operation: &'static str,
        recipient: Option<&str>,
        call: F,
    ) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn MessageStore>) -> anyhow::Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        let task = tokio::task::spawn_blocking(move || call(store));

        match tokio::time::timeout(self.request_timeout, task).await {
            Err(_) => {
                warn!(
                    operation,
                    recipient = ?recipient,
                    timeout = ?self.request_timeout,
                    "Storage call timed out"
                );
                Err(CoreError::Cancelled { operation })
            }
            Ok(Err(join_error)) if join_error.is_cancelled() => {
                Err(CoreError::Cancelled { operation })
            }
            Ok(Err(join_error)) => Err(CoreError::storage(
                operation,
                recipient,
                anyhow::anyhow!("storage task failed: {join_error}"),
            )),
            Ok(Ok(result)) => result.map_err(|source| {
                warn!(operation, recipient = ?recipient, error = %source, "Storage call failed");
                CoreError::storage(operation, recipient, source)
            }),
        }
    }
}
