//! Error types for message relay operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Storage error in {operation}{}: {source}", recipient_scope(.recipient))]
    Storage {
        operation: &'static str,
        recipient: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    #[error("{operation} cancelled before storage confirmed")]
    Cancelled { operation: &'static str },
}

impl CoreError {
    pub(crate) fn storage(
        operation: &'static str,
        recipient: Option<&str>,
        source: anyhow::Error,
    ) -> Self {
        Self::Storage {
            operation,
            recipient: recipient.map(str::to_string),
            source,
        }
    }
}

fn recipient_scope(recipient: &Option<String>) -> String {
    match recipient {
        Some(recipient) => format!(" (recipient '{recipient}')"),
        None => String::new(),
    }
}
