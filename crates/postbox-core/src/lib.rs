pub mod config;
pub mod error;
pub mod paths;
pub mod relay;
pub mod store;
pub mod window;

pub use config::CoreConfig;
pub use error::CoreError;
pub use postbox_storage::{Message, NewMessage};
pub use relay::{MessageCore, RelayStats};
pub use store::MessageStore;
pub use window::RecencyWindow;

use postbox_storage::Storage;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Core application state shared by the HTTP and RPC front-ends
pub struct AppCore {
    pub relay: MessageCore,
}

impl AppCore {
    /// Open (or create) the message database at `db_path` and build the relay.
    pub fn new(db_path: impl AsRef<Path>, config: CoreConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let db_path = db_path.as_ref();
        let storage = Storage::new(db_path)?;
        info!(
            path = %db_path.display(),
            window_capacity = config.window_capacity,
            "Initializing Postbox"
        );

        Ok(Self::with_store(Arc::new(storage.messages), config))
    }

    /// Build the relay over an already opened store.
    pub fn with_store(store: Arc<dyn MessageStore>, config: CoreConfig) -> Self {
        Self {
            relay: MessageCore::new(store, &config),
        }
    }
}
