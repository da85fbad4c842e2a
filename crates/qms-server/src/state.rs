//! Application state shared across handlers.

use std::sync::Arc;

use qms_core::{Clock, QmsConfig, QueueController, Storage, TicketStore};
use tokio::sync::RwLock;

/// Shared application state behind the controller's single-writer lock.
///
/// Every lifecycle operation takes the write lock for its full read+write
/// span, so two simultaneous "call next" requests serialize instead of both
/// advancing the cursor from the same prior state.
pub struct AppState {
    /// The queue controller; the only writer of queue state.
    pub controller: QueueController,

    /// Loaded configuration.
    pub config: QmsConfig,
}

/// Handle to the shared application state.
pub type SharedState = Arc<RwLock<AppState>>;

/// Build the shared state from configuration and storage.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or persisted queue
/// state cannot be loaded.
pub fn build_state(config: QmsConfig, storage: Storage) -> anyhow::Result<SharedState> {
    let store = TicketStore::open(storage, config.queue.audit_retention)?;
    let clock = Clock::system(config.clock.utc_offset_minutes)?;
    let controller = QueueController::new(store, clock, &config.queue);

    Ok(Arc::new(RwLock::new(AppState { controller, config })))
}
