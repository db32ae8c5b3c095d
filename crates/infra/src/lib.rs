//! Infrastructure layer: persistence ports, remote API ports, config,
//! reconciliation, retrieval workers and outbound actions.

pub mod actions;
pub mod config;
pub mod cursor_store;
pub mod error;
pub mod external;
pub mod reconcile;
pub mod stock_publisher;
pub mod store;
pub mod workers;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::{Action, ActionExecutor, ActionKind, ActionOutcome};
pub use config::{ConfigError, Credentials, SyncConfig};
pub use cursor_store::{CursorState, CursorStore, InMemoryCursorStore, PostgresCursorStore};
pub use error::{ApiError, PayloadError, StockAdjustError, StoreError, SyncError};
pub use external::{CommercePlatform, MarketplaceApi};
pub use reconcile::{OrderReconciler, ReconcileAction, ReconcileOutcome, StockOutcome};
pub use stock_publisher::{PublishOutcome, StockPublisher};
pub use store::{EntityStore, InMemoryEntityStore};
pub use workers::{OrderRetrieval, RetrievalWorker, WorkerHandle};
