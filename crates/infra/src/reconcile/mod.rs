//! Order reconciliation: payload in, canonical order state out.
//!
//! - [`OrderReconciler`] decides between create, relink and update
//! - [`ItemBuilder`] creates missing order items and links catalog records
//! - [`StockQuantityAdjuster`] moves stock counters on status transitions

pub mod item_builder;
pub mod order_reconciler;
pub mod stock_adjuster;

pub use item_builder::{BuiltItem, ItemBuilder};
pub use order_reconciler::{OrderReconciler, ReconcileAction, ReconcileOutcome};
pub use stock_adjuster::{StockOutcome, StockQuantityAdjuster};
