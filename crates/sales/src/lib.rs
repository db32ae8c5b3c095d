//! Sales orders domain module.
//!
//! This crate contains the canonical order model and the pure parts of order
//! reconciliation: payload parsing, status classification, bundle SKU
//! decomposition and financial aggregation (no IO, no storage).

pub mod bundle;
pub mod order;
pub mod order_item;
pub mod payload;
pub mod totals;

pub use bundle::{BundleDiagnostic, BundleSku, DEFAULT_BUNDLE_SEPARATOR, decompose};
pub use order::{
    Order, OrderComment, OrderData, OrderStatus, PaymentInfo, StatusCategory, StatusRules,
    order_unique_id,
};
pub use order_item::{ItemFigures, NewOrderItem, OrderItem, order_item_unique_id};
pub use payload::{OrderPayload, RawAddress, RawFinancials, RawItem, RawOrderItem};
pub use totals::{OrderTotals, TotalCode, TotalCodes, aggregate};
