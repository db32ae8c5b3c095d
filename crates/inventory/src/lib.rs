//! Inventory domain module: catalog products and stock counters.
//!
//! Records here are owned by other systems; the sync engine links them to
//! marketplace ids and moves stock counters on order status transitions.

pub mod product;
pub mod stock;

pub use product::Product;
pub use stock::{StockAdjustMode, StockAttribute, StockItem};
