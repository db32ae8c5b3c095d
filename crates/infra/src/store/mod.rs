//! Persistence and identity-linking port.
//!
//! The sync engine never owns storage: orders, items, addresses and customers
//! are written through [`EntityStore`], products and stock items are looked up
//! and updated through it, and marketplace ids are attached to canonical
//! records as *links*.
//!
//! Order creation runs inside a scoped transaction keyed by the order's
//! unique id. Opening the same key twice is a conflict; that is what keeps
//! concurrent retries from creating the same order twice.

pub mod in_memory;

use std::sync::Arc;

use ordersync_core::{EntityId, EntityKind, LocalId, StoreId};
use ordersync_inventory::{Product, StockAttribute, StockItem};
use ordersync_parties::{Address, Customer};
use ordersync_sales::{Order, OrderComment, OrderItem, OrderStatus};

use crate::error::StoreError;

pub use in_memory::InMemoryEntityStore;

pub type StoreResult<T> = Result<T, StoreError>;

pub trait EntityStore: Send + Sync {
    // -- identity links --------------------------------------------------

    /// Marketplace id linked to a canonical record, if any.
    fn local_id(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<LocalId>>;

    /// Link (or relink) a canonical record to a marketplace id.
    fn link(&self, kind: EntityKind, id: EntityId, local_id: &LocalId) -> StoreResult<()>;

    fn unlink(&self, kind: EntityKind, id: EntityId) -> StoreResult<()>;

    // -- orders ------------------------------------------------------------

    fn find_order(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<Order>>;

    fn find_order_by_local_id(&self, store: &StoreId, local_id: &LocalId) -> StoreResult<Option<Order>>;

    fn load_order(&self, id: EntityId) -> StoreResult<Option<Order>>;

    fn create_order(&self, order: Order) -> StoreResult<Order>;

    /// Replace a stored order.
    fn update_order(&self, order: &Order) -> StoreResult<()>;

    /// Change the status of one order and nothing else.
    fn set_order_status(&self, id: EntityId, status: Option<OrderStatus>) -> StoreResult<()>;

    /// Every order of the split family `order` belongs to, itself included.
    fn family_orders(&self, order: &Order) -> StoreResult<Vec<Order>>;

    fn add_comment(&self, order: EntityId, comment: OrderComment) -> StoreResult<()>;

    fn comments(&self, order: EntityId) -> StoreResult<Vec<OrderComment>>;

    // -- order items -------------------------------------------------------

    fn find_order_item(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<OrderItem>>;

    fn create_order_item(&self, item: OrderItem) -> StoreResult<OrderItem>;

    /// Items of an order in creation order.
    fn order_items(&self, order: EntityId) -> StoreResult<Vec<OrderItem>>;

    // -- parties -----------------------------------------------------------

    fn find_address(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<Address>>;

    fn create_address(&self, store: &StoreId, address: Address) -> StoreResult<Address>;

    fn find_customer(&self, store: &StoreId, email: &str) -> StoreResult<Option<Customer>>;

    fn create_customer(&self, store: &StoreId, customer: Customer) -> StoreResult<Customer>;

    // -- catalog and stock ---------------------------------------------------

    fn find_product(&self, store: &StoreId, sku: &str) -> StoreResult<Option<Product>>;

    fn find_stock_item(&self, store: &StoreId, sku: &str) -> StoreResult<Option<StockItem>>;

    fn update_stock_item(&self, store: &StoreId, item: &StockItem) -> StoreResult<()>;

    /// Whether `attribute` was already moved for this order item.
    fn stock_adjusted(&self, item: EntityId, attribute: StockAttribute) -> StoreResult<bool>;

    fn record_stock_adjustment(&self, item: EntityId, attribute: StockAttribute) -> StoreResult<()>;

    // -- scoped transactions -------------------------------------------------

    /// Open a transaction. Fails with [`StoreError::Conflict`] when `key` is
    /// already open.
    fn begin_transaction(&self, key: &str) -> StoreResult<()>;

    fn commit_transaction(&self, key: &str) -> StoreResult<()>;

    /// Discard every write made since `begin_transaction(key)`.
    fn rollback_transaction(&self, key: &str) -> StoreResult<()>;
}

impl<S> EntityStore for Arc<S>
where
    S: EntityStore + ?Sized,
{
    fn local_id(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<LocalId>> {
        (**self).local_id(kind, id)
    }

    fn link(&self, kind: EntityKind, id: EntityId, local_id: &LocalId) -> StoreResult<()> {
        (**self).link(kind, id, local_id)
    }

    fn unlink(&self, kind: EntityKind, id: EntityId) -> StoreResult<()> {
        (**self).unlink(kind, id)
    }

    fn find_order(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<Order>> {
        (**self).find_order(store, unique_id)
    }

    fn find_order_by_local_id(&self, store: &StoreId, local_id: &LocalId) -> StoreResult<Option<Order>> {
        (**self).find_order_by_local_id(store, local_id)
    }

    fn load_order(&self, id: EntityId) -> StoreResult<Option<Order>> {
        (**self).load_order(id)
    }

    fn create_order(&self, order: Order) -> StoreResult<Order> {
        (**self).create_order(order)
    }

    fn update_order(&self, order: &Order) -> StoreResult<()> {
        (**self).update_order(order)
    }

    fn set_order_status(&self, id: EntityId, status: Option<OrderStatus>) -> StoreResult<()> {
        (**self).set_order_status(id, status)
    }

    fn family_orders(&self, order: &Order) -> StoreResult<Vec<Order>> {
        (**self).family_orders(order)
    }

    fn add_comment(&self, order: EntityId, comment: OrderComment) -> StoreResult<()> {
        (**self).add_comment(order, comment)
    }

    fn comments(&self, order: EntityId) -> StoreResult<Vec<OrderComment>> {
        (**self).comments(order)
    }

    fn find_order_item(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<OrderItem>> {
        (**self).find_order_item(store, unique_id)
    }

    fn create_order_item(&self, item: OrderItem) -> StoreResult<OrderItem> {
        (**self).create_order_item(item)
    }

    fn order_items(&self, order: EntityId) -> StoreResult<Vec<OrderItem>> {
        (**self).order_items(order)
    }

    fn find_address(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<Address>> {
        (**self).find_address(store, unique_id)
    }

    fn create_address(&self, store: &StoreId, address: Address) -> StoreResult<Address> {
        (**self).create_address(store, address)
    }

    fn find_customer(&self, store: &StoreId, email: &str) -> StoreResult<Option<Customer>> {
        (**self).find_customer(store, email)
    }

    fn create_customer(&self, store: &StoreId, customer: Customer) -> StoreResult<Customer> {
        (**self).create_customer(store, customer)
    }

    fn find_product(&self, store: &StoreId, sku: &str) -> StoreResult<Option<Product>> {
        (**self).find_product(store, sku)
    }

    fn find_stock_item(&self, store: &StoreId, sku: &str) -> StoreResult<Option<StockItem>> {
        (**self).find_stock_item(store, sku)
    }

    fn update_stock_item(&self, store: &StoreId, item: &StockItem) -> StoreResult<()> {
        (**self).update_stock_item(store, item)
    }

    fn stock_adjusted(&self, item: EntityId, attribute: StockAttribute) -> StoreResult<bool> {
        (**self).stock_adjusted(item, attribute)
    }

    fn record_stock_adjustment(&self, item: EntityId, attribute: StockAttribute) -> StoreResult<()> {
        (**self).record_stock_adjustment(item, attribute)
    }

    fn begin_transaction(&self, key: &str) -> StoreResult<()> {
        (**self).begin_transaction(key)
    }

    fn commit_transaction(&self, key: &str) -> StoreResult<()> {
        (**self).commit_transaction(key)
    }

    fn rollback_transaction(&self, key: &str) -> StoreResult<()> {
        (**self).rollback_transaction(key)
    }
}
