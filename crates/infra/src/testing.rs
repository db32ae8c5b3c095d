//! Recording fakes of the remote ports, shared by unit and integration tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Value as JsonValue, json};

use ordersync_core::{EntityId, EntityKind, LocalId, StoreId};
use ordersync_inventory::{Product, StockAttribute, StockItem};
use ordersync_parties::{Address, Customer};
use ordersync_sales::{Order, OrderComment, OrderItem, OrderStatus};

use crate::error::{ApiError, StoreError};
use crate::external::{ApiResult, CommercePlatform, CreditMemoData, MarketplaceApi, ShipmentLine};
use crate::store::{EntityStore, InMemoryEntityStore, StoreResult};

#[derive(Default)]
pub struct FakeMarketplace {
    listings: Mutex<VecDeque<ApiResult<JsonValue>>>,
    orders: Mutex<BTreeMap<String, JsonValue>>,
    listed_since: Mutex<Vec<u64>>,
    stock_calls: Mutex<Vec<(String, i64)>>,
    stored_quantity: Mutex<Option<i64>>,
}

impl FakeMarketplace {
    pub fn push_listing(&self, listing: JsonValue) {
        self.listings.lock().unwrap().push_back(Ok(listing));
    }

    pub fn push_listing_error(&self, message: &str) {
        self.listings
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Transport(message.to_string())));
    }

    pub fn put_order(&self, local_id: &str, detail: JsonValue) {
        self.orders.lock().unwrap().insert(local_id.to_string(), detail);
    }

    pub fn remove_order(&self, local_id: &str) {
        self.orders.lock().unwrap().remove(local_id);
    }

    pub fn listed_since(&self) -> Vec<u64> {
        self.listed_since.lock().unwrap().clone()
    }

    /// `("id:<local>" | "sku:<sku>", quantity)` per stock call.
    pub fn stock_calls(&self) -> Vec<(String, i64)> {
        self.stock_calls.lock().unwrap().clone()
    }

    /// Make stock calls report `quantity` instead of echoing the request.
    pub fn store_quantity(&self, quantity: i64) {
        *self.stored_quantity.lock().unwrap() = Some(quantity);
    }

    fn record_stock(&self, key: String, quantity: i64) -> ApiResult<i64> {
        self.stock_calls.lock().unwrap().push((key, quantity));
        Ok(self.stored_quantity.lock().unwrap().unwrap_or(quantity))
    }
}

impl MarketplaceApi for FakeMarketplace {
    fn list_changed_order_ids(&self, since_id: u64) -> ApiResult<JsonValue> {
        self.listed_since.lock().unwrap().push(since_id);
        self.listings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({ "localOrderIds": [] })))
    }

    fn get_order(&self, local_id: &LocalId) -> ApiResult<JsonValue> {
        self.orders
            .lock()
            .unwrap()
            .get(local_id.as_str())
            .cloned()
            .ok_or_else(|| ApiError::Rejected {
                status: 404,
                message: format!("order {local_id} not found"),
            })
    }

    fn set_stock_by_local_id(&self, local_id: &LocalId, quantity: i64) -> ApiResult<i64> {
        self.record_stock(format!("id:{local_id}"), quantity)
    }

    fn set_stock_by_sku(&self, sku: &str, quantity: i64) -> ApiResult<i64> {
        self.record_stock(format!("sku:{sku}"), quantity)
    }
}

pub type ShipmentCall = (String, Option<Vec<ShipmentLine>>);

pub struct FakePlatform {
    shipment_response: Mutex<JsonValue>,
    credit_memo_response: Mutex<JsonValue>,
    shipments: Mutex<Vec<ShipmentCall>>,
    trackings: Mutex<Vec<(String, String, String, String)>>,
    credit_memos: Mutex<Vec<(String, CreditMemoData)>>,
    credit_memo_comments: Mutex<Vec<(String, String)>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            shipment_response: Mutex::new(json!({ "shipmentIncrementId": "100000001" })),
            credit_memo_response: Mutex::new(json!({ "result": "200000001" })),
            shipments: Mutex::default(),
            trackings: Mutex::default(),
            credit_memos: Mutex::default(),
            credit_memo_comments: Mutex::default(),
        }
    }
}

impl FakePlatform {
    pub fn set_shipment_response(&self, response: JsonValue) {
        *self.shipment_response.lock().unwrap() = response;
    }

    pub fn set_credit_memo_response(&self, response: JsonValue) {
        *self.credit_memo_response.lock().unwrap() = response;
    }

    pub fn shipments(&self) -> Vec<ShipmentCall> {
        self.shipments.lock().unwrap().clone()
    }

    pub fn trackings(&self) -> Vec<(String, String, String, String)> {
        self.trackings.lock().unwrap().clone()
    }

    pub fn credit_memos(&self) -> Vec<(String, CreditMemoData)> {
        self.credit_memos.lock().unwrap().clone()
    }

    pub fn credit_memo_comments(&self) -> Vec<(String, String)> {
        self.credit_memo_comments.lock().unwrap().clone()
    }
}

impl CommercePlatform for FakePlatform {
    fn create_shipment(
        &self,
        order_ref: &str,
        items: Option<&[ShipmentLine]>,
        _comment: Option<&str>,
        _notify: bool,
        _include_comment: bool,
    ) -> ApiResult<JsonValue> {
        self.shipments
            .lock()
            .unwrap()
            .push((order_ref.to_string(), items.map(<[ShipmentLine]>::to_vec)));
        Ok(self.shipment_response.lock().unwrap().clone())
    }

    fn add_tracking(&self, shipment_id: &str, carrier: &str, title: &str, number: &str) -> ApiResult<()> {
        self.trackings.lock().unwrap().push((
            shipment_id.to_string(),
            carrier.to_string(),
            title.to_string(),
            number.to_string(),
        ));
        Ok(())
    }

    fn create_credit_memo(&self, order_ref: &str, data: &CreditMemoData) -> ApiResult<JsonValue> {
        self.credit_memos
            .lock()
            .unwrap()
            .push((order_ref.to_string(), data.clone()));
        Ok(self.credit_memo_response.lock().unwrap().clone())
    }

    fn add_credit_memo_comment(&self, credit_memo_id: &str, comment: &str) -> ApiResult<()> {
        self.credit_memo_comments
            .lock()
            .unwrap()
            .push((credit_memo_id.to_string(), comment.to_string()));
        Ok(())
    }
}

/// In-memory store with writes that can be switched to fail.
#[derive(Debug, Default)]
pub struct FaultyStore {
    pub inner: InMemoryEntityStore,
    pub fail_items: AtomicBool,
    pub fail_order_update: AtomicBool,
    pub fail_stock_ledger: AtomicBool,
}

fn injected(flag: &AtomicBool) -> StoreResult<()> {
    if flag.load(Ordering::SeqCst) {
        return Err(StoreError::Backend(anyhow::anyhow!("disk full")));
    }
    Ok(())
}

impl EntityStore for FaultyStore {
    fn local_id(&self, kind: EntityKind, id: EntityId) -> StoreResult<Option<LocalId>> {
        self.inner.local_id(kind, id)
    }
    fn link(&self, kind: EntityKind, id: EntityId, local_id: &LocalId) -> StoreResult<()> {
        self.inner.link(kind, id, local_id)
    }
    fn unlink(&self, kind: EntityKind, id: EntityId) -> StoreResult<()> {
        self.inner.unlink(kind, id)
    }
    fn find_order(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<Order>> {
        self.inner.find_order(store, unique_id)
    }
    fn find_order_by_local_id(&self, store: &StoreId, local_id: &LocalId) -> StoreResult<Option<Order>> {
        self.inner.find_order_by_local_id(store, local_id)
    }
    fn load_order(&self, id: EntityId) -> StoreResult<Option<Order>> {
        self.inner.load_order(id)
    }
    fn create_order(&self, order: Order) -> StoreResult<Order> {
        self.inner.create_order(order)
    }
    fn update_order(&self, order: &Order) -> StoreResult<()> {
        injected(&self.fail_order_update)?;
        self.inner.update_order(order)
    }
    fn set_order_status(&self, id: EntityId, status: Option<OrderStatus>) -> StoreResult<()> {
        self.inner.set_order_status(id, status)
    }
    fn family_orders(&self, order: &Order) -> StoreResult<Vec<Order>> {
        self.inner.family_orders(order)
    }
    fn add_comment(&self, order: EntityId, comment: OrderComment) -> StoreResult<()> {
        self.inner.add_comment(order, comment)
    }
    fn comments(&self, order: EntityId) -> StoreResult<Vec<OrderComment>> {
        self.inner.comments(order)
    }
    fn find_order_item(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<OrderItem>> {
        self.inner.find_order_item(store, unique_id)
    }
    fn create_order_item(&self, item: OrderItem) -> StoreResult<OrderItem> {
        injected(&self.fail_items)?;
        self.inner.create_order_item(item)
    }
    fn order_items(&self, order: EntityId) -> StoreResult<Vec<OrderItem>> {
        self.inner.order_items(order)
    }
    fn find_address(&self, store: &StoreId, unique_id: &str) -> StoreResult<Option<Address>> {
        self.inner.find_address(store, unique_id)
    }
    fn create_address(&self, store: &StoreId, address: Address) -> StoreResult<Address> {
        self.inner.create_address(store, address)
    }
    fn find_customer(&self, store: &StoreId, email: &str) -> StoreResult<Option<Customer>> {
        self.inner.find_customer(store, email)
    }
    fn create_customer(&self, store: &StoreId, customer: Customer) -> StoreResult<Customer> {
        self.inner.create_customer(store, customer)
    }
    fn find_product(&self, store: &StoreId, sku: &str) -> StoreResult<Option<Product>> {
        self.inner.find_product(store, sku)
    }
    fn find_stock_item(&self, store: &StoreId, sku: &str) -> StoreResult<Option<StockItem>> {
        self.inner.find_stock_item(store, sku)
    }
    fn update_stock_item(&self, store: &StoreId, item: &StockItem) -> StoreResult<()> {
        self.inner.update_stock_item(store, item)
    }
    fn stock_adjusted(&self, item: EntityId, attribute: StockAttribute) -> StoreResult<bool> {
        self.inner.stock_adjusted(item, attribute)
    }
    fn record_stock_adjustment(&self, item: EntityId, attribute: StockAttribute) -> StoreResult<()> {
        injected(&self.fail_stock_ledger)?;
        self.inner.record_stock_adjustment(item, attribute)
    }
    fn begin_transaction(&self, key: &str) -> StoreResult<()> {
        self.inner.begin_transaction(key)
    }
    fn commit_transaction(&self, key: &str) -> StoreResult<()> {
        self.inner.commit_transaction(key)
    }
    fn rollback_transaction(&self, key: &str) -> StoreResult<()> {
        self.inner.rollback_transaction(key)
    }
}
