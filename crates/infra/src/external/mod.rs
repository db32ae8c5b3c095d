//! Remote API ports.
//!
//! Both remote systems are reached through blocking traits; HTTP clients,
//! signing and retries live behind them. Responses that the engine has to
//! interpret are returned as raw JSON.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

use ordersync_core::LocalId;

use crate::error::ApiError;

pub type ApiResult<T> = Result<T, ApiError>;

/// The upstream marketplace.
pub trait MarketplaceApi: Send + Sync {
    /// `{ "localOrderIds": [...], "newSinceId": n }` for orders changed since `since_id`.
    fn list_changed_order_ids(&self, since_id: u64) -> ApiResult<JsonValue>;

    /// Full order detail.
    fn get_order(&self, local_id: &LocalId) -> ApiResult<JsonValue>;

    /// Set the sellable quantity of a linked stock item; returns the stored quantity.
    fn set_stock_by_local_id(&self, local_id: &LocalId, quantity: i64) -> ApiResult<i64>;

    /// Set the sellable quantity by SKU; returns the stored quantity.
    fn set_stock_by_sku(&self, sku: &str, quantity: i64) -> ApiResult<i64>;
}

/// One line of a shipment or credit memo, keyed by the marketplace item id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentLine {
    pub order_item_id: LocalId,
    pub qty: i64,
}

/// Credit memo sent to the commerce platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditMemoData {
    pub items: Vec<ShipmentLine>,
    pub comment: Option<String>,
    pub notify: bool,
    pub include_comment: bool,
    pub shipping_amount: Decimal,
    pub adjustment_positive: Decimal,
    pub adjustment_negative: Decimal,
    pub refund_customer_balance: Decimal,
}

/// The downstream commerce platform that fulfils orders.
pub trait CommercePlatform: Send + Sync {
    /// Ship `items` (every item when `None`) of the order `order_ref`.
    fn create_shipment(
        &self,
        order_ref: &str,
        items: Option<&[ShipmentLine]>,
        comment: Option<&str>,
        notify: bool,
        include_comment: bool,
    ) -> ApiResult<JsonValue>;

    fn add_tracking(&self, shipment_id: &str, carrier: &str, title: &str, number: &str) -> ApiResult<()>;

    fn create_credit_memo(&self, order_ref: &str, data: &CreditMemoData) -> ApiResult<JsonValue>;

    fn add_credit_memo_comment(&self, credit_memo_id: &str, comment: &str) -> ApiResult<()>;
}

impl<T> MarketplaceApi for Arc<T>
where
    T: MarketplaceApi + ?Sized,
{
    fn list_changed_order_ids(&self, since_id: u64) -> ApiResult<JsonValue> {
        (**self).list_changed_order_ids(since_id)
    }

    fn get_order(&self, local_id: &LocalId) -> ApiResult<JsonValue> {
        (**self).get_order(local_id)
    }

    fn set_stock_by_local_id(&self, local_id: &LocalId, quantity: i64) -> ApiResult<i64> {
        (**self).set_stock_by_local_id(local_id, quantity)
    }

    fn set_stock_by_sku(&self, sku: &str, quantity: i64) -> ApiResult<i64> {
        (**self).set_stock_by_sku(sku, quantity)
    }
}

impl<T> CommercePlatform for Arc<T>
where
    T: CommercePlatform + ?Sized,
{
    fn create_shipment(
        &self,
        order_ref: &str,
        items: Option<&[ShipmentLine]>,
        comment: Option<&str>,
        notify: bool,
        include_comment: bool,
    ) -> ApiResult<JsonValue> {
        (**self).create_shipment(order_ref, items, comment, notify, include_comment)
    }

    fn add_tracking(&self, shipment_id: &str, carrier: &str, title: &str, number: &str) -> ApiResult<()> {
        (**self).add_tracking(shipment_id, carrier, title, number)
    }

    fn create_credit_memo(&self, order_ref: &str, data: &CreditMemoData) -> ApiResult<JsonValue> {
        (**self).create_credit_memo(order_ref, data)
    }

    fn add_credit_memo_comment(&self, credit_memo_id: &str, comment: &str) -> ApiResult<()> {
        (**self).add_credit_memo_comment(credit_memo_id, comment)
    }
}

/// Pull an id out of a platform response.
///
/// Accepts an object carrying `field`, any other object (first value), an
/// array (first element) or a bare scalar. Empty strings, `null` and `false`
/// count as no id.
pub fn extract_response_id(response: &JsonValue, field: &str) -> Option<String> {
    let candidate = match response {
        JsonValue::Object(map) => map.get(field).or_else(|| map.values().next()),
        JsonValue::Array(values) => values.first(),
        scalar => Some(scalar),
    }?;

    match candidate {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
