use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ordersync_core::{Entity, EntityId, EntityKind, StoreId, StoreScoped};

/// Marketplace order status.
///
/// Statuses are tracked, not validated: anything the marketplace sends is
/// kept, unknown values land in [`OrderStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    Paid,
    PartiallyShipped,
    Shipped,
    Completed,
    Closed,
    WaitSellerDelivery,
    WaitSellerSendGoods,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::Paid => "paid",
            OrderStatus::PartiallyShipped => "partially_shipped",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Closed => "closed",
            OrderStatus::WaitSellerDelivery => "wait_seller_delivery",
            OrderStatus::WaitSellerSendGoods => "wait_seller_send_goods",
            OrderStatus::Other(other) => other,
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self {
        match value {
            "paid" => OrderStatus::Paid,
            "partially_shipped" => OrderStatus::PartiallyShipped,
            "shipped" => OrderStatus::Shipped,
            "completed" => OrderStatus::Completed,
            "closed" => OrderStatus::Closed,
            "wait_seller_delivery" => OrderStatus::WaitSellerDelivery,
            "wait_seller_send_goods" => OrderStatus::WaitSellerSendGoods,
            other => OrderStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        OrderStatus::from(value.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side-effect family a status belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Shippable,
    Closed,
    Unclassified,
}

/// Status classification tables.
///
/// Built once at startup and passed by reference to everything that needs
/// to classify a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRules {
    pub shippable: BTreeSet<OrderStatus>,
    pub closed: BTreeSet<OrderStatus>,
    /// Never imported.
    pub excluded: BTreeSet<OrderStatus>,
    /// Not imported on the very first sync (cursor == 1).
    pub initial_excluded: BTreeSet<OrderStatus>,
}

impl Default for StatusRules {
    fn default() -> Self {
        Self {
            shippable: BTreeSet::from([
                OrderStatus::Paid,
                OrderStatus::PartiallyShipped,
                OrderStatus::WaitSellerDelivery,
                OrderStatus::WaitSellerSendGoods,
            ]),
            closed: BTreeSet::from([OrderStatus::Closed]),
            excluded: BTreeSet::from([
                OrderStatus::Shipped,
                OrderStatus::Completed,
                OrderStatus::Closed,
            ]),
            initial_excluded: BTreeSet::from([
                OrderStatus::PartiallyShipped,
                OrderStatus::Shipped,
                OrderStatus::Completed,
                OrderStatus::Closed,
            ]),
        }
    }
}

impl StatusRules {
    /// Cursor value of a sync that has never completed.
    pub const FIRST_SYNC_CURSOR: u64 = 1;

    pub fn is_shippable(&self, status: Option<&OrderStatus>) -> bool {
        status.is_some_and(|s| self.shippable.contains(s))
    }

    pub fn is_closed(&self, status: Option<&OrderStatus>) -> bool {
        status.is_some_and(|s| self.closed.contains(s))
    }

    pub fn category(&self, status: Option<&OrderStatus>) -> StatusCategory {
        if self.is_shippable(status) {
            StatusCategory::Shippable
        } else if self.is_closed(status) {
            StatusCategory::Closed
        } else {
            StatusCategory::Unclassified
        }
    }

    /// Retrieval filter applied to every fetched payload.
    pub fn should_retrieve(&self, status: Option<&OrderStatus>, cursor: u64) -> bool {
        let Some(status) = status else {
            return true;
        };
        if self.excluded.contains(status) {
            return false;
        }
        !(cursor == Self::FIRST_SYNC_CURSOR && self.initial_excluded.contains(status))
    }
}

/// Payment summary: method code plus the amount actually paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: String,
    pub amount: Decimal,
}

/// Deterministic order unique id: `prefix + marketplace reference`.
pub fn order_unique_id(prefix: &str, marketplace_reference: &str) -> String {
    format!("{prefix}{marketplace_reference}")
}

/// Canonical order record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: EntityId,
    pub store_id: StoreId,
    pub unique_id: String,
    pub status: Option<OrderStatus>,
    /// Write-once: never replaced after the first non-null value.
    pub grand_total: Option<Decimal>,
    pub base_to_currency_rate: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    pub tax_total: Decimal,
    pub weight_total: Decimal,
    pub payment: Option<PaymentInfo>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_method: Option<String>,
    pub billing_address: Option<EntityId>,
    pub shipping_address: Option<EntityId>,
    pub customer: Option<EntityId>,
    /// Root of a split-order family; `None` for the root itself.
    pub original_order: Option<EntityId>,
    pub placed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(id: EntityId, store_id: StoreId, unique_id: impl Into<String>, data: OrderData) -> Self {
        let mut order = Self {
            id,
            store_id,
            unique_id: unique_id.into(),
            status: None,
            grand_total: None,
            base_to_currency_rate: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            shipping_total: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            weight_total: Decimal::ZERO,
            payment: None,
            customer_name: None,
            customer_email: None,
            shipping_method: None,
            billing_address: None,
            shipping_address: None,
            customer: None,
            original_order: None,
            placed_at: None,
        };
        data.apply_to(&mut order);
        order
    }

    /// Id of the order every split sibling hangs off.
    pub fn family_root(&self) -> EntityId {
        self.original_order.unwrap_or(self.id)
    }
}

impl Entity for Order {
    const KIND: EntityKind = EntityKind::Order;

    fn id(&self) -> EntityId {
        self.id
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }
}

impl StoreScoped for Order {
    fn store_id(&self) -> &StoreId {
        &self.store_id
    }
}

/// Order attributes derived from a payload, applied on create and on update.
///
/// Reference fields (`billing_address`, `shipping_address`, `customer`) and
/// `grand_total` only overwrite when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderData {
    pub status: Option<OrderStatus>,
    pub grand_total: Option<Decimal>,
    pub base_to_currency_rate: Decimal,
    pub discount_total: Decimal,
    pub shipping_total: Decimal,
    pub tax_total: Decimal,
    pub weight_total: Decimal,
    pub payment: Option<PaymentInfo>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub shipping_method: Option<String>,
    pub billing_address: Option<EntityId>,
    pub shipping_address: Option<EntityId>,
    pub customer: Option<EntityId>,
    pub placed_at: Option<DateTime<Utc>>,
}

impl OrderData {
    /// Drop write-once attributes the stored order already carries.
    pub fn without_write_once(mut self, existing: &Order) -> Self {
        if existing.grand_total.is_some() {
            self.grand_total = None;
        }
        self
    }

    pub fn apply_to(self, order: &mut Order) {
        order.status = self.status;
        if self.grand_total.is_some() {
            order.grand_total = self.grand_total;
        }
        order.base_to_currency_rate = self.base_to_currency_rate;
        order.discount_total = self.discount_total;
        order.shipping_total = self.shipping_total;
        order.tax_total = self.tax_total;
        order.weight_total = self.weight_total;
        order.payment = self.payment;
        order.customer_name = self.customer_name;
        order.customer_email = self.customer_email;
        order.shipping_method = self.shipping_method;
        if self.billing_address.is_some() {
            order.billing_address = self.billing_address;
        }
        if self.shipping_address.is_some() {
            order.shipping_address = self.shipping_address;
        }
        if self.customer.is_some() {
            order.customer = self.customer;
        }
        order.placed_at = self.placed_at;
    }
}

/// Free-text audit comment attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderComment {
    pub author: String,
    pub title: String,
    pub body: String,
}

impl OrderComment {
    pub const INITIAL_SYNC: &'static str = "Initial sync";
    pub const STATUS_CHANGE: &'static str = "Status change";
    pub const UNLINKED_ORDER: &'static str = "Unlinked order";

    pub fn initial_sync(author: &str, unique_id: &str) -> Self {
        Self {
            author: author.to_string(),
            title: Self::INITIAL_SYNC.to_string(),
            body: format!("Order #{unique_id} synced."),
        }
    }

    pub fn status_change(
        author: &str,
        unique_id: &str,
        old: Option<&OrderStatus>,
        new: Option<&OrderStatus>,
    ) -> Self {
        let old = old.map(OrderStatus::as_str).unwrap_or_default();
        let new = new.map(OrderStatus::as_str).unwrap_or_default();
        Self {
            author: author.to_string(),
            title: Self::STATUS_CHANGE.to_string(),
            body: format!("Order #{unique_id} moved from {old} to {new}"),
        }
    }

    pub fn unlinked(author: &str, unique_id: &str) -> Self {
        Self {
            author: author.to_string(),
            title: Self::UNLINKED_ORDER.to_string(),
            body: format!("Order #{unique_id} existed without a marketplace link and was relinked."),
        }
    }
}
