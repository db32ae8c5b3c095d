//! Outbound order actions (shipments, credit memos).
//!
//! Actions reference order items by canonical id; the executor translates
//! them to marketplace ids before calling the commerce platform.

pub mod executor;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use ordersync_core::EntityId;

use crate::error::{PayloadError, SyncError};

pub use executor::{ActionExecutor, ActionOutcome};

/// Order item id → quantity; `None` (or zero) means the full ordered quantity.
pub type ItemQuantities = BTreeMap<EntityId, Option<i64>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShipRequest {
    pub comment: Option<String>,
    pub notify: bool,
    #[serde(alias = "send_comment")]
    pub include_comment: bool,
    /// `None` ships every linked item.
    pub items: Option<ItemQuantities>,
    pub tracking_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CreditMemoRequest {
    pub comment: Option<String>,
    pub notify: bool,
    #[serde(alias = "send_comment")]
    pub include_comment: bool,
    /// `None` (or empty) refunds every item.
    pub items: Option<ItemQuantities>,
    pub shipping_refund: Decimal,
    pub credit_refund: Decimal,
    pub adjustment_positive: Decimal,
    pub adjustment_negative: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Ship(ShipRequest),
    CreditMemo(CreditMemoRequest),
    /// Anything else; executing it fails with an unsupported-action error.
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub order_id: EntityId,
    pub kind: ActionKind,
}

impl Action {
    /// Build an action from its type name and JSON data.
    pub fn parse(order_id: EntityId, action_type: &str, data: JsonValue) -> Result<Self, SyncError> {
        let data = if data.is_null() { JsonValue::Object(Default::default()) } else { data };
        let kind = match action_type {
            "ship" => ActionKind::Ship(serde_json::from_value(data).map_err(PayloadError::from)?),
            "refund" | "creditmemo" => {
                ActionKind::CreditMemo(serde_json::from_value(data).map_err(PayloadError::from)?)
            }
            other => ActionKind::Other(other.to_string()),
        };
        Ok(Self { order_id, kind })
    }

    pub fn type_name(&self) -> &str {
        match &self.kind {
            ActionKind::Ship(_) => "ship",
            ActionKind::CreditMemo(_) => "creditmemo",
            ActionKind::Other(name) => name,
        }
    }
}
