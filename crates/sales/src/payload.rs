//! Raw marketplace order payload.
//!
//! The marketplace returns loosely structured JSON: most fields are optional,
//! ids and postcodes arrive as either numbers or strings, and money arrives as
//! JSON numbers or decimal strings. These types accept all of that and leave
//! the interpretation to the reconciliation code.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use ordersync_core::LocalId;

use crate::order::OrderStatus;
use crate::totals::TotalCode;

/// Full order detail as returned by the marketplace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderPayload {
    pub order_id: LocalId,
    #[serde(default)]
    pub marketplace_id: Option<LocalId>,
    #[serde(deserialize_with = "text")]
    pub marketplace_order_reference: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "list")]
    pub addresses: Vec<RawAddress>,
    #[serde(default, deserialize_with = "list")]
    pub order_items: Vec<RawOrderItem>,
    #[serde(default)]
    pub marketplace_to_local_exchange_rate_applied: Option<Decimal>,
    #[serde(default)]
    pub marketplace_to_local_exchange_rate_estimated: Option<Decimal>,
}

impl OrderPayload {
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn status(&self) -> Option<OrderStatus> {
        self.status.as_deref().map(OrderStatus::from)
    }

    /// Marketplace-to-local exchange rate: applied, else estimated, else zero.
    pub fn exchange_rate(&self) -> Decimal {
        self.marketplace_to_local_exchange_rate_applied
            .or(self.marketplace_to_local_exchange_rate_estimated)
            .unwrap_or(Decimal::ZERO)
    }

    /// Parse `created_at` (RFC 3339 or `YYYY-MM-DD HH:MM:SS` in UTC).
    pub fn placed_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// One entry of the multi-locale address list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawAddress {
    #[serde(default)]
    pub address_id: Option<LocalId>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact_email_1: Option<String>,
    #[serde(default)]
    pub address_line_1: Option<String>,
    #[serde(default)]
    pub address_line_2: Option<String>,
    #[serde(default)]
    pub address_line_3: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub contact_phone_1: Option<String>,
}

/// One order line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawOrderItem {
    #[serde(default)]
    pub order_item_id: Option<LocalId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_integer")]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub item: Option<RawItem>,
    #[serde(default)]
    pub local_order_item_financials: Option<RawFinancials>,
    #[serde(default)]
    pub shipping_type: Option<String>,
}

impl RawOrderItem {
    /// Financial field for a total code, if the marketplace supplied it.
    pub fn financial(&self, code: TotalCode) -> Option<Decimal> {
        self.local_order_item_financials
            .as_ref()
            .and_then(|financials| financials.get(code))
    }
}

/// Catalog reference of an order line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawItem {
    #[serde(default)]
    pub item_id: Option<LocalId>,
    #[serde(default)]
    pub variation_id: Option<LocalId>,
    #[serde(default)]
    pub master_sku: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub weight: Option<Decimal>,
}

/// Pre-computed per-line money in the local currency.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFinancials {
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub payment: Option<Decimal>,
    #[serde(default)]
    pub tax: Option<Decimal>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub shipping: Option<Decimal>,
    #[serde(default)]
    pub weight: Option<Decimal>,
}

impl RawFinancials {
    pub fn get(&self, code: TotalCode) -> Option<Decimal> {
        match code {
            TotalCode::Discount => self.discount,
            TotalCode::Payment => self.payment,
            TotalCode::Price => self.price,
            TotalCode::Shipping => self.shipping,
            TotalCode::Tax => self.tax,
            TotalCode::Weight => self.weight,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl TextOrNumber {
    fn into_text(self) -> String {
        match self {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Signed(n) => n.to_string(),
            TextOrNumber::Unsigned(n) => n.to_string(),
        }
    }
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    TextOrNumber::deserialize(deserializer).map(TextOrNumber::into_text)
}

fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(TextOrNumber::into_text))
}

fn opt_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<TextOrNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(TextOrNumber::Signed(n)) => Ok(Some(n)),
        Some(TextOrNumber::Unsigned(n)) => i64::try_from(n)
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(TextOrNumber::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
