//! Order-level financial aggregation.
//!
//! Line financials arrive pre-computed from the marketplace; this module only
//! sums them. The grand total is the **payment** total: `price` does not
//! include promotions applied at payment time.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ordersync_core::{DomainError, DomainResult};

use crate::payload::{OrderPayload, RawOrderItem};

/// Financial field codes summed per order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalCode {
    Discount,
    Payment,
    Price,
    Shipping,
    Tax,
    Weight,
}

impl TotalCode {
    pub const GRAND_TOTAL_BASE: TotalCode = TotalCode::Payment;

    pub fn as_str(self) -> &'static str {
        match self {
            TotalCode::Discount => "discount",
            TotalCode::Payment => "payment",
            TotalCode::Price => "price",
            TotalCode::Shipping => "shipping",
            TotalCode::Tax => "tax",
            TotalCode::Weight => "weight",
        }
    }

    /// Attribute name of the order-level total, e.g. `tax_total`.
    pub fn total_key(self) -> String {
        format!("{}_total", self.as_str())
    }
}

/// Which codes to sum and whether each is a per-unit value (× quantity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalCodes(BTreeMap<TotalCode, bool>);

impl Default for TotalCodes {
    fn default() -> Self {
        Self(BTreeMap::from([
            (TotalCode::Discount, false),
            (TotalCode::Payment, false),
            (TotalCode::Price, true),
            (TotalCode::Shipping, false),
            (TotalCode::Tax, false),
            (TotalCode::Weight, false),
        ]))
    }
}

impl TotalCodes {
    pub fn new(codes: impl IntoIterator<Item = (TotalCode, bool)>) -> Self {
        Self(codes.into_iter().collect())
    }

    pub fn is_per_item(&self, code: TotalCode) -> bool {
        self.0.get(&code).copied().unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TotalCode, bool)> + '_ {
        self.0.iter().map(|(code, per_item)| (*code, *per_item))
    }
}

/// Aggregated order financials.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderTotals {
    totals: BTreeMap<TotalCode, Decimal>,
    pub base_to_currency_rate: Decimal,
}

impl OrderTotals {
    pub fn get(&self, code: TotalCode) -> Decimal {
        self.totals.get(&code).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn grand_total(&self) -> Decimal {
        self.get(TotalCode::GRAND_TOTAL_BASE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TotalCode, Decimal)> + '_ {
        self.totals.iter().map(|(code, total)| (*code, *total))
    }
}

#[derive(Default)]
struct Accumulator {
    totals: BTreeMap<TotalCode, Decimal>,
    weighted_rate: Decimal,
    weight: Decimal,
}

/// Sum line financials.
///
/// Lines without a quantity or an item reference are ignored. The exchange
/// rate is averaged over lines weighted by their price total; a zero rate
/// contributes nothing. Totals beyond the `Decimal` range are an error.
pub fn aggregate(items: &[RawOrderItem], codes: &TotalCodes, exchange_rate: Decimal) -> DomainResult<OrderTotals> {
    let overflow = |code: &str| DomainError::overflow(format!("order {code} total"));
    let mut acc = Accumulator {
        totals: codes.iter().map(|(code, _)| (code, Decimal::ZERO)).collect(),
        ..Accumulator::default()
    };

    let lines = items
        .iter()
        .filter_map(|line| line.quantity.filter(|_| line.item.is_some()).map(|q| (line, q)));
    for (line, quantity) in lines {
        let mut price_row = Decimal::ZERO;
        for (code, per_item) in codes.iter() {
            let Some(value) = line.financial(code) else {
                continue;
            };
            let row = if per_item {
                value
                    .checked_mul(Decimal::from(quantity))
                    .ok_or_else(|| overflow(code.as_str()))?
            } else {
                value
            };
            if code == TotalCode::Price {
                price_row = row;
            }
            let total = acc.totals.entry(code).or_insert(Decimal::ZERO);
            *total = total.checked_add(row).ok_or_else(|| overflow(code.as_str()))?;
        }

        if exchange_rate > Decimal::ZERO {
            acc.weighted_rate = exchange_rate
                .checked_mul(price_row)
                .and_then(|row| acc.weighted_rate.checked_add(row))
                .ok_or_else(|| overflow("exchange rate"))?;
            acc.weight = acc
                .weight
                .checked_add(price_row)
                .ok_or_else(|| overflow("exchange rate"))?;
        }
    }

    let base_to_currency_rate = if acc.weight > Decimal::ZERO {
        acc.weighted_rate / acc.weight
    } else {
        Decimal::ZERO
    };

    Ok(OrderTotals {
        totals: acc.totals,
        base_to_currency_rate,
    })
}

impl OrderPayload {
    /// Aggregate this payload's line financials.
    pub fn totals(&self, codes: &TotalCodes) -> DomainResult<OrderTotals> {
        aggregate(&self.order_items, codes, self.exchange_rate())
    }
}
