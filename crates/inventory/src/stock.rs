use serde::{Deserialize, Serialize};

use ordersync_core::{Entity, EntityId, EntityKind};
use ordersync_sales::StatusCategory;

/// Stock counter touched by order status transitions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAttribute {
    Available,
    QtyPreTransit,
}

impl StockAttribute {
    pub fn as_str(self) -> &'static str {
        match self {
            StockAttribute::Available => "available",
            StockAttribute::QtyPreTransit => "qty_pre_transit",
        }
    }

    /// Counter moved by an order entering the given status category.
    ///
    /// Shippable orders commit units to `qty_pre_transit`; closed orders hand
    /// units back to `available`; anything else leaves stock alone.
    pub fn for_category(category: StatusCategory) -> Option<Self> {
        match category {
            StatusCategory::Shippable => Some(StockAttribute::QtyPreTransit),
            StatusCategory::Closed => Some(StockAttribute::Available),
            StatusCategory::Unclassified => None,
        }
    }
}

impl core::fmt::Display for StockAttribute {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock record, keyed by SKU. Owned elsewhere; the sync engine only moves
/// its counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: EntityId,
    pub sku: String,
    pub available: i64,
    pub qty_pre_transit: i64,
}

impl StockItem {
    pub fn new(sku: impl Into<String>, available: i64) -> Self {
        Self {
            id: EntityId::new(),
            sku: sku.into(),
            available,
            qty_pre_transit: 0,
        }
    }

    pub fn get(&self, attribute: StockAttribute) -> i64 {
        match attribute {
            StockAttribute::Available => self.available,
            StockAttribute::QtyPreTransit => self.qty_pre_transit,
        }
    }

    pub fn set(&mut self, attribute: StockAttribute, value: i64) {
        match attribute {
            StockAttribute::Available => self.available = value,
            StockAttribute::QtyPreTransit => self.qty_pre_transit = value,
        }
    }
}

impl Entity for StockItem {
    const KIND: EntityKind = EntityKind::StockItem;

    fn id(&self) -> EntityId {
        self.id
    }

    fn unique_id(&self) -> &str {
        &self.sku
    }
}

/// How repeated adjustments for the same order item are treated.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAdjustMode {
    /// Each (order item, counter) pair is adjusted at most once.
    #[default]
    Idempotent,
    /// Every invocation adds the quantity again, even for a transition that
    /// was already applied.
    Legacy,
}

impl core::str::FromStr for StockAdjustMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idempotent" => Ok(StockAdjustMode::Idempotent),
            "legacy" => Ok(StockAdjustMode::Legacy),
            other => Err(format!("unknown stock adjust mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn categories_map_to_counters() {
        assert_eq!(
            StockAttribute::for_category(StatusCategory::Shippable),
            Some(StockAttribute::QtyPreTransit)
        );
        assert_eq!(
            StockAttribute::for_category(StatusCategory::Closed),
            Some(StockAttribute::Available)
        );
        assert_eq!(StockAttribute::for_category(StatusCategory::Unclassified), None);
    }

    #[test]
    fn adjust_mode_parses_case_insensitively() {
        assert_eq!("Legacy".parse::<StockAdjustMode>(), Ok(StockAdjustMode::Legacy));
        assert_eq!(" idempotent ".parse::<StockAdjustMode>(), Ok(StockAdjustMode::Idempotent));
        assert!("sometimes".parse::<StockAdjustMode>().is_err());
        assert_eq!(StockAdjustMode::default(), StockAdjustMode::Idempotent);
    }

    proptest! {
        #[test]
        fn set_then_get_touches_only_that_counter(value in -1_000i64..1_000, available in 0i64..1_000) {
            let mut stock = StockItem::new("SKU-1", available);
            stock.set(StockAttribute::QtyPreTransit, value);
            prop_assert_eq!(stock.get(StockAttribute::QtyPreTransit), value);
            prop_assert_eq!(stock.get(StockAttribute::Available), available);
        }
    }
}
