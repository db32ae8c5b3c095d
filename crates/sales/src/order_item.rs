use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ordersync_core::{DomainError, DomainResult, Entity, EntityId, EntityKind, LocalId, StoreId, StoreScoped};

use crate::bundle::BundleSku;
use crate::payload::RawOrderItem;
use crate::totals::TotalCode;

/// Deterministic order item unique id: `<order unique>-<sku>-<local item id>`.
pub fn order_item_unique_id(order_unique_id: &str, sku: &str, local_id: Option<&LocalId>) -> String {
    let local = local_id.map(LocalId::as_str).unwrap_or_default();
    format!("{order_unique_id}-{sku}-{local}")
}

/// Canonical order line record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: EntityId,
    pub order_id: EntityId,
    pub store_id: StoreId,
    pub unique_id: String,
    /// Base SKU after bundle decomposition.
    pub sku: String,
    pub product_name: String,
    pub product: Option<EntityId>,
    pub is_physical: bool,
    pub bundle_multiplier: u32,
    /// Raw quantity × bundle multiplier.
    pub quantity: i64,
    pub item_price: Decimal,
    pub total_price: Decimal,
    pub total_tax: Decimal,
    pub total_discount: Decimal,
    pub item_tax: Decimal,
    pub item_discount: Decimal,
    pub weight: Decimal,
}

impl Entity for OrderItem {
    const KIND: EntityKind = EntityKind::OrderItem;

    fn id(&self) -> EntityId {
        self.id
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }
}

impl StoreScoped for OrderItem {
    fn store_id(&self) -> &StoreId {
        &self.store_id
    }
}

/// Quantities and money of one line, normalised for bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFigures {
    pub quantity: i64,
    pub item_price: Decimal,
    pub total_price: Decimal,
    pub total_tax: Decimal,
    pub total_discount: Decimal,
    pub item_tax: Decimal,
    pub item_discount: Decimal,
    pub weight: Decimal,
}

impl ItemFigures {
    /// Derive line figures.
    ///
    /// The marketplace prices one *bundle*; `item_price` is per base unit.
    /// `total_price` is the paid amount, not the list price.
    pub fn from_line(line: &RawOrderItem, bundle: &BundleSku) -> DomainResult<Self> {
        let multiplier = Decimal::from(bundle.multiplier());
        let quantity = line
            .quantity
            .unwrap_or(0)
            .checked_mul(i64::from(bundle.multiplier()))
            .ok_or_else(|| DomainError::overflow(format!("quantity of {}", bundle.base_sku)))?;
        let field = |code| line.financial(code).unwrap_or(Decimal::ZERO);

        let total_tax = field(TotalCode::Tax);
        let total_discount = field(TotalCode::Discount);
        let per_unit = |total: Decimal| {
            if quantity > 0 {
                total / Decimal::from(quantity)
            } else {
                Decimal::ZERO
            }
        };

        Ok(Self {
            quantity,
            item_price: field(TotalCode::Price) / multiplier,
            total_price: field(TotalCode::Payment),
            total_tax,
            total_discount,
            item_tax: per_unit(total_tax),
            item_discount: per_unit(total_discount),
            weight: line
                .item
                .as_ref()
                .and_then(|item| item.weight)
                .unwrap_or(Decimal::ZERO),
        })
    }
}

/// Attributes of a new order item, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub unique_id: String,
    pub sku: String,
    pub product_name: String,
    pub product: Option<EntityId>,
    pub bundle_multiplier: u32,
    pub figures: ItemFigures,
}

impl NewOrderItem {
    pub fn into_item(self, id: EntityId, order_id: EntityId, store_id: StoreId) -> OrderItem {
        let ItemFigures {
            quantity,
            item_price,
            total_price,
            total_tax,
            total_discount,
            item_tax,
            item_discount,
            weight,
        } = self.figures;

        OrderItem {
            id,
            order_id,
            store_id,
            unique_id: self.unique_id,
            sku: self.sku,
            product_name: self.product_name,
            product: self.product,
            is_physical: true,
            bundle_multiplier: self.bundle_multiplier,
            quantity,
            item_price,
            total_price,
            total_tax,
            total_discount,
            item_tax,
            item_discount,
            weight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{DEFAULT_BUNDLE_SEPARATOR, decompose};
    use crate::payload::{RawFinancials, RawItem};

    fn line(quantity: Option<i64>) -> RawOrderItem {
        RawOrderItem {
            quantity,
            item: Some(RawItem {
                sku: Some("ABC**3".into()),
                weight: Some(Decimal::new(25, 2)),
                ..RawItem::default()
            }),
            local_order_item_financials: Some(RawFinancials {
                price: Some(Decimal::from(30)),
                payment: Some(Decimal::from(27)),
                tax: Some(Decimal::from(6)),
                discount: Some(Decimal::from(3)),
                ..RawFinancials::default()
            }),
            ..RawOrderItem::default()
        }
    }

    #[test]
    fn bundle_multiplier_scales_quantity_and_unit_price() {
        let bundle = decompose("ABC**3", DEFAULT_BUNDLE_SEPARATOR);
        let figures = ItemFigures::from_line(&line(Some(2)), &bundle).unwrap();

        assert_eq!(figures.quantity, 6);
        assert_eq!(figures.item_price, Decimal::from(10));
        assert_eq!(figures.total_price, Decimal::from(27));
        assert_eq!(figures.item_tax, Decimal::from(1));
        assert_eq!(figures.item_discount, Decimal::new(5, 1));
        assert_eq!(figures.weight, Decimal::new(25, 2));
    }

    #[test]
    fn zero_quantity_yields_zero_unit_tax() {
        let bundle = decompose("ABC", DEFAULT_BUNDLE_SEPARATOR);
        let figures = ItemFigures::from_line(&line(None), &bundle).unwrap();

        assert_eq!(figures.quantity, 0);
        assert_eq!(figures.item_tax, Decimal::ZERO);
        assert_eq!(figures.item_discount, Decimal::ZERO);
    }

    #[test]
    fn bundle_quantity_overflow_is_an_error() {
        let bundle = decompose("ABC**3", DEFAULT_BUNDLE_SEPARATOR);
        let err = ItemFigures::from_line(&line(Some(i64::MAX / 2)), &bundle).unwrap_err();
        assert!(matches!(err, DomainError::Overflow(_)));
    }

    #[test]
    fn unique_id_tolerates_missing_local_id() {
        let local = LocalId::new("88");
        assert_eq!(order_item_unique_id("MMS-1", "ABC", Some(&local)), "MMS-1-ABC-88");
        assert_eq!(order_item_unique_id("MMS-1", "ABC", None), "MMS-1-ABC-");
    }
}
