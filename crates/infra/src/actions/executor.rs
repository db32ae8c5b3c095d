use std::sync::Arc;

use tracing::{debug, info, warn};

use ordersync_core::{DomainError, EntityId, EntityKind};
use ordersync_sales::{Order, OrderPayload};

use super::{Action, ActionKind, CreditMemoRequest, ItemQuantities, ShipRequest};
use crate::config::SyncConfig;
use crate::error::{PayloadError, StoreError, SyncError};
use crate::external::{CommercePlatform, CreditMemoData, MarketplaceApi, ShipmentLine, extract_response_id};
use crate::store::EntityStore;

/// Carrier code used for every tracking number.
pub const TRACKING_CARRIER: &str = "custom";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Shipped { shipment_id: String },
    Refunded { credit_memo_id: String },
}

/// Performs outbound actions against the commerce platform.
pub struct ActionExecutor<S, P, M> {
    store: S,
    platform: P,
    marketplace: M,
    config: Arc<SyncConfig>,
}

impl<S, P, M> ActionExecutor<S, P, M>
where
    S: EntityStore,
    P: CommercePlatform,
    M: MarketplaceApi,
{
    pub fn new(store: S, platform: P, marketplace: M, config: Arc<SyncConfig>) -> Self {
        Self {
            store,
            platform,
            marketplace,
            config,
        }
    }

    pub fn execute(&self, action: &Action) -> Result<ActionOutcome, SyncError> {
        let order = self.load_order(action.order_id)?;
        debug!(order = %order.unique_id, action = action.type_name(), "Executing order action");

        match &action.kind {
            ActionKind::Ship(request) => {
                let order = self.require_shippable(order)?;
                self.ship(&order, request)
            }
            ActionKind::CreditMemo(request) => self.creditmemo(&order, request),
            ActionKind::Other(name) => Err(SyncError::UnsupportedAction(name.clone())),
        }
    }

    /// Execute every action; a failing action does not stop the others.
    pub fn execute_all(&self, actions: &[Action]) -> Vec<Result<ActionOutcome, SyncError>> {
        actions
            .iter()
            .map(|action| {
                let result = self.execute(action);
                if let Err(err) = &result {
                    warn!(order_id = %action.order_id, action = action.type_name(), error = %err, "Order action failed");
                }
                result
            })
            .collect()
    }

    /// Linked orders are checked against the marketplace first; the stored
    /// status decides for unlinked ones.
    fn require_shippable(&self, order: Order) -> Result<Order, SyncError> {
        let order = if self.store.local_id(EntityKind::Order, order.id)?.is_some() {
            self.refresh_upstream_status(&order)?;
            self.load_order(order.id)?
        } else {
            order
        };

        if !self.config.status_rules.is_shippable(order.status.as_ref()) {
            return Err(SyncError::InvalidStatus {
                unique_id: order.unique_id.clone(),
                status: order.status.as_ref().map(|s| s.as_str().to_string()),
                action: "ship",
            });
        }
        Ok(order)
    }

    fn ship(&self, order: &Order, request: &ShipRequest) -> Result<ActionOutcome, SyncError> {
        let lines = self.preprocess_items(order, request.items.as_ref())?;
        let items = (!lines.is_empty()).then_some(lines.as_slice());
        let order_ref = self.order_ref(order)?;

        let response = self
            .platform
            .create_shipment(
                &order_ref,
                items,
                request.comment.as_deref(),
                request.notify,
                request.include_comment,
            )
            .map_err(SyncError::Platform)?;
        let shipment_id = extract_response_id(&response, "shipmentIncrementId").ok_or_else(|| {
            SyncError::MissingResponseId {
                what: "shipment",
                unique_id: order.unique_id.clone(),
            }
        })?;
        info!(order = %order.unique_id, shipment = %shipment_id, lines = lines.len(), "Created shipment");

        if let Some(code) = request.tracking_code.as_deref().filter(|code| !code.is_empty()) {
            let title = order.shipping_method.as_deref().unwrap_or("Shipping");
            self.platform
                .add_tracking(&shipment_id, TRACKING_CARRIER, title, code)
                .map_err(SyncError::Platform)?;
        }

        Ok(ActionOutcome::Shipped { shipment_id })
    }

    fn creditmemo(&self, order: &Order, request: &CreditMemoRequest) -> Result<ActionOutcome, SyncError> {
        let every_item;
        let requested = match request.items.as_ref().filter(|items| !items.is_empty()) {
            Some(items) => items,
            None => {
                every_item = self
                    .store
                    .order_items(order.id)?
                    .into_iter()
                    .map(|item| (item.id, None))
                    .collect::<ItemQuantities>();
                &every_item
            }
        };

        let data = CreditMemoData {
            items: self.preprocess_items(order, Some(requested))?,
            comment: request.comment.clone(),
            notify: request.notify,
            include_comment: request.include_comment,
            shipping_amount: request.shipping_refund,
            adjustment_positive: request.adjustment_positive,
            adjustment_negative: request.adjustment_negative,
            refund_customer_balance: request.credit_refund,
        };
        let order_ref = self.order_ref(order)?;

        let response = self
            .platform
            .create_credit_memo(&order_ref, &data)
            .map_err(SyncError::Platform)?;
        let credit_memo_id =
            extract_response_id(&response, "result").ok_or_else(|| SyncError::MissingResponseId {
                what: "credit memo",
                unique_id: order.unique_id.clone(),
            })?;
        info!(order = %order.unique_id, credit_memo = %credit_memo_id, "Created credit memo");

        self.platform
            .add_credit_memo_comment(&credit_memo_id, &format!("FOR ORDER: {}", order.unique_id))
            .map_err(SyncError::Platform)?;

        Ok(ActionOutcome::Refunded { credit_memo_id })
    }

    /// Translate a requested item map to marketplace-keyed lines.
    ///
    /// `None` selects every linked item with its full quantity. A missing or
    /// zero quantity means the full ordered quantity.
    pub fn preprocess_items(
        &self,
        order: &Order,
        requested: Option<&ItemQuantities>,
    ) -> Result<Vec<ShipmentLine>, SyncError> {
        let items = self.store.order_items(order.id)?;

        let Some(requested) = requested else {
            let mut lines = Vec::new();
            for item in &items {
                if let Some(local_id) = self.store.local_id(EntityKind::OrderItem, item.id)? {
                    lines.push(ShipmentLine {
                        order_item_id: local_id,
                        qty: item.quantity,
                    });
                }
            }
            return Ok(lines);
        };

        let mut lines = Vec::with_capacity(requested.len());
        for (&item_id, &quantity) in requested {
            let item = items
                .iter()
                .find(|item| item.id == item_id && item.store_id == order.store_id)
                .ok_or_else(|| SyncError::ForeignItem {
                    order: order.unique_id.clone(),
                    item: item_id,
                })?;

            let qty = match quantity {
                None | Some(0) => item.quantity,
                Some(requested) if requested < 0 => {
                    return Err(SyncError::NegativeQuantity {
                        item: item_id,
                        requested,
                    });
                }
                Some(requested) if requested > item.quantity => {
                    return Err(SyncError::ExcessQuantity {
                        item: item_id,
                        requested,
                        ordered: item.quantity,
                    });
                }
                Some(requested) => requested,
            };

            let order_item_id = self
                .store
                .local_id(EntityKind::OrderItem, item.id)?
                .ok_or(SyncError::UnlinkedItem { item: item_id })?;
            lines.push(ShipmentLine { order_item_id, qty });
        }
        Ok(lines)
    }

    /// Fetch the marketplace view of `order`, store a drifted status and
    /// report whether the order can ship.
    pub fn refresh_upstream_status(&self, order: &Order) -> Result<bool, SyncError> {
        let local_id = self.store.local_id(EntityKind::Order, order.id)?.ok_or_else(|| {
            SyncError::Domain(DomainError::not_found(format!(
                "marketplace link of order {}",
                order.unique_id
            )))
        })?;

        let detail = self.marketplace.get_order(&local_id).map_err(SyncError::Marketplace)?;
        let status = OrderPayload::from_json(detail).map_err(PayloadError::from)?.status();

        if status != order.status {
            info!(order = %order.unique_id, old = ?order.status, new = ?status, "Upstream status drifted");
            self.store.set_order_status(order.id, status.clone())?;
        }
        Ok(self.config.status_rules.is_shippable(status.as_ref()))
    }

    /// Unique id the platform knows the order by: the family root's.
    fn order_ref(&self, order: &Order) -> Result<String, SyncError> {
        match order.original_order {
            Some(root) if root != order.id => Ok(self.load_order(root)?.unique_id),
            _ => Ok(order.unique_id.clone()),
        }
    }

    fn load_order(&self, id: EntityId) -> Result<Order, SyncError> {
        Ok(self
            .store
            .load_order(id)?
            .ok_or_else(|| StoreError::not_found(EntityKind::Order, id))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::store::InMemoryEntityStore;
    use crate::testing::{FakeMarketplace, FakePlatform};
    use ordersync_core::{LocalId, StoreId};
    use ordersync_sales::{ItemFigures, NewOrderItem, OrderData, OrderItem, OrderStatus};
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::collections::BTreeMap;

    type Executor = ActionExecutor<Arc<InMemoryEntityStore>, Arc<FakePlatform>, Arc<FakeMarketplace>>;

    struct Fixture {
        store: Arc<InMemoryEntityStore>,
        platform: Arc<FakePlatform>,
        marketplace: Arc<FakeMarketplace>,
        executor: Executor,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryEntityStore::new());
        let platform = Arc::new(FakePlatform::default());
        let marketplace = Arc::new(FakeMarketplace::default());
        let executor = ActionExecutor::new(
            store.clone(),
            platform.clone(),
            marketplace.clone(),
            Arc::new(test_config()),
        );
        Fixture {
            store,
            platform,
            marketplace,
            executor,
        }
    }

    fn create_order(store: &InMemoryEntityStore, unique_id: &str, status: OrderStatus) -> Order {
        let order = Order::new(
            EntityId::new(),
            StoreId::new("mms-7"),
            unique_id,
            OrderData {
                status: Some(status),
                shipping_method: Some("int_ems".into()),
                ..OrderData::default()
            },
        );
        store.create_order(order).unwrap()
    }

    fn item(store: &InMemoryEntityStore, order: &Order, local: Option<&str>, quantity: i64) -> OrderItem {
        let figures = ItemFigures {
            quantity,
            item_price: Decimal::ONE,
            total_price: Decimal::from(quantity),
            total_tax: Decimal::ZERO,
            total_discount: Decimal::ZERO,
            item_tax: Decimal::ZERO,
            item_discount: Decimal::ZERO,
            weight: Decimal::ZERO,
        };
        let item = NewOrderItem {
            unique_id: format!("{}-ABC-{}", order.unique_id, local.unwrap_or_default()),
            sku: "ABC".into(),
            product_name: "Widget".into(),
            product: None,
            bundle_multiplier: 1,
            figures,
        }
        .into_item(EntityId::new(), order.id, order.store_id.clone());
        let item = store.create_order_item(item).unwrap();
        if let Some(local) = local {
            store.link(EntityKind::OrderItem, item.id, &LocalId::new(local)).unwrap();
        }
        item
    }

    fn ship(order: &Order, data: serde_json::Value) -> Action {
        Action::parse(order.id, "ship", data).unwrap()
    }

    #[test]
    fn ship_sends_every_linked_item_and_tracking() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-1", OrderStatus::Paid);
        item(&f.store, &order, Some("11"), 2);
        item(&f.store, &order, None, 5);
        f.platform.set_shipment_response(json!({ "shipmentIncrementId": "S-1" }));

        let outcome = f
            .executor
            .execute(&ship(&order, json!({ "tracking_code": "TRK" })))
            .unwrap();

        assert_eq!(outcome, ActionOutcome::Shipped { shipment_id: "S-1".into() });
        let shipments = f.platform.shipments();
        assert_eq!(shipments.len(), 1);
        assert_eq!(shipments[0].0, "MMS-1");
        assert_eq!(
            shipments[0].1,
            Some(vec![ShipmentLine {
                order_item_id: LocalId::new("11"),
                qty: 2
            }])
        );
        assert_eq!(
            f.platform.trackings(),
            vec![("S-1".to_string(), "custom".to_string(), "int_ems".to_string(), "TRK".to_string())]
        );
    }

    #[test]
    fn ship_accepts_positional_shipment_ids() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-2", OrderStatus::Paid);
        item(&f.store, &order, Some("1"), 1);
        f.platform.set_shipment_response(json!(["S-9"]));

        let outcome = f.executor.execute(&ship(&order, json!({}))).unwrap();
        assert_eq!(outcome, ActionOutcome::Shipped { shipment_id: "S-9".into() });
        assert!(f.platform.trackings().is_empty());
    }

    #[test]
    fn ship_without_linked_items_sends_no_item_list() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-3", OrderStatus::Paid);
        f.platform.set_shipment_response(json!({ "shipmentIncrementId": 4 }));

        f.executor.execute(&ship(&order, serde_json::Value::Null)).unwrap();
        assert_eq!(f.platform.shipments()[0].1, None);
    }

    #[test]
    fn ship_requires_shippable_status() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-4", OrderStatus::Shipped);

        let err = f.executor.execute(&ship(&order, json!({}))).unwrap_err();
        assert!(matches!(err, SyncError::InvalidStatus { action: "ship", .. }));
        assert!(f.platform.shipments().is_empty());
    }

    #[test]
    fn empty_shipment_id_is_an_error() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-5", OrderStatus::Paid);
        f.platform.set_shipment_response(json!({ "shipmentIncrementId": "" }));

        let err = f.executor.execute(&ship(&order, json!({}))).unwrap_err();
        assert!(matches!(err, SyncError::MissingResponseId { what: "shipment", .. }));
    }

    #[test]
    fn split_orders_ship_against_the_family_root() {
        let f = fixture();
        let root = create_order(&f.store, "MMS-6", OrderStatus::Paid);
        let mut child = Order::new(
            EntityId::new(),
            StoreId::new("mms-7"),
            "MMS-6-1",
            OrderData {
                status: Some(OrderStatus::Paid),
                ..OrderData::default()
            },
        );
        child.original_order = Some(root.id);
        let child = f.store.create_order(child).unwrap();
        f.platform.set_shipment_response(json!({ "shipmentIncrementId": "S" }));

        f.executor.execute(&ship(&child, json!({}))).unwrap();
        assert_eq!(f.platform.shipments()[0].0, "MMS-6");
    }

    #[test]
    fn item_quantities_are_validated() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-7", OrderStatus::Paid);
        let linked = item(&f.store, &order, Some("1"), 3);
        let unlinked = item(&f.store, &order, None, 3);
        let other_order = create_order(&f.store, "MMS-8", OrderStatus::Paid);
        let foreign = item(&f.store, &other_order, Some("2"), 1);

        let partial = f
            .executor
            .preprocess_items(&order, Some(&BTreeMap::from([(linked.id, Some(2))])))
            .unwrap();
        assert_eq!(partial[0].qty, 2);

        let full = f
            .executor
            .preprocess_items(&order, Some(&BTreeMap::from([(linked.id, None)])))
            .unwrap();
        assert_eq!(full[0].qty, 3);

        let excess = f
            .executor
            .preprocess_items(&order, Some(&BTreeMap::from([(linked.id, Some(4))])))
            .unwrap_err();
        assert!(matches!(excess, SyncError::ExcessQuantity { requested: 4, ordered: 3, .. }));

        let negative = f
            .executor
            .preprocess_items(&order, Some(&BTreeMap::from([(linked.id, Some(-1))])))
            .unwrap_err();
        assert!(matches!(negative, SyncError::NegativeQuantity { requested: -1, .. }));

        let err = f
            .executor
            .preprocess_items(&order, Some(&BTreeMap::from([(foreign.id, None)])))
            .unwrap_err();
        assert!(matches!(err, SyncError::ForeignItem { item, .. } if item == foreign.id));

        let err = f
            .executor
            .preprocess_items(&order, Some(&BTreeMap::from([(unlinked.id, None)])))
            .unwrap_err();
        assert!(matches!(err, SyncError::UnlinkedItem { item } if item == unlinked.id));
    }

    #[test]
    fn credit_memo_refunds_every_item_and_comments() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-9", OrderStatus::Shipped);
        item(&f.store, &order, Some("1"), 2);
        item(&f.store, &order, Some("2"), 1);
        f.platform.set_credit_memo_response(json!({ "result": "CM-1" }));

        let action = Action::parse(order.id, "creditmemo", json!({ "shipping_refund": 5, "comment": "sorry" })).unwrap();
        let outcome = f.executor.execute(&action).unwrap();

        assert_eq!(outcome, ActionOutcome::Refunded { credit_memo_id: "CM-1".into() });
        let memos = f.platform.credit_memos();
        assert_eq!(memos[0].0, "MMS-9");
        assert_eq!(memos[0].1.items.len(), 2);
        assert_eq!(memos[0].1.shipping_amount, Decimal::from(5));
        assert_eq!(memos[0].1.comment.as_deref(), Some("sorry"));
        assert_eq!(
            f.platform.credit_memo_comments(),
            vec![("CM-1".to_string(), "FOR ORDER: MMS-9".to_string())]
        );
    }

    #[test]
    fn unsupported_actions_fail_alone() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-10", OrderStatus::Paid);
        f.platform.set_shipment_response(json!({ "shipmentIncrementId": "S" }));
        let actions = vec![
            Action::parse(order.id, "cancel", json!({})).unwrap(),
            ship(&order, json!({})),
        ];

        let results = f.executor.execute_all(&actions);

        assert!(matches!(&results[0], Err(SyncError::UnsupportedAction(name)) if name == "cancel"));
        assert!(results[1].is_ok());
    }

    #[test]
    fn linked_orders_are_checked_upstream_before_shipping() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-12", OrderStatus::Paid);
        f.store.link(EntityKind::Order, order.id, &LocalId::new("78")).unwrap();
        f.marketplace.put_order("78", json!({ "order_id": 78, "marketplace_order_reference": "12", "status": "completed" }));

        let err = f.executor.execute(&ship(&order, json!({}))).unwrap_err();

        assert!(matches!(err, SyncError::InvalidStatus { status: Some(s), .. } if s == "completed"));
        assert!(f.platform.shipments().is_empty());
    }

    #[test]
    fn refresh_stores_drifted_status() {
        let f = fixture();
        let order = create_order(&f.store, "MMS-11", OrderStatus::Paid);
        f.store.link(EntityKind::Order, order.id, &LocalId::new("77")).unwrap();
        f.marketplace.put_order("77", json!({ "order_id": 77, "marketplace_order_reference": "11", "status": "shipped" }));

        let shippable = f.executor.refresh_upstream_status(&order).unwrap();

        assert!(!shippable);
        let stored = f.store.load_order(order.id).unwrap().unwrap();
        assert_eq!(stored.status, Some(OrderStatus::Shipped));
    }
}
