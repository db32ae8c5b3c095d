use std::sync::Arc;

use tracing::{error, info, warn};

use ordersync_core::{EntityId, EntityKind, LocalId, StoreId, StoreScope};
use ordersync_parties::{AddressPlan, AddressRole, CustomerIdentity, OrderContact};
use ordersync_sales::{
    Order, OrderComment, OrderData, OrderPayload, OrderStatus, PaymentInfo, TotalCode,
    order_unique_id,
};

use super::item_builder::{BuiltItem, ItemBuilder};
use super::stock_adjuster::{StockOutcome, StockQuantityAdjuster};
use crate::config::SyncConfig;
use crate::error::{PayloadError, StoreError, SyncError};
use crate::store::EntityStore;

/// How a payload met the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Created,
    /// Found by unique id only; the marketplace link was restored.
    Relinked,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub order_id: EntityId,
    pub unique_id: String,
    pub action: ReconcileAction,
    pub status_changed: bool,
    pub stock: Vec<StockOutcome>,
}

struct AppliedUpdate {
    order_id: EntityId,
    status_changed: bool,
    stock: Vec<StockOutcome>,
}

/// Turns one marketplace payload into canonical order state.
pub struct OrderReconciler<S> {
    store: S,
    config: Arc<SyncConfig>,
    items: ItemBuilder<S>,
    stock: StockQuantityAdjuster<S>,
}

impl<S: EntityStore + Clone> OrderReconciler<S> {
    pub fn new(store: S, config: Arc<SyncConfig>) -> Self {
        Self {
            items: ItemBuilder::new(store.clone(), config.clone()),
            stock: StockQuantityAdjuster::new(store.clone(), config.clone()),
            store,
            config,
        }
    }
}

impl<S: EntityStore> OrderReconciler<S> {
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn reconcile(&self, payload: &OrderPayload) -> Result<ReconcileOutcome, SyncError> {
        let unique_id = order_unique_id(&self.config.order_prefix, &payload.marketplace_order_reference);
        let local_id = &payload.order_id;
        let store_id = self.config.store_id(payload.marketplace_id.as_ref());

        let data = self.order_data(payload, &unique_id)?;

        if let Some(existing) = self.store.find_order_by_local_id(&store_id, local_id)? {
            info!(code = "mms_o_upd", order = %unique_id, "Updated order");
            return self.update(existing, data, ReconcileAction::Updated, Vec::new());
        }

        match self.store.find_order(&store_id, &unique_id)? {
            Some(existing) => {
                info!(code = "mms_o_unlink", order = %unique_id, "Unlinked order");
                self.store.link(EntityKind::Order, existing.id, local_id)?;
                let comment = OrderComment::unlinked(&self.config.comment_author, &unique_id);
                self.update(existing, data, ReconcileAction::Relinked, vec![comment])
            }
            None => self.create(payload, store_id, &unique_id, local_id, data),
        }
    }

    /// Order attributes derived from the payload, identical for create and update.
    fn order_data(&self, payload: &OrderPayload, unique_id: &str) -> Result<OrderData, SyncError> {
        let config = &self.config;
        let contact = OrderContact::from_addresses(&payload.addresses);
        let totals = payload
            .totals(&config.total_codes)
            .map_err(PayloadError::Figures)?;

        let status = payload.status();
        if status.is_none() {
            warn!(code = "mms_o_no_status", order = %unique_id, "Order payload carries no status");
        }
        let placed_at = payload.placed_at();
        if placed_at.is_none() {
            warn!(code = "mms_o_no_date", order = %unique_id, created_at = ?payload.created_at, "Unreadable order date");
        }

        let shipping_method = payload
            .order_items
            .iter()
            .filter_map(|line| line.shipping_type.as_deref())
            .find_map(|shipping_type| config.shipping_method_for(shipping_type))
            .unwrap_or(config.default_shipping_method.as_str())
            .to_string();
        let customer_email = contact
            .customer_email
            .unwrap_or_else(|| config.default_customer_email.clone());

        let payment = config
            .total_codes
            .iter()
            .any(|(code, _)| code == TotalCode::Payment)
            .then(|| PaymentInfo {
                method: config.payment_code.clone(),
                amount: totals.get(TotalCode::Payment),
            });

        let customer = self.resolve_customer(payload, &customer_email, unique_id)?;

        Ok(OrderData {
            status,
            grand_total: Some(totals.grand_total()),
            base_to_currency_rate: totals.base_to_currency_rate,
            discount_total: totals.get(TotalCode::Discount),
            shipping_total: totals.get(TotalCode::Shipping),
            tax_total: totals.get(TotalCode::Tax),
            weight_total: totals.get(TotalCode::Weight),
            payment,
            customer_name: contact.customer_name,
            customer_email: Some(customer_email),
            shipping_method: Some(shipping_method),
            billing_address: None,
            shipping_address: None,
            customer,
            placed_at,
        })
    }

    /// Find the customer by email in the global store, or create one from the
    /// first named address.
    fn resolve_customer(
        &self,
        payload: &OrderPayload,
        customer_email: &str,
        unique_id: &str,
    ) -> Result<Option<EntityId>, SyncError> {
        let customers = StoreScope::Global.resolve();
        let identity = CustomerIdentity::resolve(&payload.addresses);
        let email = identity
            .as_ref()
            .and_then(|identity| identity.email.clone())
            .unwrap_or_else(|| customer_email.to_string());

        if let Some(customer) = self.store.find_customer(&customers, &email)? {
            return Ok(Some(customer.id));
        }

        let Some(identity) = identity else {
            warn!(
                code = "mms_o_cu_noname",
                order = %unique_id,
                local_order = %payload.order_id,
                "No address name found on order, customer not created"
            );
            return Ok(None);
        };

        let customer = identity
            .new_customer(&email)
            .into_customer(EntityId::new());
        let customer = self.store.create_customer(&customers, customer)?;
        info!(code = "mms_o_cu_new", order = %unique_id, email = %customer.email, "Created customer");
        Ok(Some(customer.id))
    }

    fn create(
        &self,
        payload: &OrderPayload,
        store_id: StoreId,
        unique_id: &str,
        local_id: &LocalId,
        data: OrderData,
    ) -> Result<ReconcileOutcome, SyncError> {
        let key = format!("mms-order-{unique_id}");
        self.store
            .begin_transaction(&key)
            .map_err(|err| SyncError::reconciliation(unique_id, err.into()))?;

        let created = self
            .create_within_transaction(payload, store_id, unique_id, local_id, data)
            .and_then(|created| {
                self.store.commit_transaction(&key)?;
                Ok(created)
            });

        let (order, items) = match created {
            Ok(created) => created,
            Err(err) => {
                if let Err(rollback) = self.store.rollback_transaction(&key) {
                    error!(order = %unique_id, error = ?rollback, "Rollback failed");
                }
                return Err(SyncError::reconciliation(unique_id, err));
            }
        };

        self.comment(&order, OrderComment::initial_sync(&self.config.comment_author, unique_id));

        Ok(ReconcileOutcome {
            order_id: order.id,
            unique_id: order.unique_id,
            action: ReconcileAction::Created,
            status_changed: false,
            stock: items.into_iter().filter_map(|built| built.stock).collect(),
        })
    }

    fn create_within_transaction(
        &self,
        payload: &OrderPayload,
        store_id: StoreId,
        unique_id: &str,
        local_id: &LocalId,
        mut data: OrderData,
    ) -> Result<(Order, Vec<BuiltItem>), SyncError> {
        self.create_addresses(payload, &mut data)?;

        let order = Order::new(EntityId::new(), store_id, unique_id, data);
        let order = self.store.create_order(order)?;
        self.store.link(EntityKind::Order, order.id, local_id)?;
        info!(code = "mms_o_new", order = %unique_id, "New order");

        let items = self.items.build_items(payload, &order)?;
        Ok((order, items))
    }

    fn create_addresses(&self, payload: &OrderPayload, data: &mut OrderData) -> Result<(), SyncError> {
        let Some(plan) = AddressPlan::resolve(&payload.addresses) else {
            warn!(
                code = "mms_o_no_addr",
                reference = %payload.marketplace_order_reference,
                "Order carries no usable address"
            );
            return Ok(());
        };

        let addresses = StoreScope::Global.resolve();
        for (role, record) in plan.records(&payload.marketplace_order_reference) {
            let id = match self.store.find_address(&addresses, &record.unique_id)? {
                Some(existing) => existing.id,
                None => {
                    self.store
                        .create_address(&addresses, record.into_address(EntityId::new()))?
                        .id
                }
            };
            match role {
                AddressRole::Combined => {
                    data.billing_address = Some(id);
                    data.shipping_address = Some(id);
                }
                AddressRole::Billing => data.billing_address = Some(id),
                AddressRole::Shipping => data.shipping_address = Some(id),
            }
        }
        Ok(())
    }

    fn update(
        &self,
        existing: Order,
        data: OrderData,
        action: ReconcileAction,
        mut comments: Vec<OrderComment>,
    ) -> Result<ReconcileOutcome, SyncError> {
        let unique_id = existing.unique_id.clone();
        let applied = self
            .apply_update(existing, data, &mut comments)
            .map_err(|err| SyncError::needs_update(&unique_id, err))?;

        for comment in comments {
            self.comment_by_id(applied.order_id, &unique_id, comment);
        }

        Ok(ReconcileOutcome {
            order_id: applied.order_id,
            unique_id,
            action,
            status_changed: applied.status_changed,
            stock: applied.stock,
        })
    }

    fn apply_update(
        &self,
        existing: Order,
        data: OrderData,
        comments: &mut Vec<OrderComment>,
    ) -> Result<AppliedUpdate, SyncError> {
        let rules = &self.config.status_rules;
        let data = data.without_write_once(&existing);
        let old_status = existing.status.clone();
        let new_status = data.status.clone();
        let status_changed = old_status != new_status;

        if status_changed {
            comments.push(OrderComment::status_change(
                &self.config.comment_author,
                &existing.unique_id,
                old_status.as_ref(),
                new_status.as_ref(),
            ));
        }

        let moved_to_shippable =
            rules.is_shippable(new_status.as_ref()) && !rules.is_shippable(old_status.as_ref());
        let moved_to_closed = rules.is_closed(new_status.as_ref()) && !rules.is_closed(old_status.as_ref());

        let mut updated = existing;
        data.apply_to(&mut updated);
        self.write_family(&updated, status_changed)?;

        let order = self
            .store
            .load_order(updated.id)?
            .ok_or_else(|| StoreError::not_found(EntityKind::Order, updated.id))?;

        let mut stock = Vec::new();
        if moved_to_shippable || moved_to_closed {
            for item in self.store.order_items(order.id)? {
                stock.extend(self.stock.adjust_logged(&order, &item));
            }
        }

        Ok(AppliedUpdate {
            order_id: order.id,
            status_changed,
            stock,
        })
    }

    /// Save the order and, on a status change, its split siblings as one unit.
    fn write_family(&self, order: &Order, status_changed: bool) -> Result<(), SyncError> {
        let key = format!("mms-order-update-{}", order.unique_id);
        self.store.begin_transaction(&key)?;

        let written = self.store.update_order(order).map_err(SyncError::from).and_then(|()| {
            if status_changed {
                self.propagate_status(order, order.status.clone())?;
            }
            self.store.commit_transaction(&key)?;
            Ok(())
        });

        if written.is_err() {
            if let Err(rollback) = self.store.rollback_transaction(&key) {
                error!(order = %order.unique_id, error = ?rollback, "Rollback failed");
            }
        }
        written
    }

    /// Copy a new status to every other order of the split family.
    fn propagate_status(&self, order: &Order, status: Option<OrderStatus>) -> Result<(), SyncError> {
        for sibling in self.store.family_orders(order)? {
            if sibling.id != order.id {
                self.store.set_order_status(sibling.id, status.clone())?;
            }
        }
        Ok(())
    }

    fn comment(&self, order: &Order, comment: OrderComment) {
        self.comment_by_id(order.id, &order.unique_id, comment);
    }

    fn comment_by_id(&self, order: EntityId, unique_id: &str, comment: OrderComment) {
        if let Err(err) = self.store.add_comment(order, comment.clone()) {
            error!(
                code = "mms_o_w_cerr",
                order = %unique_id,
                title = %comment.title,
                error = ?err,
                "Comment creation failed on order"
            );
        }
    }
}
