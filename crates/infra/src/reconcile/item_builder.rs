use std::sync::Arc;

use tracing::{error, info, warn};

use ordersync_core::{Entity, EntityId, EntityKind, LocalId, StoreScope};
use ordersync_sales::{
    BundleSku, ItemFigures, NewOrderItem, Order, OrderItem, OrderPayload, RawOrderItem, decompose,
    order_item_unique_id,
};

use super::stock_adjuster::{StockOutcome, StockQuantityAdjuster};
use crate::config::SyncConfig;
use crate::error::{PayloadError, SyncError};
use crate::store::{EntityStore, StoreResult};

/// Item created from one payload line, with the stock it moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltItem {
    pub item: OrderItem,
    pub stock: Option<StockOutcome>,
}

/// Creates order items for the lines of a payload that do not exist yet.
pub struct ItemBuilder<S> {
    store: S,
    config: Arc<SyncConfig>,
    stock: StockQuantityAdjuster<S>,
}

impl<S: EntityStore + Clone> ItemBuilder<S> {
    pub fn new(store: S, config: Arc<SyncConfig>) -> Self {
        Self {
            stock: StockQuantityAdjuster::new(store.clone(), config.clone()),
            store,
            config,
        }
    }
}

impl<S: EntityStore> ItemBuilder<S> {
    /// Resolve the SKU of a line (`master_sku`, then `sku`) and decompose it.
    /// `None` when the line carries neither.
    pub fn line_sku(&self, line: &RawOrderItem) -> Option<BundleSku> {
        let item = line.item.as_ref()?;
        let sku = item.master_sku.as_deref().or(item.sku.as_deref())?;
        Some(decompose(sku, &self.config.bundle_separator))
    }

    /// Create the missing items of `order`. Existing items are left alone.
    pub fn build_items(&self, payload: &OrderPayload, order: &Order) -> Result<Vec<BuiltItem>, SyncError> {
        let mut built = Vec::new();
        for line in &payload.order_items {
            if let Some(item) = self.build_item(line, order)? {
                built.push(item);
            }
        }
        Ok(built)
    }

    fn build_item(&self, line: &RawOrderItem, order: &Order) -> Result<Option<BuiltItem>, SyncError> {
        let local_id = line.order_item_id.as_ref();
        let resolved = self.line_sku(line);
        let is_fallback = resolved.is_none();
        let bundle = resolved.unwrap_or_else(|| decompose(&self.config.fallback_sku, ""));

        for diagnostic in &bundle.diagnostics {
            error!(
                code = "mms_o_re_oi_buex",
                sku = %bundle.variation_sku,
                order = %order.unique_id,
                order_item = ?local_id,
                "{diagnostic}"
            );
        }

        let unique_id = order_item_unique_id(&order.unique_id, &bundle.base_sku, local_id);
        let item_store = StoreScope::ByOrder(order).resolve();
        if self.store.find_order_item(&item_store, &unique_id)?.is_some() {
            return Ok(None);
        }

        let product = if is_fallback {
            warn!(
                code = "mms_o_re_oi_nsku",
                order_item = %unique_id,
                "Item data did not contain a valid sku and therefore could not be associated to a product"
            );
            None
        } else {
            let catalog = line.item.as_ref();
            let product = self.link_product(
                &bundle,
                catalog.and_then(|i| i.item_id.as_ref()),
                &order.unique_id,
            )?;
            self.link_stock_item(
                &bundle,
                catalog.and_then(|i| i.variation_id.as_ref()),
                &order.unique_id,
            )?;
            product
        };

        let figures = ItemFigures::from_line(line, &bundle).map_err(PayloadError::Figures)?;
        info!(
            code = "mms_o_re_cr_oi",
            order_item = %unique_id,
            quantity = figures.quantity,
            "Created order item data"
        );

        let item = NewOrderItem {
            unique_id,
            sku: bundle.base_sku.clone(),
            product_name: line.name.clone().unwrap_or_default(),
            product,
            bundle_multiplier: bundle.multiplier(),
            figures,
        }
        .into_item(EntityId::new(), order.id, order.store_id.clone());

        let item = self.store.create_order_item(item)?;
        if let Some(local_id) = local_id {
            self.store.link(EntityKind::OrderItem, item.id, local_id)?;
        }

        let stock = self.stock.adjust_logged(order, &item);
        Ok(Some(BuiltItem { item, stock }))
    }

    fn link_product(
        &self,
        bundle: &BundleSku,
        payload_local_id: Option<&LocalId>,
        order_unique_id: &str,
    ) -> StoreResult<Option<EntityId>> {
        let catalog = StoreScope::Global.resolve();
        let Some(product) = self.store.find_product(&catalog, &bundle.base_sku)? else {
            error!(
                code = "mms_o_re_oi_nop",
                sku = %bundle.variation_sku,
                order = %order_unique_id,
                "No product existing for order item"
            );
            return Ok(None);
        };

        self.reconcile_link(&product, &product.sku, payload_local_id, order_unique_id)?;
        Ok(Some(product.id))
    }

    /// Link the first stock item found by variation SKU, then base SKU.
    fn link_stock_item(
        &self,
        bundle: &BundleSku,
        payload_local_id: Option<&LocalId>,
        order_unique_id: &str,
    ) -> StoreResult<()> {
        let catalog = StoreScope::Global.resolve();
        let mut candidates = vec![bundle.variation_sku.as_str()];
        if bundle.base_sku != bundle.variation_sku {
            candidates.push(bundle.base_sku.as_str());
        }

        for sku in candidates {
            if let Some(stock) = self.store.find_stock_item(&catalog, sku)? {
                return self.reconcile_link(&stock, sku, payload_local_id, order_unique_id);
            }
        }

        error!(
            code = "mms_o_re_oi_nosi",
            sku = %bundle.variation_sku,
            order = %order_unique_id,
            "No stockitem existing for order item"
        );
        Ok(())
    }

    /// Bring the stored marketplace link of a catalog record in line with the
    /// payload: a stale link is dropped, a new one attached.
    fn reconcile_link<E: Entity>(
        &self,
        record: &E,
        sku: &str,
        payload_local_id: Option<&LocalId>,
        order_unique_id: &str,
    ) -> StoreResult<()> {
        let kind = E::KIND;
        let stored = self.store.local_id(kind, record.id())?;

        match (stored.as_ref(), payload_local_id) {
            (None, None) => {
                error!(code = "mms_o_re_oi_nl", %kind, %sku, order = %order_unique_id, "Unable to link {kind}");
            }
            (Some(stored), Some(local)) if stored != local => {
                self.store.unlink(kind, record.id())?;
                warn!(
                    code = "mms_o_re_oi_ul",
                    %kind,
                    %sku,
                    stored_local = %stored,
                    local = %local,
                    "Unlinked local {kind} id"
                );
                self.store.link(kind, record.id(), local)?;
            }
            (None, Some(local)) => self.store.link(kind, record.id(), local)?,
            (Some(_), _) => {}
        }
        Ok(())
    }
}
