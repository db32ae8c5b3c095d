use std::sync::Arc;

use tracing::{debug, error, info};

use ordersync_core::{StoreId, StoreScope};
use ordersync_inventory::{StockAdjustMode, StockAttribute, StockItem};
use ordersync_sales::{Order, OrderItem, OrderStatus};

use crate::config::SyncConfig;
use crate::error::StockAdjustError;
use crate::store::EntityStore;

/// What a stock adjustment did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockOutcome {
    Adjusted {
        sku: String,
        attribute: StockAttribute,
        previous: i64,
        current: i64,
    },
    /// The order status moves no stock counter.
    NotApplicable { status: Option<OrderStatus> },
    /// This item already moved this counter.
    AlreadyApplied { sku: String, attribute: StockAttribute },
}

/// Moves stock counters by an order item's quantity on status transitions.
///
/// Shippable orders commit units to `qty_pre_transit`; closed orders return
/// them to `available`.
pub struct StockQuantityAdjuster<S> {
    store: S,
    config: Arc<SyncConfig>,
}

impl<S: EntityStore> StockQuantityAdjuster<S> {
    pub fn new(store: S, config: Arc<SyncConfig>) -> Self {
        Self { store, config }
    }

    pub fn adjust(&self, order: &Order, item: &OrderItem) -> Result<StockOutcome, StockAdjustError> {
        let category = self.config.status_rules.category(order.status.as_ref());
        let Some(attribute) = StockAttribute::for_category(category) else {
            debug!(order = %order.unique_id, item = %item.unique_id, status = ?order.status, "status moves no stock");
            return Ok(StockOutcome::NotApplicable {
                status: order.status.clone(),
            });
        };

        let stock_store: StoreId = StoreScope::Global.resolve();
        let mut stock = self
            .store
            .find_stock_item(&stock_store, &item.sku)?
            .ok_or_else(|| StockAdjustError::MissingStock {
                sku: item.sku.clone(),
            })?;

        let idempotent = self.config.stock_adjust_mode == StockAdjustMode::Idempotent;
        if idempotent && self.store.stock_adjusted(item.id, attribute)? {
            debug!(order = %order.unique_id, sku = %item.sku, %attribute, "stock already adjusted for item");
            return Ok(StockOutcome::AlreadyApplied {
                sku: item.sku.clone(),
                attribute,
            });
        }

        let previous = stock.get(attribute);
        let current = previous
            .checked_add(item.quantity)
            .ok_or_else(|| StockAdjustError::Overflow {
                sku: item.sku.clone(),
                attribute,
            })?;
        stock.set(attribute, current);

        if idempotent {
            self.write_with_ledger(&stock_store, &stock, item, attribute)?;
        } else {
            self.store.update_stock_item(&stock_store, &stock)?;
        }

        info!(
            order = %order.unique_id,
            sku = %item.sku,
            %attribute,
            previous,
            current,
            "Updated stock quantity"
        );
        Ok(StockOutcome::Adjusted {
            sku: item.sku.clone(),
            attribute,
            previous,
            current,
        })
    }

    /// Counter update and ledger entry commit together or not at all.
    fn write_with_ledger(
        &self,
        stock_store: &StoreId,
        stock: &StockItem,
        item: &OrderItem,
        attribute: StockAttribute,
    ) -> Result<(), StockAdjustError> {
        let key = format!("mms-stock-{}-{attribute}", item.id);
        self.store.begin_transaction(&key)?;

        let written = self
            .store
            .update_stock_item(stock_store, stock)
            .and_then(|()| self.store.record_stock_adjustment(item.id, attribute))
            .and_then(|()| self.store.commit_transaction(&key));

        if let Err(err) = written {
            if let Err(rollback) = self.store.rollback_transaction(&key) {
                error!(sku = %item.sku, error = ?rollback, "Rollback failed");
            }
            return Err(err.into());
        }
        Ok(())
    }

    /// [`adjust`](Self::adjust), logging failures instead of returning them.
    /// Stock problems never fail the order they belong to.
    pub fn adjust_logged(&self, order: &Order, item: &OrderItem) -> Option<StockOutcome> {
        match self.adjust(order, item) {
            Ok(outcome) => Some(outcome),
            Err(StockAdjustError::MissingStock { sku }) => {
                error!(code = "mms_o_si_no_ex", order = %order.unique_id, %sku, "Stockitem does not exist");
                None
            }
            Err(err) => {
                error!(
                    code = "mms_o_si_upd_err",
                    order = %order.unique_id,
                    sku = %item.sku,
                    error = ?err,
                    "Stock update failed"
                );
                None
            }
        }
    }
}
