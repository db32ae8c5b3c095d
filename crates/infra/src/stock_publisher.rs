//! Pushes sellable stock back to the marketplace.

use tracing::{debug, error, info};

use ordersync_core::EntityKind;
use ordersync_inventory::{StockAttribute, StockItem};

use crate::error::SyncError;
use crate::external::MarketplaceApi;
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published { quantity: i64 },
    /// `available` did not change.
    Skipped,
    /// The marketplace stored a different quantity than sent.
    Rejected { expected: i64, actual: i64 },
}

pub struct StockPublisher<S, A> {
    store: S,
    api: A,
}

impl<S: EntityStore, A: MarketplaceApi> StockPublisher<S, A> {
    pub fn new(store: S, api: A) -> Self {
        Self { store, api }
    }

    /// Publish `stock.available` when it is among `changed`.
    ///
    /// Linked stock items are addressed by marketplace id, others by SKU.
    pub fn publish(&self, stock: &StockItem, changed: &[StockAttribute]) -> Result<PublishOutcome, SyncError> {
        if !changed.contains(&StockAttribute::Available) {
            debug!(code = "mms_si_skip", sku = %stock.sku, ?changed, "Stock update was skipped");
            return Ok(PublishOutcome::Skipped);
        }

        let expected = stock.available;
        let actual = match self.store.local_id(EntityKind::StockItem, stock.id)? {
            Some(local_id) => self.api.set_stock_by_local_id(&local_id, expected),
            None => self.api.set_stock_by_sku(&stock.sku, expected),
        }
        .map_err(|err| {
            error!(code = "mms_si", sku = %stock.sku, error = ?err, "Stock update failed with an exception");
            SyncError::Marketplace(err)
        })?;

        if actual == expected {
            info!(code = "mms_si", sku = %stock.sku, quantity = actual, "Stock update was successful");
            Ok(PublishOutcome::Published { quantity: actual })
        } else {
            error!(code = "mms_si", sku = %stock.sku, expected, actual, "Stock update failed due to an API problem");
            Ok(PublishOutcome::Rejected { expected, actual })
        }
    }
}
