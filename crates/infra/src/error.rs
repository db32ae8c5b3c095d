//! Error taxonomy of the sync engine.
//!
//! Each port has its own error type; [`SyncError`] is the umbrella surfaced by
//! cycles and actions.

use thiserror::Error;

use ordersync_core::{DomainError, EntityId, EntityKind};
use ordersync_inventory::StockAttribute;

use crate::config::ConfigError;

/// Persistence port failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("no open transaction: {0}")]
    NoTransaction(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Remote API failure (marketplace or commerce platform).
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Malformed marketplace response.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("unusable figures: {0}")]
    Figures(#[source] DomainError),
}

/// Stock counter update failure.
#[derive(Debug, Error)]
pub enum StockAdjustError {
    #[error("no stock item for sku {sku}")]
    MissingStock { sku: String },

    #[error("{attribute} of sku {sku} would overflow")]
    Overflow { sku: String, attribute: StockAttribute },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Umbrella error of retrieval cycles, reconciliation and actions.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("marketplace call failed: {0}")]
    Marketplace(#[source] ApiError),

    #[error("commerce platform call failed: {0}")]
    Platform(#[source] ApiError),

    #[error("malformed payload: {0}")]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("reconciliation of order {unique_id} failed: {source}")]
    Reconciliation {
        unique_id: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Needs update: order {unique_id}: {source}")]
    NeedsUpdate {
        unique_id: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("unsupported action type {0:?}")]
    UnsupportedAction(String),

    #[error("order {unique_id} has status {status:?}, cannot {action}")]
    InvalidStatus {
        unique_id: String,
        status: Option<String>,
        action: &'static str,
    },

    #[error("order item {item} does not belong to order {order}")]
    ForeignItem { order: String, item: EntityId },

    #[error("order item {item} has no marketplace link")]
    UnlinkedItem { item: EntityId },

    #[error("quantity {requested} for order item {item} exceeds ordered {ordered}")]
    ExcessQuantity {
        item: EntityId,
        requested: i64,
        ordered: i64,
    },

    #[error("quantity {requested} for order item {item} is negative")]
    NegativeQuantity { item: EntityId, requested: i64 },

    #[error("no {what} id in response for order {unique_id}")]
    MissingResponseId {
        what: &'static str,
        unique_id: String,
    },
}

impl SyncError {
    pub fn reconciliation(unique_id: impl Into<String>, source: SyncError) -> Self {
        Self::Reconciliation {
            unique_id: unique_id.into(),
            source: Box::new(source),
        }
    }

    pub fn needs_update(unique_id: impl Into<String>, source: SyncError) -> Self {
        Self::NeedsUpdate {
            unique_id: unique_id.into(),
            source: Box::new(source),
        }
    }
}

impl From<StockAdjustError> for SyncError {
    fn from(err: StockAdjustError) -> Self {
        match err {
            StockAdjustError::Store(err) => SyncError::Store(err),
            StockAdjustError::MissingStock { sku } => {
                SyncError::Domain(DomainError::not_found(format!("stock item {sku}")))
            }
            StockAdjustError::Overflow { sku, attribute } => {
                SyncError::Domain(DomainError::overflow(format!("{attribute} of stock item {sku}")))
            }
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Payload(PayloadError::Json(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_source() {
        let inner = SyncError::Store(StoreError::Conflict("mms-order-MMS-1".into()));
        let err = SyncError::reconciliation("MMS-1", inner);

        assert_eq!(
            err.to_string(),
            "reconciliation of order MMS-1 failed: conflict: mms-order-MMS-1"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn needs_update_message_names_the_order() {
        let err = SyncError::needs_update("MMS-2", StoreError::Poisoned.into());
        assert!(err.to_string().starts_with("Needs update: order MMS-2"));
    }
}
