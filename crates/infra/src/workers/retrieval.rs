//! Cursor-driven order retrieval.
//!
//! One cycle lists the order ids changed since the stored cursor, fetches
//! each order, filters by status and reconciles the survivors. The cursor
//! only moves when the whole cycle succeeded.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::{debug, error, info};

use ordersync_core::LocalId;
use ordersync_sales::OrderPayload;

use crate::cursor_store::{CursorState, CursorStore, ORDER_CURSOR};
use crate::error::{PayloadError, SyncError};
use crate::external::MarketplaceApi;
use crate::reconcile::{OrderReconciler, ReconcileOutcome};
use crate::store::EntityStore;

/// One page of the changed-order listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderIdPage {
    #[serde(rename = "localOrderIds")]
    pub local_order_ids: Vec<LocalId>,
    #[serde(rename = "newSinceId", default)]
    pub new_since_id: Option<SinceId>,
}

/// `newSinceId` arrives as a number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "JsonValue")]
pub struct SinceId(pub u64);

impl TryFrom<JsonValue> for SinceId {
    type Error = String;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match &value {
            JsonValue::Number(n) => n.as_u64().map(SinceId),
            JsonValue::String(s) => s.trim().parse().ok().map(SinceId),
            _ => None,
        }
        .ok_or_else(|| format!("invalid since id {value}"))
    }
}

impl OrderIdPage {
    pub fn parse(value: JsonValue) -> Result<Self, PayloadError> {
        if value.get("localOrderIds").is_none() {
            return Err(PayloadError::MissingField("localOrderIds"));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalOutcome {
    /// Ids listed by the marketplace.
    pub listed: usize,
    pub reconciled: Vec<ReconcileOutcome>,
    /// Ids dropped by the status filter.
    pub skipped: usize,
    pub new_cursor: u64,
}

pub struct OrderRetrieval<A, S, C> {
    api: A,
    reconciler: OrderReconciler<S>,
    cursors: C,
}

impl<A, S, C> OrderRetrieval<A, S, C>
where
    A: MarketplaceApi,
    S: EntityStore,
    C: CursorStore,
{
    pub fn new(api: A, reconciler: OrderReconciler<S>, cursors: C) -> Self {
        Self {
            api,
            reconciler,
            cursors,
        }
    }

    /// Retrieve and reconcile everything changed since `cursor`.
    ///
    /// The first failure aborts the pass; the caller keeps the old cursor.
    pub fn retrieve(&self, cursor: u64) -> Result<RetrievalOutcome, SyncError> {
        info!(code = "mms_o_re_since", since_id = cursor, "Retrieving orders");

        let listing = self.api.list_changed_order_ids(cursor).map_err(|err| {
            error!(code = "mms_o_rest_lerr", since_id = cursor, error = ?err, "Error on marketplace listing call");
            SyncError::Marketplace(err)
        })?;
        let page = OrderIdPage::parse(listing)?;
        let new_cursor = page.new_since_id.map_or(cursor, |since| since.0);
        info!(
            code = "mms_o_rest_list",
            since_id = cursor,
            new_since_id = new_cursor,
            results = page.local_order_ids.len(),
            "Retrieved order ids"
        );

        let rules = &self.reconciler.config().status_rules;
        let mut outcome = RetrievalOutcome {
            listed: page.local_order_ids.len(),
            new_cursor,
            ..RetrievalOutcome::default()
        };

        for local_id in &page.local_order_ids {
            let detail = self.api.get_order(local_id).map_err(SyncError::Marketplace)?;
            let payload = OrderPayload::from_json(detail).map_err(PayloadError::from)?;

            if !rules.should_retrieve(payload.status().as_ref(), cursor) {
                debug!(local_order = %local_id, status = ?payload.status, "Order filtered by status");
                outcome.skipped += 1;
                continue;
            }

            outcome.reconciled.push(self.reconciler.reconcile(&payload)?);
        }

        Ok(outcome)
    }

    /// Load the cursor, retrieve, and save the new cursor with the cycle's
    /// start time.
    pub fn run_cycle(&self) -> Result<RetrievalOutcome, SyncError> {
        let state = self.cursors.load(ORDER_CURSOR)?;
        let started_at = Utc::now();

        let outcome = self.retrieve(state.since_id)?;

        self.cursors.save(
            ORDER_CURSOR,
            CursorState {
                since_id: outcome.new_cursor,
                last_retrieved_at: Some(started_at),
            },
        )?;
        info!(
            listed = outcome.listed,
            reconciled = outcome.reconciled.len(),
            skipped = outcome.skipped,
            since_id = outcome.new_cursor,
            "Order retrieval cycle finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_requires_local_order_ids() {
        let err = OrderIdPage::parse(json!({ "newSinceId": 5 })).unwrap_err();
        assert!(matches!(err, PayloadError::MissingField("localOrderIds")));
    }

    #[test]
    fn listing_accepts_mixed_id_shapes() {
        let page = OrderIdPage::parse(json!({ "localOrderIds": [1, "2"], "newSinceId": "17" })).unwrap();
        assert_eq!(page.local_order_ids, vec![LocalId::new("1"), LocalId::new("2")]);
        assert_eq!(page.new_since_id, Some(SinceId(17)));
    }

    #[test]
    fn missing_since_id_is_allowed() {
        let page = OrderIdPage::parse(json!({ "localOrderIds": [] })).unwrap();
        assert_eq!(page.new_since_id, None);
    }

    #[test]
    fn garbage_since_id_is_a_parse_error() {
        assert!(OrderIdPage::parse(json!({ "localOrderIds": [], "newSinceId": "soon" })).is_err());
    }
}
