//! Retrieval cursor persistence.
//!
//! A cursor is the marketplace's `sinceId` watermark per entity type plus the
//! time the cycle that produced it started. Both are saved together, and only
//! after a cycle succeeds, so a failed cycle is retried from the old cursor.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use ordersync_sales::StatusRules;

use crate::error::StoreError;

/// Entity type key of the order cursor.
pub const ORDER_CURSOR: &str = "order";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub since_id: u64,
    pub last_retrieved_at: Option<DateTime<Utc>>,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            since_id: StatusRules::FIRST_SYNC_CURSOR,
            last_retrieved_at: None,
        }
    }
}

pub trait CursorStore: Send + Sync {
    /// Stored cursor, or the first-sync default when none was saved.
    fn load(&self, entity_type: &str) -> Result<CursorState, StoreError>;

    fn save(&self, entity_type: &str, state: CursorState) -> Result<(), StoreError>;
}

impl<S> CursorStore for Arc<S>
where
    S: CursorStore + ?Sized,
{
    fn load(&self, entity_type: &str) -> Result<CursorState, StoreError> {
        (**self).load(entity_type)
    }

    fn save(&self, entity_type: &str, state: CursorState) -> Result<(), StoreError> {
        (**self).save(entity_type, state)
    }
}

/// In-memory cursor store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    inner: RwLock<HashMap<String, CursorState>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for InMemoryCursorStore {
    fn load(&self, entity_type: &str) -> Result<CursorState, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(entity_type).copied().unwrap_or_default())
    }

    fn save(&self, entity_type: &str, state: CursorState) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.insert(entity_type.to_string(), state);
        Ok(())
    }
}

/// Postgres-backed cursor store.
///
/// Expects a table
/// `sync_cursors(entity_type TEXT PRIMARY KEY, since_id BIGINT NOT NULL,
/// last_retrieved_at TIMESTAMPTZ, updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW())`.
/// Calls block on the current tokio runtime, so the worker thread must have
/// entered one.
pub struct PostgresCursorStore {
    pool: Arc<PgPool>,
}

impl PostgresCursorStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    fn runtime() -> Result<tokio::runtime::Handle, StoreError> {
        tokio::runtime::Handle::try_current()
            .map_err(|err| StoreError::Backend(anyhow::anyhow!("no tokio runtime: {err}")))
    }
}

/// A negative stored watermark is corruption, not a first sync.
fn stored_since_id(entity_type: &str, raw: i64) -> Result<u64, StoreError> {
    u64::try_from(raw).map_err(|_| {
        StoreError::Backend(anyhow::anyhow!("corrupted {entity_type} cursor: since_id {raw}"))
    })
}

impl CursorStore for PostgresCursorStore {
    fn load(&self, entity_type: &str) -> Result<CursorState, StoreError> {
        let handle = Self::runtime()?;
        let pool = self.pool.clone();
        let entity_type = entity_type.to_string();

        let row = handle.block_on(async {
            sqlx::query(
                r#"
                SELECT since_id, last_retrieved_at
                FROM sync_cursors
                WHERE entity_type = $1
                "#,
            )
            .bind(&entity_type)
            .fetch_optional(&*pool)
            .await
        });

        let Some(row) = row.map_err(|err| StoreError::Backend(err.into()))? else {
            return Ok(CursorState::default());
        };

        let since_id: i64 = row
            .try_get("since_id")
            .map_err(|err| StoreError::Backend(err.into()))?;
        let last_retrieved_at: Option<DateTime<Utc>> = row
            .try_get("last_retrieved_at")
            .map_err(|err| StoreError::Backend(err.into()))?;

        Ok(CursorState {
            since_id: stored_since_id(&entity_type, since_id)?,
            last_retrieved_at,
        })
    }

    fn save(&self, entity_type: &str, state: CursorState) -> Result<(), StoreError> {
        let handle = Self::runtime()?;
        let pool = self.pool.clone();
        let entity_type = entity_type.to_string();
        let since_id = i64::try_from(state.since_id)
            .map_err(|err| StoreError::Backend(anyhow::anyhow!("cursor out of range: {err}")))?;

        handle
            .block_on(async {
                sqlx::query(
                    r#"
                    INSERT INTO sync_cursors (entity_type, since_id, last_retrieved_at)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (entity_type)
                    DO UPDATE SET
                        since_id = EXCLUDED.since_id,
                        last_retrieved_at = EXCLUDED.last_retrieved_at,
                        updated_at = NOW()
                    "#,
                )
                .bind(&entity_type)
                .bind(since_id)
                .bind(state.last_retrieved_at)
                .execute(&*pool)
                .await
            })
            .map(|_| ())
            .map_err(|err| StoreError::Backend(err.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entity_type_starts_at_first_sync() {
        let store = InMemoryCursorStore::new();
        assert_eq!(store.load(ORDER_CURSOR).unwrap(), CursorState::default());
        assert_eq!(store.load(ORDER_CURSOR).unwrap().since_id, 1);
    }

    #[test]
    fn saved_state_round_trips_per_entity_type() {
        let store = InMemoryCursorStore::new();
        let state = CursorState {
            since_id: 42,
            last_retrieved_at: Some(Utc::now()),
        };
        store.save(ORDER_CURSOR, state).unwrap();

        assert_eq!(store.load(ORDER_CURSOR).unwrap(), state);
        assert_eq!(store.load("stockitem").unwrap().since_id, 1);
    }

    #[test]
    fn negative_stored_cursor_is_rejected() {
        assert_eq!(stored_since_id(ORDER_CURSOR, 17).unwrap(), 17);

        let err = stored_since_id(ORDER_CURSOR, -3).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        assert_eq!(err.to_string(), "store backend error: corrupted order cursor: since_id -3");
    }

    #[test]
    fn postgres_store_requires_a_runtime() {
        assert!(PostgresCursorStore::runtime().is_err());
    }
}
