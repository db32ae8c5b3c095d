//! Identifiers used across the sync engine.
//!
//! Three kinds of identity meet here:
//! - [`EntityId`]: the canonical record id owned by the local store
//! - [`LocalId`]: the id a remote node (marketplace) uses for the same record
//! - [`StoreId`]: the store partition a record lives in

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a canonical record (order, item, address, customer, ...).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for EntityId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for EntityId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("EntityId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Identifier assigned by a remote node.
///
/// Marketplaces hand these out as JSON numbers or strings; both are accepted
/// and normalised to their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocalId(String);

impl LocalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for LocalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocalId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for LocalId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for LocalId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Signed(n) => Self(n.to_string()),
            Raw::Unsigned(n) => Self(n.to_string()),
        })
    }
}

/// Store partition of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(String);

impl StoreId {
    const GLOBAL: &'static str = "0";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The store shared by every channel (customers, stock, catalog).
    pub fn global() -> Self {
        Self(Self::GLOBAL.to_string())
    }

    pub fn is_global(&self) -> bool {
        self.0 == Self::GLOBAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for StoreId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that lives in exactly one store.
pub trait StoreScoped {
    fn store_id(&self) -> &StoreId;
}

/// Which store a lookup should target, resolved at the call site.
#[derive(Clone, Copy)]
pub enum StoreScope<'a> {
    /// The store of the given record (typically an order).
    ByOrder(&'a dyn StoreScoped),
    /// An explicit store.
    ByStoreId(&'a StoreId),
    /// The global store.
    Global,
}

impl StoreScope<'_> {
    pub fn resolve(self) -> StoreId {
        match self {
            StoreScope::ByOrder(record) => record.store_id().clone(),
            StoreScope::ByStoreId(id) => id.clone(),
            StoreScope::Global => StoreId::global(),
        }
    }
}

impl core::fmt::Debug for StoreScope<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreScope::ByOrder(record) => f.debug_tuple("ByOrder").field(record.store_id()).finish(),
            StoreScope::ByStoreId(id) => f.debug_tuple("ByStoreId").field(id).finish(),
            StoreScope::Global => f.write_str("Global"),
        }
    }
}
