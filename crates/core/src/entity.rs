//! Entity trait: identity + continuity across syncs.

use serde::{Deserialize, Serialize};

use crate::id::EntityId;

/// Kinds of canonical records the sync engine reads or writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Order,
    OrderItem,
    Address,
    Customer,
    Product,
    StockItem,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Order => "order",
            EntityKind::OrderItem => "orderitem",
            EntityKind::Address => "address",
            EntityKind::Customer => "customer",
            EntityKind::Product => "product",
            EntityKind::StockItem => "stockitem",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A canonical record.
///
/// Every entity has two identities: the store-assigned [`EntityId`] and a
/// deterministic unique id derived from business data (e.g. `MMS-<reference>`
/// for orders). The unique id is what makes re-delivery of the same payload
/// find the same record.
pub trait Entity {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    fn unique_id(&self) -> &str;
}
