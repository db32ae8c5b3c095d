use serde::{Deserialize, Serialize};

use ordersync_core::{Entity, EntityId, EntityKind};

/// Catalog product, keyed by SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    pub sku: String,
    pub name: String,
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            sku: sku.into(),
            name: name.into(),
        }
    }
}

impl Entity for Product {
    const KIND: EntityKind = EntityKind::Product;

    fn id(&self) -> EntityId {
        self.id
    }

    fn unique_id(&self) -> &str {
        &self.sku
    }
}
