//! Customer identity derived from the order's address list.

use serde::{Deserialize, Serialize};

use ordersync_core::{Entity, EntityId, EntityKind};
use ordersync_sales::RawAddress;

use crate::address::{CHINESE_PREFIX, ENGLISH_PREFIX, select_by_language};
use crate::name::PersonName;

pub const MARKETPLACE_CUSTOMER_TYPE: &str = "MMS customer";

/// Canonical customer record, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: EntityId,
    pub email: String,
    #[serde(flatten)]
    pub name: PersonName,
    pub customer_type: String,
}

impl Entity for Customer {
    const KIND: EntityKind = EntityKind::Customer;

    fn id(&self) -> EntityId {
        self.id
    }

    fn unique_id(&self) -> &str {
        &self.email
    }
}

/// Attributes of a customer about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: String,
    pub name: PersonName,
    pub customer_type: String,
}

impl NewCustomer {
    pub fn into_customer(self, id: EntityId) -> Customer {
        Customer {
            id,
            email: self.email,
            name: self.name,
            customer_type: self.customer_type,
        }
    }
}

/// Name and email found on the addresses, used to create a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerIdentity {
    pub name: String,
    pub email: Option<String>,
}

impl CustomerIdentity {
    /// First named address in order of preference: English, Chinese, any.
    pub fn resolve(addresses: &[RawAddress]) -> Option<Self> {
        [Some(ENGLISH_PREFIX), Some(CHINESE_PREFIX), None]
            .into_iter()
            .filter_map(|prefix| select_by_language(addresses, prefix))
            .find_map(|address| {
                address.name.as_ref().map(|name| Self {
                    name: name.clone(),
                    email: address.contact_email_1.clone(),
                })
            })
    }

    /// Customer record for this identity; `fallback_email` covers addresses
    /// without a contact email.
    pub fn new_customer(&self, fallback_email: &str) -> NewCustomer {
        NewCustomer {
            email: self
                .email
                .clone()
                .unwrap_or_else(|| fallback_email.to_string()),
            name: PersonName::parse(&self.name),
            customer_type: MARKETPLACE_CUSTOMER_TYPE.to_string(),
        }
    }
}

/// Order-level contact: the first name and the first email found on any
/// address, picked independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderContact {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

impl OrderContact {
    pub fn from_addresses(addresses: &[RawAddress]) -> Self {
        Self {
            customer_name: addresses.iter().find_map(|a| a.name.clone()),
            customer_email: addresses.iter().find_map(|a| a.contact_email_1.clone()),
        }
    }
}
