//! Billing/shipping address resolution from the multi-locale address list.
//!
//! The marketplace sends the same destination in several languages. The
//! English entry becomes the billing address, the Chinese entry the shipping
//! address; either falls back to the other, and both fall back to the first
//! entry carrying a language code.

use serde::{Deserialize, Serialize};

use ordersync_core::{Entity, EntityId, EntityKind};
use ordersync_sales::RawAddress;

use crate::name::PersonName;

pub const ENGLISH_PREFIX: &str = "en-";
pub const CHINESE_PREFIX: &str = "zh-";

/// Canonical address record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: EntityId,
    pub unique_id: String,
    #[serde(flatten)]
    pub name: PersonName,
    pub company: Option<String>,
    pub street: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub country_code: Option<String>,
    pub telephone: Option<String>,
}

impl Entity for Address {
    const KIND: EntityKind = EntityKind::Address;

    fn id(&self) -> EntityId {
        self.id
    }

    fn unique_id(&self) -> &str {
        &self.unique_id
    }
}

/// Attributes of an address about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub unique_id: String,
    pub name: PersonName,
    pub company: Option<String>,
    pub street: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub country_code: Option<String>,
    pub telephone: Option<String>,
}

impl NewAddress {
    pub fn from_raw(unique_id: impl Into<String>, raw: &RawAddress) -> Self {
        Self {
            unique_id: unique_id.into(),
            name: PersonName::parse(raw.name.as_deref().unwrap_or_default()),
            company: raw.company_name.clone(),
            street: merge_street(
                raw.address_line_1.as_deref().unwrap_or_default(),
                raw.address_line_2.as_deref().unwrap_or_default(),
                raw.address_line_3.as_deref().unwrap_or_default(),
            ),
            region: raw.province.clone(),
            city: raw.city.clone(),
            postcode: raw.postal_code.clone(),
            country_code: raw.country_code.clone(),
            telephone: raw.contact_phone_1.clone(),
        }
    }

    pub fn into_address(self, id: EntityId) -> Address {
        Address {
            id,
            unique_id: self.unique_id,
            name: self.name,
            company: self.company,
            street: self.street,
            region: self.region,
            city: self.city,
            postcode: self.postcode,
            country_code: self.country_code,
            telephone: self.telephone,
        }
    }
}

/// Merge up to three source lines into a two-line street.
///
/// The middle line joins whichever outer line is shorter.
pub fn merge_street(line_1: &str, line_2: &str, line_3: &str) -> Option<String> {
    let lines = if line_1.len() > line_3.len() {
        [line_1.trim().to_string(), format!("{line_2} {line_3}").trim().to_string()]
    } else {
        [format!("{line_1} {line_2}").trim().to_string(), line_3.trim().to_string()]
    };
    let street = lines.join("\n").trim().to_string();
    (!street.is_empty()).then_some(street)
}

/// Which role an address record plays for the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressRole {
    /// Billing and shipping share one record.
    Combined,
    Billing,
    Shipping,
}

impl AddressRole {
    pub fn suffix(self) -> &'static str {
        match self {
            AddressRole::Combined => "",
            AddressRole::Billing => "-billing",
            AddressRole::Shipping => "-shipping",
        }
    }
}

/// Deterministic address unique id: `order-<reference>[-billing|-shipping]`.
pub fn address_unique_id(marketplace_reference: &str, role: AddressRole) -> String {
    format!("order-{marketplace_reference}{}", role.suffix())
}

/// First address whose language code starts with `prefix` (case-insensitive),
/// or the first address with any language code when `prefix` is `None`.
pub fn select_by_language<'a>(addresses: &'a [RawAddress], prefix: Option<&str>) -> Option<&'a RawAddress> {
    addresses.iter().find(|address| {
        let Some(code) = address.language_code.as_deref() else {
            return false;
        };
        match prefix {
            Some(prefix) => code.to_lowercase().starts_with(prefix),
            None => true,
        }
    })
}

/// Which raw addresses become records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPlan<'a> {
    Combined(&'a RawAddress),
    Split {
        billing: &'a RawAddress,
        shipping: &'a RawAddress,
    },
}

impl<'a> AddressPlan<'a> {
    /// Resolve billing/shipping sources; `None` when no usable address exists.
    pub fn resolve(addresses: &'a [RawAddress]) -> Option<Self> {
        let english = select_by_language(addresses, Some(ENGLISH_PREFIX));
        let chinese = select_by_language(addresses, Some(CHINESE_PREFIX));

        let (billing, shipping) = match (english, chinese) {
            (Some(billing), Some(shipping)) => (billing, shipping),
            (Some(only), None) | (None, Some(only)) => (only, only),
            (None, None) => {
                let first = select_by_language(addresses, None)?;
                (first, first)
            }
        };

        if billing == shipping {
            Some(AddressPlan::Combined(billing))
        } else {
            Some(AddressPlan::Split { billing, shipping })
        }
    }

    /// New address records for an order with the given marketplace reference.
    ///
    /// Record ids derive from the reference, so a marketplace `address_id` is
    /// never required.
    pub fn records(&self, marketplace_reference: &str) -> Vec<(AddressRole, NewAddress)> {
        let sources: Vec<(AddressRole, &RawAddress)> = match *self {
            AddressPlan::Combined(raw) => vec![(AddressRole::Combined, raw)],
            AddressPlan::Split { billing, shipping } => {
                vec![(AddressRole::Billing, billing), (AddressRole::Shipping, shipping)]
            }
        };
        sources
            .into_iter()
            .map(|(role, raw)| {
                (
                    role,
                    NewAddress::from_raw(address_unique_id(marketplace_reference, role), raw),
                )
            })
            .collect()
    }
}
