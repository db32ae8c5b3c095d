//! Sync engine configuration.
//!
//! Built once at startup and shared read-only (`Arc<SyncConfig>`). Only the
//! marketplace credentials are mandatory; every other knob has a default.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use ordersync_core::{LocalId, StoreId};
use ordersync_inventory::StockAdjustMode;
use ordersync_sales::{DEFAULT_BUNDLE_SEPARATOR, StatusRules, TotalCodes};

pub const ENV_PREFIX: &str = "ORDERSYNC_";

pub const DEFAULT_ORDER_PREFIX: &str = "MMS-";
pub const DEFAULT_STORE_PREFIX: &str = "mms-";
pub const DEFAULT_PAYMENT_CODE: &str = "mmspay";
pub const DEFAULT_FALLBACK_SKU: &str = "<undefined on mms>";
pub const DEFAULT_COMMENT_AUTHOR: &str = "MMS sync";
pub const DEFAULT_CUSTOMER_EMAIL: &str = "mms-customer@example.invalid";
pub const DEFAULT_SHIPPING_METHOD: &str = "int_ems_china_3-8_tracked";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Marketplace API credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_id: String,
    pub app_key: String,
    pub marketplace_id: String,
    pub web_url: String,
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_key", &"<redacted>")
            .field("marketplace_id", &self.marketplace_id)
            .field("web_url", &self.web_url)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub credentials: Credentials,
    pub order_prefix: String,
    pub store_prefix: String,
    pub payment_code: String,
    pub fallback_sku: String,
    pub bundle_separator: String,
    pub comment_author: String,
    pub default_customer_email: String,
    /// Marketplace shipping type → platform shipping method.
    pub shipping_methods: BTreeMap<String, String>,
    pub default_shipping_method: String,
    pub status_rules: StatusRules,
    pub total_codes: TotalCodes,
    pub stock_adjust_mode: StockAdjustMode,
    pub poll_interval: Duration,
}

impl SyncConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            order_prefix: DEFAULT_ORDER_PREFIX.to_string(),
            store_prefix: DEFAULT_STORE_PREFIX.to_string(),
            payment_code: DEFAULT_PAYMENT_CODE.to_string(),
            fallback_sku: DEFAULT_FALLBACK_SKU.to_string(),
            bundle_separator: DEFAULT_BUNDLE_SEPARATOR.to_string(),
            comment_author: DEFAULT_COMMENT_AUTHOR.to_string(),
            default_customer_email: DEFAULT_CUSTOMER_EMAIL.to_string(),
            shipping_methods: BTreeMap::from([(
                "direct_mail".to_string(),
                DEFAULT_SHIPPING_METHOD.to_string(),
            )]),
            default_shipping_method: DEFAULT_SHIPPING_METHOD.to_string(),
            status_rules: StatusRules::default(),
            total_codes: TotalCodes::default(),
            stock_adjust_mode: StockAdjustMode::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Load from `ORDERSYNC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup (keys carry the `ORDERSYNC_` prefix).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &str| get(name).ok_or_else(|| ConfigError::Missing(format!("{ENV_PREFIX}{name}")));

        let mut config = Self::new(Credentials {
            app_id: required("APP_ID")?,
            app_key: required("APP_KEY")?,
            marketplace_id: required("MARKETPLACE_ID")?,
            web_url: required("WEB_URL")?,
        });

        if let Some(prefix) = get("ORDER_PREFIX") {
            config.order_prefix = prefix;
        }
        if let Some(prefix) = get("STORE_PREFIX") {
            config.store_prefix = prefix;
        }
        if let Some(author) = get("COMMENT_AUTHOR") {
            config.comment_author = author;
        }
        if let Some(email) = get("DEFAULT_CUSTOMER_EMAIL") {
            config.default_customer_email = email;
        }
        if let Some(mode) = get("STOCK_ADJUST_MODE") {
            config.stock_adjust_mode = mode.parse().map_err(|reason| ConfigError::Invalid {
                key: format!("{ENV_PREFIX}STOCK_ADJUST_MODE"),
                value: mode.clone(),
                reason,
            })?;
        }
        if let Some(secs) = get("POLL_INTERVAL_SECS") {
            let parsed: u64 = secs.parse().map_err(|err: core::num::ParseIntError| ConfigError::Invalid {
                key: format!("{ENV_PREFIX}POLL_INTERVAL_SECS"),
                value: secs.clone(),
                reason: err.to_string(),
            })?;
            config.poll_interval = Duration::from_secs(parsed);
        }

        Ok(config)
    }

    /// Store an order belongs to: `store_prefix + marketplace id`, or the bare
    /// prefix when the payload carries no marketplace id.
    pub fn store_id(&self, marketplace_id: Option<&LocalId>) -> StoreId {
        match marketplace_id {
            Some(id) => StoreId::new(format!("{}{}", self.store_prefix, id)),
            None => StoreId::new(self.store_prefix.trim().trim_matches('/')),
        }
    }

    pub fn shipping_method_for(&self, shipping_type: &str) -> Option<&str> {
        self.shipping_methods.get(shipping_type).map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> SyncConfig {
    SyncConfig::new(Credentials {
        app_id: "app".into(),
        app_key: "secret".into(),
        marketplace_id: "7".into(),
        web_url: "https://marketplace.test".into(),
    })
}
