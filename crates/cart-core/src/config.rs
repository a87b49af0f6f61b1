//! # Cart Configuration
//!
//! Engine settings, loadable from TOML:
//!
//! ```toml
//! storage_key = "@health_cart"
//! currency = "ngn"
//! write_timeout_ms = 5000
//! read_timeout_ms = 5000
//! ```

use crate::error::CartError;
use crate::price::Currency;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_STORAGE_KEY: &str = "@health_cart";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartConfig {
    /// The single key the whole cart is stored under
    pub storage_key: String,

    /// Currency raw prices are expressed in.
    ///
    /// The persisted record holds bare minor units, so changing this for an
    /// existing record reinterprets every restored price.
    pub currency: Currency,

    /// Upper bound on one `set`/`remove` call
    pub write_timeout_ms: u64,

    /// Upper bound on the startup `get`
    pub read_timeout_ms: u64,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            currency: Currency::default(),
            write_timeout_ms: DEFAULT_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl CartConfig {
    /// Load from a TOML string; missing fields take their defaults
    pub fn from_toml(toml_str: &str) -> Result<Self, CartError> {
        let config: CartConfig =
            toml::from_str(toml_str).map_err(|e| CartError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CartError> {
        if self.storage_key.trim().is_empty() {
            return Err(CartError::Configuration(
                "storage_key must not be empty".to_string(),
            ));
        }
        if self.write_timeout_ms == 0 || self.read_timeout_ms == 0 {
            return Err(CartError::Configuration(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder: set storage key
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Builder: set currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Builder: set both timeouts
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.write_timeout_ms = ms;
        self.read_timeout_ms = ms;
        self
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}
