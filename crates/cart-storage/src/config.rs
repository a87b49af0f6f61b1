//! # Storage Configuration
//!
//! Where and how the cart is kept on the device.
//! Everything is loaded from environment variables (a `.env` file is
//! honoured); every variable is optional.

use cart_core::config::{DEFAULT_STORAGE_KEY, DEFAULT_TIMEOUT_MS};
use cart_core::{CartConfig, CartError, Currency};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "./data";

/// File storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory holding the cart files
    pub data_dir: PathBuf,

    /// Key the cart is stored under
    pub storage_key: String,

    /// Currency raw prices are expressed in
    pub currency: Currency,

    /// Upper bound on one storage call, in milliseconds
    pub timeout_ms: u64,
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// - `CART_DATA_DIR` (default `./data`)
    /// - `CART_STORAGE_KEY` (default `@health_cart`)
    /// - `CART_CURRENCY` (ISO code, default `usd`)
    /// - `CART_TIMEOUT_MS` (default 5000)
    pub fn from_env() -> Result<Self, CartError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CartError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("CART_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let storage_key =
            lookup("CART_STORAGE_KEY").unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string());

        let currency = match lookup("CART_CURRENCY") {
            Some(code) => Currency::from_code(&code).ok_or_else(|| {
                CartError::Configuration(format!("CART_CURRENCY '{code}' is not supported"))
            })?,
            None => Currency::default(),
        };

        let timeout_ms = match lookup("CART_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                CartError::Configuration(format!("CART_TIMEOUT_MS '{raw}' is not a number"))
            })?,
            None => DEFAULT_TIMEOUT_MS,
        };

        let config = Self {
            data_dir,
            storage_key,
            currency,
            timeout_ms,
        };
        config.cart_config().validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            currency: Currency::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Engine settings derived from this storage config
    pub fn cart_config(&self) -> CartConfig {
        CartConfig {
            storage_key: self.storage_key.clone(),
            currency: self.currency,
            write_timeout_ms: self.timeout_ms,
            read_timeout_ms: self.timeout_ms,
        }
    }
}
