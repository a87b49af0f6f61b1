//! # cart-storage
//!
//! On-device storage for the cart engine.
//!
//! `FileAdapter` keeps each storage key in its own JSON file under a data
//! directory; `StorageConfig` reads where that directory lives (and the
//! cart settings) from the environment.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cart_storage::{open_cart, StorageConfig};
//!
//! let cart = open_cart(&StorageConfig::from_env()?).await?;
//! println!("{} entries restored", cart.item_count());
//! ```

pub mod config;
pub mod file;

pub use config::StorageConfig;
pub use file::FileAdapter;

use cart_core::{CartOperations, CartResult};
use std::sync::Arc;
use tracing::info;

/// Open the file-backed cart described by `config` and load it.
pub async fn open_cart(config: &StorageConfig) -> CartResult<CartOperations> {
    let cart_config = config.cart_config();
    cart_config.validate()?;

    let adapter = FileAdapter::open(&config.data_dir).await?;
    info!(data_dir = %adapter.root().display(), "Opening cart storage");

    let cart = CartOperations::new(Arc::new(adapter), cart_config);
    cart.init().await;
    Ok(cart)
}
