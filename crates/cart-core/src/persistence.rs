//! # Persistence Adapter Trait
//!
//! The on-device key/value store the cart is saved to. One namespaced key
//! holds the whole serialized cart.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 PersistenceAdapter (trait)                  │
//! │  ├── get(key)        -> Option<String>                      │
//! │  ├── set(key, value)                                        │
//! │  ├── remove(key)                                            │
//! │  └── adapter_name()                                         │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!             ┌──────────────┴──────────────┐
//!             │                             │
//!     ┌───────┴───────┐             ┌───────┴───────┐
//!     │ MemoryAdapter │             │  FileAdapter  │
//!     │  (cart-core)  │             │(cart-storage) │
//!     └───────────────┘             └───────────────┘
//! ```
//!
//! Only [`CartOperations`](crate::operations::CartOperations) talks to the
//! adapter; nothing else reads or writes the cart record.

use crate::entry::CartEntry;
use crate::error::PersistenceResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Async key/value byte store
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Read the value stored at `key`, `None` if absent.
    async fn get(&self, key: &str) -> PersistenceResult<Option<String>>;

    /// Store `value` at `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> PersistenceResult<()>;

    /// Delete `key`. Deleting an absent key succeeds.
    async fn remove(&self, key: &str) -> PersistenceResult<()>;

    /// Adapter name (for logging)
    fn adapter_name(&self) -> &'static str;
}

/// Type alias for a shared adapter (dynamic dispatch)
pub type BoxedPersistenceAdapter = Arc<dyn PersistenceAdapter>;

/// Serialize a snapshot as the persisted JSON array
pub fn encode_entries(entries: &[CartEntry]) -> PersistenceResult<String> {
    Ok(serde_json::to_string(entries)?)
}

/// Parse a persisted JSON array back into entries, in stored order
pub fn decode_entries(raw: &str) -> PersistenceResult<Vec<CartEntry>> {
    Ok(serde_json::from_str(raw)?)
}
