//! # cart-core
//!
//! Cart aggregation and persistence engine for the health store app.
//!
//! This crate provides:
//! - `ItemNormalizer` turning raw products, drugs, packages and services
//!   into canonical `CartEntry` values with a derived identity key
//! - `aggregate` functions for totals, counts and group-bys
//! - `CartStore`, the ordered key-unique entry collection
//! - `PersistenceAdapter` trait for the on-device key/value store
//! - `CartOperations`, the orchestrator owning load, mutation and
//!   write-through persistence
//!
//! ## Example
//!
//! ```rust,ignore
//! use cart_core::{CartConfig, CartOperations, Institution, MemoryAdapter, RawDrug, RawPackage};
//! use std::sync::Arc;
//!
//! let cart = CartOperations::new(Arc::new(MemoryAdapter::new()), CartConfig::default());
//! cart.init().await;
//!
//! cart.add_drug_to_cart(RawDrug::new("d1", "Paracetamol", 5.99))?;
//! cart.add_package_to_cart(RawPackage::new("pk1", 15000.0), Institution::new("inst1"))?;
//!
//! println!("Total: {}", cart.total_price().display(cart.currency()));
//! cart.dispose().await;
//! ```

pub mod aggregate;
pub mod config;
pub mod entry;
pub mod error;
pub mod memory;
pub mod normalize;
pub mod operations;
pub mod persistence;
pub mod price;
pub mod store;

// Re-exports for convenience
pub use config::CartConfig;
pub use entry::{
    CartEntry, DrugMetadata, EntryDetails, Institution, ItemKind, PackageMetadata,
    ProductMetadata, Provider, ServiceMetadata,
};
pub use error::{
    CartError, CartResult, PersistenceError, PersistenceResult, ValidationError, ValidationResult,
};
pub use memory::MemoryAdapter;
pub use normalize::{ItemNormalizer, RawDrug, RawItem, RawPackage, RawProduct, RawService};
pub use operations::{CartOperations, CartSnapshot, LoadState};
pub use persistence::{BoxedPersistenceAdapter, PersistenceAdapter};
pub use price::{Currency, Price};
pub use store::CartStore;
