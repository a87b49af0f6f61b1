//! # Cart Error Types
//!
//! Typed error handling for the cart engine.
//!
//! Only two failures exist in the domain:
//! - [`ValidationError`] blocks a mutation and is reported to the caller.
//! - [`PersistenceError`] is logged by the orchestrator and never undoes an
//!   in-memory mutation.
//!
//! Operations on a key that is not in the cart are no-ops, not errors.

use thiserror::Error;

/// A raw item could not be turned into a cart entry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Price is below zero (or not a finite number)
    #[error("Invalid price: {price}")]
    NegativePrice { price: f64 },

    /// Price above [`Price::MAX_UNIT`](crate::price::Price::MAX_UNIT)
    #[error("Price {price} exceeds the maximum unit price")]
    PriceTooLarge { price: f64 },

    /// Quantity to add must be at least 1
    #[error("Quantity must be at least 1, got {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// The `type` discriminant names no known variant
    #[error("Unknown item type: {kind}")]
    UnknownItemType { kind: String },

    /// The raw value is not shaped like an item at all
    #[error("Invalid item format: {reason}")]
    InvalidFormat { reason: String },
}

/// Storage read/write/remove failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to read '{key}': {message}")]
    Read { key: String, message: String },

    #[error("Failed to write '{key}': {message}")]
    Write { key: String, message: String },

    #[error("Failed to remove '{key}': {message}")]
    Remove { key: String, message: String },

    /// The adapter did not answer in time
    #[error("Storage {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PersistenceError {
    /// Returns true if retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PersistenceError::Timeout { .. } | PersistenceError::Io(_)
        )
    }
}

/// Umbrella error for callers that want a single type
#[derive(Debug, Error)]
pub enum CartError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type ValidationResult<T> = Result<T, ValidationError>;
pub type PersistenceResult<T> = Result<T, PersistenceError>;
pub type CartResult<T> = Result<T, CartError>;
