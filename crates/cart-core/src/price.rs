//! # Price Types
//!
//! Money for the cart engine. Amounts live in the smallest currency unit
//! so that totals are exact sums; decimals only appear at the edges
//! (raw item input, display).

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::Add;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    MXN,
    NGN,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
            Currency::CHF => "chf",
            Currency::MXN => "mxn",
            Currency::NGN => "ngn",
        }
    }

    /// Parse an ISO code, case-insensitive
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "usd" => Some(Currency::USD),
            "eur" => Some(Currency::EUR),
            "gbp" => Some(Currency::GBP),
            "jpy" => Some(Currency::JPY),
            "cad" => Some(Currency::CAD),
            "aud" => Some(Currency::AUD),
            "chf" => Some(Currency::CHF),
            "mxn" => Some(Currency::MXN),
            "ngn" => Some(Currency::NGN),
            _ => None,
        }
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, the others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::CAD => "C$",
            Currency::AUD => "A$",
            Currency::CHF => "CHF ",
            Currency::MXN => "MX$",
            Currency::NGN => "₦",
        }
    }

    /// Convert a decimal amount to the smallest currency unit (cents, kobo, etc.)
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(i32::from(self.decimal_places()));
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(i32::from(self.decimal_places()));
        amount as f64 / divisor
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// An amount in the smallest currency unit.
///
/// Serialized as a bare integer. The currency is a property of the cart,
/// not of each price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price {
    amount: i64,
}

impl Price {
    pub const ZERO: Price = Price { amount: 0 };

    /// Largest accepted unit price, in the smallest unit. Times `u32::MAX`
    /// it still fits an `i64`.
    pub const MAX_UNIT: Price = Price {
        amount: 1_000_000_000,
    };

    /// Create a price from smallest unit (cents)
    pub fn from_cents(amount: i64) -> Self {
        Self { amount }
    }

    /// Create a price from a decimal amount in the given currency
    pub fn from_decimal(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
        }
    }

    /// Amount in the smallest unit
    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// Get the decimal amount
    pub fn as_decimal(&self, currency: Currency) -> f64 {
        currency.from_smallest_unit(self.amount)
    }

    /// Price of `quantity` units
    pub fn times(&self, quantity: u32) -> Price {
        Price {
            amount: self.amount.saturating_mul(i64::from(quantity)),
        }
    }

    /// Format for display (e.g., "$10.00")
    pub fn display(&self, currency: Currency) -> String {
        if currency.decimal_places() == 0 {
            format!("{}{}", currency.symbol(), self.amount)
        } else {
            format!("{}{:.2}", currency.symbol(), self.as_decimal(currency))
        }
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price {
            amount: self.amount.saturating_add(rhs.amount),
        }
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Price>>(iter: I) -> Price {
        iter.fold(Price::ZERO, Add::add)
    }
}
