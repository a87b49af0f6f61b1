//! # Cart Entry Types
//!
//! The canonical, normalized line item. Entries are built only by the
//! normalizer (or decoded from a persisted snapshot) and are never mutated
//! in place: a quantity change produces a new entry.

use crate::price::Price;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of thing sitting in the cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Retail product
    Product,
    /// Drug from a pharmacy
    Drug,
    /// Multi-item package from an institution
    Package,
    /// Bookable service from a provider
    Service,
}

impl ItemKind {
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Product,
        ItemKind::Drug,
        ItemKind::Package,
        ItemKind::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Product => "product",
            ItemKind::Drug => "drug",
            ItemKind::Package => "package",
            ItemKind::Service => "service",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "product" => Ok(ItemKind::Product),
            "drug" => Ok(ItemKind::Drug),
            "package" => Ok(ItemKind::Package),
            "service" => Ok(ItemKind::Service),
            other => Err(other.to_string()),
        }
    }
}

/// Institution (lab, hospital) offering a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Institution {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            location: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Professional or clinic providing a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Provider {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Metadata for retail products
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Metadata for drugs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pharmacy: Option<String>,
}

/// Metadata for packages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub item_count: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,

    pub institution: Institution,
}

/// Metadata for services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    pub provider: Provider,
}

/// Type discriminant plus the fields that only make sense for that type.
///
/// Serialized as `"type": "...", "metadata": {...}` on the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "metadata", rename_all = "lowercase")]
pub enum EntryDetails {
    Product(ProductMetadata),
    Drug(DrugMetadata),
    Package(PackageMetadata),
    Service(ServiceMetadata),
}

impl EntryDetails {
    pub fn kind(&self) -> ItemKind {
        match self {
            EntryDetails::Product(_) => ItemKind::Product,
            EntryDetails::Drug(_) => ItemKind::Drug,
            EntryDetails::Package(_) => ItemKind::Package,
            EntryDetails::Service(_) => ItemKind::Service,
        }
    }
}

/// A line item in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    key: String,
    name: String,
    unit_price: Price,
    quantity: u32,
    #[serde(flatten)]
    details: EntryDetails,
    added_at: DateTime<Utc>,
}

impl CartEntry {
    pub(crate) fn new(
        key: String,
        name: String,
        unit_price: Price,
        quantity: u32,
        details: EntryDetails,
    ) -> Self {
        Self {
            key,
            name,
            unit_price,
            quantity,
            details,
            added_at: Utc::now(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.details.kind()
    }

    /// Price frozen at the first add
    pub fn unit_price(&self) -> Price {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn details(&self) -> &EntryDetails {
        &self.details
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// unit price × quantity
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }

    /// Copy of this entry with a different quantity. Everything else,
    /// including the unit price and `added_at`, is carried over.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self {
            quantity,
            ..self.clone()
        }
    }

    /// Whether a decoded entry satisfies the entry invariants
    pub(crate) fn is_well_formed(&self) -> bool {
        !self.key.is_empty()
            && !self.name.trim().is_empty()
            && self.unit_price.amount() >= 0
            && self.unit_price <= Price::MAX_UNIT
            && self.quantity >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drug_entry() -> CartEntry {
        CartEntry::new(
            "d1".to_string(),
            "Paracetamol".to_string(),
            Price::from_cents(599),
            2,
            EntryDetails::Drug(DrugMetadata {
                dosage: Some("500mg".to_string()),
                brand: None,
                pharmacy: Some("HealthPlus".to_string()),
            }),
        )
    }

    #[test]
    fn test_line_total() {
        assert_eq!(drug_entry().line_total().amount(), 1198);
    }

    #[test]
    fn test_with_quantity_keeps_identity() {
        let entry = drug_entry();
        let bumped = entry.with_quantity(5);

        assert_eq!(bumped.key(), "d1");
        assert_eq!(bumped.quantity(), 5);
        assert_eq!(bumped.unit_price(), entry.unit_price());
        assert_eq!(bumped.added_at(), entry.added_at());
        assert_eq!(entry.quantity(), 2);
    }

    #[test]
    fn test_entry_json_shape() {
        let json = serde_json::to_value(drug_entry()).unwrap();

        assert_eq!(json["key"], "d1");
        assert_eq!(json["type"], "drug");
        assert_eq!(json["unitPrice"], 599);
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["metadata"]["dosage"], "500mg");
        assert!(json.get("addedAt").is_some());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("package".parse::<ItemKind>(), Ok(ItemKind::Package));
        assert!("gadget".parse::<ItemKind>().is_err());
        assert_eq!(ItemKind::Service.to_string(), "service");
    }

    #[test]
    fn test_well_formed() {
        assert!(drug_entry().is_well_formed());
        assert!(!drug_entry().with_quantity(0).is_well_formed());

        let mut pricey = drug_entry();
        pricey.unit_price = Price::from_cents(i64::MAX);
        assert!(!pricey.is_well_formed());
    }
}
