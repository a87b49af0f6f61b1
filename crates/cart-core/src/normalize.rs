//! # Item Normalizer
//!
//! Turns the raw shapes the catalog screens hand us (product, drug,
//! package, service) into a canonical [`CartEntry`].
//!
//! ```text
//!   JSON / typed input ──► RawItem ──► ItemNormalizer::normalize ──► CartEntry
//!                            │                  │
//!                 "type" missing = product      ├── validate id, name, price
//!                                               ├── derive identity key
//!                                               └── keep only the variant's metadata
//! ```
//!
//! Identity keys:
//!
//! | Type    | Key                                  |
//! |---------|--------------------------------------|
//! | product | `<id>`                               |
//! | drug    | `<id>`                               |
//! | package | `package_<packageId>_<institutionId>`|
//! | service | `service_<serviceId>_<providerId>`   |
//!
//! Key derivation lives here and nowhere else.

use crate::entry::{
    CartEntry, DrugMetadata, EntryDetails, Institution, ItemKind, PackageMetadata,
    ProductMetadata, Provider, ServiceMetadata,
};
use crate::error::{ValidationError, ValidationResult};
use crate::price::{Currency, Price};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

// =============================================================================
// Raw Input Shapes
// =============================================================================

/// Retail product as delivered by the catalog
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    #[serde(default, deserialize_with = "loose_label")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl RawProduct {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            price: Some(price),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Drug as delivered by the pharmacy screens
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDrug {
    #[serde(default, deserialize_with = "loose_label")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    /// Either a pharmacy name or a pharmacy object with a `name`
    #[serde(default, deserialize_with = "loose_label")]
    pub pharmacy: Option<String>,
}

impl RawDrug {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            price: Some(price),
            ..Default::default()
        }
    }

    pub fn with_dosage(mut self, dosage: impl Into<String>) -> Self {
        self.dosage = Some(dosage.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_pharmacy(mut self, pharmacy: impl Into<String>) -> Self {
        self.pharmacy = Some(pharmacy.into());
        self
    }
}

/// Test/checkup package offered by an institution
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPackage {
    #[serde(default, deserialize_with = "loose_label")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub item_count: Option<u32>,
    /// Item names; objects with a `name` are accepted too
    #[serde(default, deserialize_with = "loose_labels")]
    pub items: Vec<String>,
    #[serde(default)]
    pub institution: Option<Institution>,
}

impl RawPackage {
    pub fn new(id: impl Into<String>, price: f64) -> Self {
        Self {
            id: Some(id.into()),
            price: Some(price),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_item_count(mut self, item_count: u32) -> Self {
        self.item_count = Some(item_count);
        self
    }

    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_institution(mut self, institution: Institution) -> Self {
        self.institution = Some(institution);
        self
    }
}

/// Bookable service offered by a provider
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawService {
    #[serde(default, deserialize_with = "loose_label")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub provider: Option<Provider>,
}

impl RawService {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            price: Some(price),
            ..Default::default()
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// One raw item, tagged by its `type`.
///
/// Deserializing goes through [`TryFrom<Value>`] so that a missing `type`
/// falls back to `product`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum RawItem {
    Product(RawProduct),
    Drug(RawDrug),
    Package(RawPackage),
    Service(RawService),
}

impl RawItem {
    pub fn kind(&self) -> ItemKind {
        match self {
            RawItem::Product(_) => ItemKind::Product,
            RawItem::Drug(_) => ItemKind::Drug,
            RawItem::Package(_) => ItemKind::Package,
            RawItem::Service(_) => ItemKind::Service,
        }
    }
}

impl From<RawProduct> for RawItem {
    fn from(raw: RawProduct) -> Self {
        RawItem::Product(raw)
    }
}

impl From<RawDrug> for RawItem {
    fn from(raw: RawDrug) -> Self {
        RawItem::Drug(raw)
    }
}

impl From<RawPackage> for RawItem {
    fn from(raw: RawPackage) -> Self {
        RawItem::Package(raw)
    }
}

impl From<RawService> for RawItem {
    fn from(raw: RawService) -> Self {
        RawItem::Service(raw)
    }
}

impl TryFrom<Value> for RawItem {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let kind = {
            let obj = value.as_object().ok_or_else(|| ValidationError::InvalidFormat {
                reason: "expected a JSON object".to_string(),
            })?;

            match obj.get("type") {
                None | Some(Value::Null) => ItemKind::Product,
                Some(Value::String(s)) => s
                    .parse()
                    .map_err(|kind| ValidationError::UnknownItemType { kind })?,
                Some(other) => {
                    return Err(ValidationError::UnknownItemType {
                        kind: other.to_string(),
                    })
                }
            }
        };

        let parsed = match kind {
            ItemKind::Product => serde_json::from_value(value).map(RawItem::Product),
            ItemKind::Drug => serde_json::from_value(value).map(RawItem::Drug),
            ItemKind::Package => serde_json::from_value(value).map(RawItem::Package),
            ItemKind::Service => serde_json::from_value(value).map(RawItem::Service),
        };

        parsed.map_err(|e| ValidationError::InvalidFormat {
            reason: e.to_string(),
        })
    }
}

/// Accepts a string, a number, or an object carrying `name`/`title`
fn label_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(obj) => obj
            .get("name")
            .or_else(|| obj.get("title"))
            .and_then(Value::as_str)
            .map(String::from),
        _ => None,
    }
}

fn loose_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => label_of(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a string or id, got {value}"))),
    }
}

fn loose_labels<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    values
        .iter()
        .map(|value| {
            label_of(value)
                .ok_or_else(|| de::Error::custom(format!("unrecognised package item: {value}")))
        })
        .collect()
}

// =============================================================================
// Normalizer
// =============================================================================

/// Builds validated cart entries from raw items.
///
/// New entries start at quantity 1; the caller sets the real quantity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemNormalizer {
    currency: Currency,
}

impl ItemNormalizer {
    pub fn new(currency: Currency) -> Self {
        Self { currency }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Validate `raw` and build its canonical entry.
    pub fn normalize(&self, raw: &RawItem) -> ValidationResult<CartEntry> {
        match raw {
            RawItem::Product(product) => self.product(product),
            RawItem::Drug(drug) => self.drug(drug),
            RawItem::Package(package) => self.package(package),
            RawItem::Service(service) => self.service(service),
        }
    }

    fn product(&self, raw: &RawProduct) -> ValidationResult<CartEntry> {
        let id = required_id(raw.id.as_deref())?;
        let name = required_name(raw.name.as_deref())?;
        let price = self.price(raw.price)?;

        Ok(CartEntry::new(
            id.to_string(),
            name,
            price,
            1,
            EntryDetails::Product(ProductMetadata {
                description: raw.description.clone(),
                image: raw.image.clone(),
            }),
        ))
    }

    fn drug(&self, raw: &RawDrug) -> ValidationResult<CartEntry> {
        let id = required_id(raw.id.as_deref())?;
        let name = required_name(raw.name.as_deref())?;
        let price = self.price(raw.price)?;

        Ok(CartEntry::new(
            id.to_string(),
            name,
            price,
            1,
            EntryDetails::Drug(DrugMetadata {
                dosage: raw.dosage.clone(),
                brand: raw.brand.clone(),
                pharmacy: raw.pharmacy.clone(),
            }),
        ))
    }

    fn package(&self, raw: &RawPackage) -> ValidationResult<CartEntry> {
        let id = required_id(raw.id.as_deref())?;
        let institution = raw
            .institution
            .as_ref()
            .ok_or(ValidationError::Required {
                field: "institution",
            })?;
        let institution_id = required_field(Some(institution.id.as_str()), "institution.id")?;

        // Catalog packages are often unnamed; the id stands in.
        let name = match raw.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Package {id}"),
        };
        let price = self.price(raw.price)?;
        let item_count = raw
            .item_count
            .unwrap_or_else(|| u32::try_from(raw.items.len()).unwrap_or(u32::MAX));

        Ok(CartEntry::new(
            package_key(id, institution_id),
            name,
            price,
            1,
            EntryDetails::Package(PackageMetadata {
                item_count,
                items: raw.items.clone(),
                institution: institution.clone(),
            }),
        ))
    }

    fn service(&self, raw: &RawService) -> ValidationResult<CartEntry> {
        let id = required_id(raw.id.as_deref())?;
        let provider = raw
            .provider
            .as_ref()
            .ok_or(ValidationError::Required { field: "provider" })?;
        let provider_id = required_field(Some(provider.id.as_str()), "provider.id")?;
        let name = required_name(raw.name.as_deref())?;
        let price = self.price(raw.price)?;

        Ok(CartEntry::new(
            service_key(id, provider_id),
            name,
            price,
            1,
            EntryDetails::Service(ServiceMetadata {
                description: raw.description.clone(),
                image: raw.image.clone(),
                provider: provider.clone(),
            }),
        ))
    }

    fn price(&self, price: Option<f64>) -> ValidationResult<Price> {
        let price = price.ok_or(ValidationError::Required { field: "price" })?;
        if !price.is_finite() || price < 0.0 {
            return Err(ValidationError::NegativePrice { price });
        }
        let unit = Price::from_decimal(price, self.currency);
        if unit > Price::MAX_UNIT {
            return Err(ValidationError::PriceTooLarge { price });
        }
        Ok(unit)
    }
}

fn required_field<'a>(value: Option<&'a str>, field: &'static str) -> ValidationResult<&'a str> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::Required { field }),
    }
}

fn required_id(id: Option<&str>) -> ValidationResult<&str> {
    required_field(id, "id")
}

fn required_name(name: Option<&str>) -> ValidationResult<String> {
    required_field(name, "name").map(String::from)
}

fn package_key(package_id: &str, institution_id: &str) -> String {
    format!("package_{package_id}_{institution_id}")
}

fn service_key(service_id: &str, provider_id: &str) -> String {
    format!("service_{service_id}_{provider_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalizer() -> ItemNormalizer {
        ItemNormalizer::new(Currency::USD)
    }

    #[test]
    fn test_drug_normalization() {
        let raw = RawDrug::new("d1", "Paracetamol", 5.99)
            .with_dosage("500mg")
            .with_pharmacy("MedPlus");
        let entry = normalizer().normalize(&raw.into()).unwrap();

        assert_eq!(entry.key(), "d1");
        assert_eq!(entry.kind(), ItemKind::Drug);
        assert_eq!(entry.unit_price().amount(), 599);
        assert_eq!(entry.quantity(), 1);
        match entry.details() {
            EntryDetails::Drug(meta) => {
                assert_eq!(meta.dosage.as_deref(), Some("500mg"));
                assert_eq!(meta.pharmacy.as_deref(), Some("MedPlus"));
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_package_key_includes_institution() {
        let raw = RawPackage::new("pk1", 15000.0)
            .with_item_count(3)
            .with_institution(Institution::new("inst1"));
        let entry = normalizer().normalize(&raw.into()).unwrap();

        assert_eq!(entry.key(), "package_pk1_inst1");
        assert_eq!(entry.name(), "Package pk1");
        assert_eq!(entry.unit_price().amount(), 1_500_000);
    }

    #[test]
    fn test_package_item_count_defaults_to_items() {
        let raw = RawPackage::new("pk2", 100.0)
            .with_items(["Full blood count", "Lipid profile"])
            .with_institution(Institution::new("lab9"));
        let entry = normalizer().normalize(&raw.into()).unwrap();

        match entry.details() {
            EntryDetails::Package(meta) => assert_eq!(meta.item_count, 2),
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_package_without_institution_fails() {
        let raw = RawPackage::new("pk1", 10.0);
        let err = normalizer().normalize(&raw.into()).unwrap_err();
        assert_eq!(err, ValidationError::Required { field: "institution" });
    }

    #[test]
    fn test_service_key() {
        let raw = RawService::new("s1", "Teleconsultation", 40.0)
            .with_provider(Provider::new("dr-ade").with_name("Dr. Ade"));
        let entry = normalizer().normalize(&raw.into()).unwrap();

        assert_eq!(entry.key(), "service_s1_dr-ade");
        assert_eq!(entry.kind(), ItemKind::Service);
    }

    #[test]
    fn test_missing_name_rejected() {
        let raw = RawProduct {
            id: Some("p1".into()),
            name: Some("   ".into()),
            price: Some(3.0),
            ..Default::default()
        };
        let err = normalizer().normalize(&raw.into()).unwrap_err();
        assert_eq!(err, ValidationError::Required { field: "name" });
    }

    #[test]
    fn test_missing_or_negative_price_rejected() {
        let missing = RawProduct {
            id: Some("p1".into()),
            name: Some("Thermometer".into()),
            ..Default::default()
        };
        assert_eq!(
            normalizer().normalize(&missing.into()).unwrap_err(),
            ValidationError::Required { field: "price" }
        );

        let negative = RawProduct::new("p1", "Thermometer", -1.0);
        assert!(matches!(
            normalizer().normalize(&negative.into()),
            Err(ValidationError::NegativePrice { .. })
        ));
    }

    #[test]
    fn test_price_above_bound_rejected() {
        for price in [1e300, 10_000_000.01] {
            let raw = RawProduct::new("p1", "Thermometer", price);
            assert_eq!(
                normalizer().normalize(&raw.into()).unwrap_err(),
                ValidationError::PriceTooLarge { price }
            );
        }

        let at_bound = RawProduct::new("p1", "Thermometer", 10_000_000.0);
        let entry = normalizer().normalize(&at_bound.into()).unwrap();
        assert_eq!(entry.unit_price(), Price::MAX_UNIT);
        assert_eq!(
            entry.with_quantity(u32::MAX).line_total().amount(),
            1_000_000_000 * i64::from(u32::MAX)
        );
    }

    #[test]
    fn test_free_item_allowed() {
        let raw = RawProduct::new("leaflet", "Leaflet", 0.0);
        let entry = normalizer().normalize(&raw.into()).unwrap();
        assert_eq!(entry.unit_price(), Price::ZERO);
    }

    #[test]
    fn test_json_without_type_is_product() {
        let raw = RawItem::try_from(json!({ "id": "d1", "name": "Paracetamol", "price": 5.99 }))
            .unwrap();
        assert_eq!(raw.kind(), ItemKind::Product);
    }

    #[test]
    fn test_json_numeric_ids_and_loose_fields() {
        let raw: RawItem = serde_json::from_value(json!({
            "type": "drug",
            "id": 42,
            "name": "Amoxicillin",
            "price": 12.5,
            "pharmacy": { "id": "ph1", "name": "City Pharmacy" }
        }))
        .unwrap();
        let entry = normalizer().normalize(&raw).unwrap();

        assert_eq!(entry.key(), "42");
        match entry.details() {
            EntryDetails::Drug(meta) => assert_eq!(meta.pharmacy.as_deref(), Some("City Pharmacy")),
            other => panic!("unexpected details: {other:?}"),
        }
    }

    #[test]
    fn test_json_package_items_as_objects() {
        let raw = RawItem::try_from(json!({
            "type": "package",
            "id": "pk1",
            "price": 15000,
            "items": [{ "name": "Malaria test" }, "Urinalysis"],
            "institution": { "id": "inst1", "name": "Reddington" }
        }))
        .unwrap();

        match raw {
            RawItem::Package(pkg) => assert_eq!(pkg.items, vec!["Malaria test", "Urinalysis"]),
            other => panic!("unexpected raw item: {other:?}"),
        }
    }

    #[test]
    fn test_json_unknown_type_rejected() {
        let err = RawItem::try_from(json!({ "type": "voucher", "id": "v1" })).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownItemType {
                kind: "voucher".into()
            }
        );
    }

    #[test]
    fn test_json_non_object_rejected() {
        assert!(matches!(
            RawItem::try_from(json!(["not", "an", "item"])),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }
}
