//! # Aggregate Calculator
//!
//! Pure functions over a slice of entries. Nothing here is cached: every
//! call recomputes from the entries it is given, so a total can never
//! disagree with the snapshot it was computed from.

use crate::entry::{CartEntry, ItemKind};
use crate::price::Price;
use std::collections::BTreeMap;

/// Σ unit price × quantity
pub fn total_price(entries: &[CartEntry]) -> Price {
    entries.iter().map(CartEntry::line_total).sum()
}

/// Σ quantity
pub fn total_items(entries: &[CartEntry]) -> u64 {
    entries.iter().map(|e| u64::from(e.quantity())).sum()
}

/// Entries of one kind, in cart order
pub fn by_type(entries: &[CartEntry], kind: ItemKind) -> Vec<CartEntry> {
    entries
        .iter()
        .filter(|e| e.kind() == kind)
        .cloned()
        .collect()
}

/// Σ quantity per kind; kinds with no entries are absent
pub fn count_by_type(entries: &[CartEntry]) -> BTreeMap<ItemKind, u64> {
    let mut counts = BTreeMap::new();
    for entry in entries {
        *counts.entry(entry.kind()).or_insert(0) += u64::from(entry.quantity());
    }
    counts
}

/// Line-total subtotal per kind; kinds with no entries are absent
pub fn subtotal_by_type(entries: &[CartEntry]) -> BTreeMap<ItemKind, Price> {
    let mut subtotals = BTreeMap::new();
    for entry in entries {
        let subtotal = subtotals.entry(entry.kind()).or_insert(Price::ZERO);
        *subtotal = *subtotal + entry.line_total();
    }
    subtotals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Institution;
    use crate::normalize::{ItemNormalizer, RawDrug, RawPackage, RawProduct};
    use crate::price::Currency;

    fn sample() -> Vec<CartEntry> {
        let n = ItemNormalizer::new(Currency::USD);
        vec![
            n.normalize(&RawDrug::new("d1", "Paracetamol", 5.99).into())
                .unwrap()
                .with_quantity(2),
            n.normalize(&RawProduct::new("p1", "Thermometer", 12.0).into())
                .unwrap(),
            n.normalize(
                &RawPackage::new("pk1", 150.0)
                    .with_institution(Institution::new("inst1"))
                    .into(),
            )
            .unwrap(),
            n.normalize(&RawDrug::new("d2", "Vitamin C", 3.5).into())
                .unwrap()
                .with_quantity(3),
        ]
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(total_price(&[]), Price::ZERO);
        assert_eq!(total_items(&[]), 0);
        assert!(by_type(&[], ItemKind::Drug).is_empty());
        assert!(count_by_type(&[]).is_empty());
    }

    #[test]
    fn test_totals() {
        let entries = sample();
        // 2×5.99 + 12.00 + 150.00 + 3×3.50
        assert_eq!(total_price(&entries).amount(), 1198 + 1200 + 15000 + 1050);
        assert_eq!(total_items(&entries), 7);
    }

    #[test]
    fn test_by_type_keeps_order() {
        let drugs = by_type(&sample(), ItemKind::Drug);
        let keys: Vec<_> = drugs.iter().map(CartEntry::key).collect();
        assert_eq!(keys, vec!["d1", "d2"]);
        assert!(by_type(&sample(), ItemKind::Service).is_empty());
    }

    #[test]
    fn test_group_bys() {
        let entries = sample();

        let counts = count_by_type(&entries);
        assert_eq!(counts.get(&ItemKind::Drug), Some(&5));
        assert_eq!(counts.get(&ItemKind::Package), Some(&1));
        assert_eq!(counts.get(&ItemKind::Service), None);

        let subtotals = subtotal_by_type(&entries);
        assert_eq!(subtotals[&ItemKind::Drug].amount(), 1198 + 1050);
        assert_eq!(subtotals[&ItemKind::Product].amount(), 1200);
    }

    #[test]
    fn test_groups_partition_the_cart() {
        let entries = sample();
        let counts = count_by_type(&entries);
        let subtotals = subtotal_by_type(&entries);

        let mut items = 0;
        let mut price = Price::ZERO;
        let mut entry_count = 0;
        for kind in ItemKind::ALL {
            items += counts.get(&kind).copied().unwrap_or(0);
            price = price + subtotals.get(&kind).copied().unwrap_or(Price::ZERO);
            entry_count += by_type(&entries, kind).len();
        }

        assert_eq!(items, total_items(&entries));
        assert_eq!(price, total_price(&entries));
        assert_eq!(entry_count, entries.len());
    }
}
