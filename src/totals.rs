//! Document money arithmetic.
//!
//! Every screen and every printed page reads its totals from here. Values are
//! plain `f64`; rounding to two decimals happens only when formatting.

use serde::{Deserialize, Serialize};

use crate::model::LineItem;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: f64,
    pub discount_amount: f64,
    pub after_discount: f64,
    pub vat: f64,
    pub grand_total: f64,
}

impl Totals {
    /// `discount` and `vat_rate` are percentages.
    pub fn compute(items: &[LineItem], discount: f64, vat_rate: f64) -> Self {
        Self::from_amounts(items.iter().map(|i| i.amount), discount, vat_rate)
    }

    pub fn from_amounts(amounts: impl IntoIterator<Item = f64>, discount: f64, vat_rate: f64) -> Self {
        let subtotal: f64 = amounts.into_iter().sum();
        let discount_amount = subtotal * discount / 100.0;
        let after_discount = subtotal - discount_amount;
        let vat = after_discount * vat_rate / 100.0;
        Totals {
            subtotal,
            discount_amount,
            after_discount,
            vat,
            grand_total: after_discount + vat,
        }
    }

    /// True when any field differs by more than `tolerance`.
    pub fn differs_from(&self, other: &Totals, tolerance: f64) -> bool {
        let pairs = [
            (self.subtotal, other.subtotal),
            (self.discount_amount, other.discount_amount),
            (self.after_discount, other.after_discount),
            (self.vat, other.vat),
            (self.grand_total, other.grand_total),
        ];
        pairs.iter().any(|(a, b)| (a - b).abs() > tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn amounts(values: &[f64]) -> Vec<LineItem> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| LineItem::lump_sum(i.to_string(), "", *v))
            .collect()
    }

    #[test]
    fn discount_then_vat() {
        let totals = Totals::compute(&amounts(&[1000.0, 500.0]), 10.0, 7.0);
        assert_eq!(totals.subtotal, 1500.0);
        assert_eq!(totals.discount_amount, 150.0);
        assert_eq!(totals.after_discount, 1350.0);
        assert_eq!(totals.vat, 94.5);
        assert_eq!(totals.grand_total, 1444.5);
    }

    #[test]
    fn empty_document_is_all_zero() {
        assert_eq!(Totals::compute(&[], 5.0, 7.0), Totals::default());
    }

    #[test]
    fn amount_overrides_are_respected() {
        let mut item = LineItem::new("1", "ค่าขนส่ง");
        item.set_qty(2.0);
        item.set_price(100.0);
        item.set_amount(150.0);
        let totals = Totals::compute(&[item], 0.0, 0.0);
        assert_eq!(totals.grand_total, 150.0);
    }

    #[test]
    fn mismatch_detection_uses_tolerance() {
        let computed = Totals::from_amounts([100.0], 0.0, 7.0);
        let mut stored = computed;
        stored.vat += 0.001;
        assert!(!computed.differs_from(&stored, 0.005));
        stored.grand_total += 1.0;
        assert!(computed.differs_from(&stored, 0.005));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

        #[test]
        fn totals_chain_is_consistent(
            values in prop::collection::vec(0.0f64..1_000_000.0, 0..40),
            discount in 0.0f64..=100.0,
            vat_rate in 0.0f64..30.0,
        ) {
            let totals = Totals::compute(&amounts(&values), discount, vat_rate);
            prop_assert_eq!(totals.subtotal - totals.discount_amount, totals.after_discount);
            prop_assert_eq!(totals.after_discount + totals.vat, totals.grand_total);
            prop_assert!(totals.after_discount >= -1e-6);
        }
    }
}
