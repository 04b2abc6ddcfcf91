//! # Pricing
//!
//! Turns resolved sale lines into balanced totals.
//!
//! ## Tax Policies
//! ```text
//! FlatOrder(rate)   tax = round(subtotal × rate)
//!                   then apportioned back to lines so Σ line tax == tax
//!
//! PerLine           line tax = round(line subtotal × product rate)
//!                   tax = Σ line tax
//! ```
//!
//! Either way `total = subtotal + tax - discount`, exactly.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, TaxRate};
use crate::{DEFAULT_TAX_RATE_BPS, MAX_SALE_LINES};

/// How tax is derived for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaxPolicy {
    /// One rate applied to the order subtotal.
    FlatOrder(TaxRate),
    /// Each line taxed at its product's own rate.
    PerLine,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        TaxPolicy::FlatOrder(TaxRate::from_bps(DEFAULT_TAX_RATE_BPS))
    }
}

/// A sale line after the product has been looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub tax_rate: TaxRate,
}

impl PricedLine {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: Money,
        tax_rate: TaxRate,
    ) -> Self {
        PricedLine {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
            tax_rate,
        }
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

/// Output of [`compute_totals`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    /// Tax per input line, same order as the input.
    pub line_taxes: Vec<Money>,
}

/// Computes subtotal, tax, discount and total for a set of lines.
///
/// ## Errors
/// - `ValidationError::EmptySale` for no lines
/// - `ValidationError::OutOfRange` for more than [`MAX_SALE_LINES`] lines
/// - `ValidationError::MustNotBeNegative` for a negative discount
/// - `CoreError::DiscountExceedsTotal` when the discount is larger than
///   subtotal + tax
pub fn compute_totals(
    lines: &[PricedLine],
    policy: TaxPolicy,
    discount: Money,
) -> CoreResult<SaleTotals> {
    if lines.is_empty() {
        return Err(ValidationError::EmptySale.into());
    }
    if lines.len() > MAX_SALE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_LINES as i64,
        }
        .into());
    }
    if discount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "discount".to_string(),
        }
        .into());
    }

    let subtotal: Money = lines.iter().map(PricedLine::subtotal).sum();

    let line_taxes = match policy {
        TaxPolicy::FlatOrder(rate) => apportion_tax(lines, subtotal.calculate_tax(rate), rate),
        TaxPolicy::PerLine => lines
            .iter()
            .map(|line| line.subtotal().calculate_tax(line.tax_rate))
            .collect(),
    };
    let tax: Money = line_taxes.iter().sum();

    let gross = subtotal + tax;
    if discount > gross {
        return Err(CoreError::DiscountExceedsTotal { discount, gross });
    }

    Ok(SaleTotals {
        subtotal,
        tax,
        discount,
        total: gross - discount,
        line_taxes,
    })
}

/// Splits an order-level tax across lines by largest remainder so the
/// parts sum to exactly `order_tax`.
fn apportion_tax(lines: &[PricedLine], order_tax: Money, rate: TaxRate) -> Vec<Money> {
    let bps = rate.bps() as i128;
    let mut shares: Vec<(usize, i64, i128)> = lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let exact = line.subtotal().cents() as i128 * bps;
            (idx, (exact / 10_000) as i64, exact % 10_000)
        })
        .collect();

    let assigned: i64 = shares.iter().map(|(_, cents, _)| cents).sum();
    let mut leftover = order_tax.cents() - assigned;

    // Largest fractional part first; ties go to the earlier line.
    shares.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
    for share in shares.iter_mut() {
        if leftover <= 0 {
            break;
        }
        share.1 += 1;
        leftover -= 1;
    }
    shares.sort_by_key(|(idx, _, _)| *idx);

    shares
        .into_iter()
        .map(|(_, cents, _)| Money::from_cents(cents))
        .collect()
}

/// Loyalty points earned for a sale: one per 100 whole currency units.
///
/// ```rust
/// use meridian_core::{pricing::loyalty_points_for, Money};
///
/// assert_eq!(loyalty_points_for(Money::from_cents(25_000)), 2);
/// assert_eq!(loyalty_points_for(Money::from_cents(9_999)), 0);
/// ```
pub fn loyalty_points_for(total: Money) -> i64 {
    total.whole_units_of(Money::from_major(100)).max(0)
}

/// Formats the human-readable transaction number for a tenant sequence.
///
/// ```rust
/// use chrono::TimeZone;
/// use meridian_core::pricing::format_transaction_number;
///
/// let at = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
/// assert_eq!(format_transaction_number(at, 42), "TXN-20260301-000042");
/// ```
pub fn format_transaction_number(at: chrono::DateTime<chrono::Utc>, sequence: i64) -> String {
    format!("TXN-{}-{:06}", at.format("%Y%m%d"), sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, qty: i64, cents: i64, bps: u32) -> PricedLine {
        PricedLine::new(id, id, qty, Money::from_cents(cents), TaxRate::from_bps(bps))
    }

    #[test]
    fn test_zero_tax_scenario() {
        let lines = vec![line("A", 2, 100, 0), line("B", 1, 50, 0)];
        let totals = compute_totals(&lines, TaxPolicy::PerLine, Money::zero()).unwrap();
        assert_eq!(totals.subtotal.cents(), 250);
        assert_eq!(totals.tax.cents(), 0);
        assert_eq!(totals.total.cents(), 250);
    }

    #[test]
    fn test_flat_order_tax_is_apportioned_exactly() {
        // 3 × 33 cents: exact tax is 6.93 -> 7 cents; lines get 2.31 each
        let lines = vec![line("A", 1, 33, 0), line("B", 1, 33, 0), line("C", 1, 33, 0)];
        let policy = TaxPolicy::FlatOrder(TaxRate::from_bps(700));
        let totals = compute_totals(&lines, policy, Money::zero()).unwrap();

        assert_eq!(totals.subtotal.cents(), 99);
        assert_eq!(totals.tax.cents(), 7);
        let parts: Vec<i64> = totals.line_taxes.iter().map(Money::cents).collect();
        assert_eq!(parts, vec![3, 2, 2]);
        assert_eq!(totals.total.cents(), 106);
    }

    #[test]
    fn test_per_line_tax_uses_product_rates() {
        let lines = vec![line("A", 2, 1000, 825), line("B", 1, 500, 0)];
        let totals = compute_totals(&lines, TaxPolicy::PerLine, Money::zero()).unwrap();
        assert_eq!(totals.line_taxes, vec![Money::from_cents(165), Money::zero()]);
        assert_eq!(totals.total.cents(), 2665);
    }

    #[test]
    fn test_totals_always_balance() {
        let policy = TaxPolicy::default();
        for qty in 1..20 {
            for cents in [1, 7, 99, 1234, 99_999] {
                let lines = vec![line("A", qty, cents, 0), line("B", 1, cents + 3, 0)];
                let discount = Money::from_cents(cents / 2);
                let t = compute_totals(&lines, policy, discount).unwrap();
                assert_eq!(t.total, t.subtotal + t.tax - t.discount);
                assert_eq!(t.tax, t.line_taxes.iter().sum::<Money>());
                assert_eq!(t.subtotal, lines.iter().map(PricedLine::subtotal).sum::<Money>());
            }
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            compute_totals(&[], TaxPolicy::PerLine, Money::zero()),
            Err(CoreError::Validation(ValidationError::EmptySale))
        ));

        let lines = vec![line("A", 1, 100, 0)];
        assert!(matches!(
            compute_totals(&lines, TaxPolicy::PerLine, Money::from_cents(-1)),
            Err(CoreError::Validation(ValidationError::MustNotBeNegative { .. }))
        ));
        assert!(matches!(
            compute_totals(&lines, TaxPolicy::PerLine, Money::from_cents(101)),
            Err(CoreError::DiscountExceedsTotal { .. })
        ));
    }
}
