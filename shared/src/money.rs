//! Money arithmetic for invoice totals
//!
//! Amounts are plain `f64` values rounded to cents at every boundary, so two
//! amounts are considered equal when they agree to the cent.

use serde::{Deserialize, Serialize};

/// Default tax rate applied to invoice subtotals (13%)
pub const DEFAULT_TAX_RATE: f64 = 0.13;

/// Computed totals for an invoice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub total_amount: f64,
    pub tax_amount: f64,
    pub total_with_tax: f64,
}

/// Round an amount to the nearest cent
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Subtotal of a single line item
pub fn line_subtotal(quantity: i64, price: f64) -> f64 {
    round_to_cents(quantity as f64 * price)
}

/// True when two amounts agree to the cent
pub fn amounts_match(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

/// Compute invoice totals from line items as (quantity, unit price) pairs
pub fn compute_totals(lines: &[(i64, f64)], tax_rate: f64) -> InvoiceTotals {
    let total_amount = round_to_cents(
        lines
            .iter()
            .map(|(quantity, price)| line_subtotal(*quantity, *price))
            .sum(),
    );
    let tax_amount = round_to_cents(total_amount * tax_rate);
    let total_with_tax = round_to_cents(total_amount + tax_amount);

    InvoiceTotals {
        total_amount,
        tax_amount,
        total_with_tax,
    }
}

/// Validate that the declared totals are consistent with the line items
///
/// The tax rate itself is the caller's business; only the internal
/// consistency of the three declared amounts is checked.
pub fn validate_totals(
    lines: &[(i64, f64)],
    total_amount: f64,
    tax_amount: f64,
    total_with_tax: f64,
) -> Result<(), &'static str> {
    let line_sum = round_to_cents(
        lines
            .iter()
            .map(|(quantity, price)| line_subtotal(*quantity, *price))
            .sum(),
    );

    if !amounts_match(line_sum, total_amount) {
        return Err("Total amount does not match the sum of line items");
    }
    if !amounts_match(total_amount + tax_amount, total_with_tax) {
        return Err("Total with tax does not match total amount plus tax");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_cents() {
        assert_eq!(round_to_cents(1.006), 1.01);
        assert_eq!(round_to_cents(1.004), 1.0);
        assert_eq!(round_to_cents(59.971), 59.97);
        assert_eq!(round_to_cents(0.0), 0.0);
    }

    #[test]
    fn test_line_subtotal() {
        assert!(amounts_match(line_subtotal(3, 19.99), 59.97));
        assert!(amounts_match(line_subtotal(1, 0.0), 0.0));
        assert!(amounts_match(line_subtotal(10, 2.5), 25.0));
    }

    #[test]
    fn test_amounts_match_tolerance() {
        assert!(amounts_match(10.0, 10.0));
        assert!(amounts_match(10.0, 10.004));
        assert!(!amounts_match(10.0, 10.01));
        assert!(!amounts_match(10.0, 9.99));
    }

    #[test]
    fn test_compute_totals() {
        let totals = compute_totals(&[(3, 19.99), (2, 5.0)], DEFAULT_TAX_RATE);
        // 59.97 + 10.00 = 69.97, tax 9.10 (69.97 * 0.13 = 9.0961), total 79.07
        assert!(amounts_match(totals.total_amount, 69.97));
        assert!(amounts_match(totals.tax_amount, 9.1));
        assert!(amounts_match(totals.total_with_tax, 79.07));
    }

    #[test]
    fn test_compute_totals_zero_rate() {
        let totals = compute_totals(&[(4, 2.5)], 0.0);
        assert!(amounts_match(totals.total_amount, 10.0));
        assert!(amounts_match(totals.tax_amount, 0.0));
        assert!(amounts_match(totals.total_with_tax, 10.0));
    }

    #[test]
    fn test_validate_totals_accepts_computed() {
        let lines = [(3, 19.99), (1, 4.5)];
        let totals = compute_totals(&lines, DEFAULT_TAX_RATE);
        assert!(validate_totals(
            &lines,
            totals.total_amount,
            totals.tax_amount,
            totals.total_with_tax
        )
        .is_ok());
    }

    #[test]
    fn test_validate_totals_rejects_wrong_total() {
        let lines = [(3, 19.99)];
        let totals = compute_totals(&lines, DEFAULT_TAX_RATE);
        assert!(validate_totals(
            &lines,
            totals.total_amount + 0.01,
            totals.tax_amount,
            totals.total_with_tax
        )
        .is_err());
    }

    #[test]
    fn test_validate_totals_rejects_wrong_tax_sum() {
        let lines = [(2, 10.0)];
        let totals = compute_totals(&lines, DEFAULT_TAX_RATE);
        assert!(validate_totals(
            &lines,
            totals.total_amount,
            totals.tax_amount + 1.0,
            totals.total_with_tax
        )
        .is_err());
    }
}
