//! # Sale Pricing
//!
//! Turns caller-supplied lines and an optional, already-validated coupon into
//! the three numbers a ledger header stores.
//!
//! ```text
//! lines ──► raw_total = Σ unit_price × quantity
//!                 │
//!   coupon? ──────┼──► discount = round_half_up(raw_total × pct / 100)
//!                 │
//!                 ▼
//!           total = raw_total - discount
//! ```
//!
//! Pricing is deterministic: the same lines and coupon always give the same
//! totals, and no catalog lookup happens here.

use serde::Serialize;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Coupon, SaleLine};

/// Computed amounts for one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    pub raw_total: Money,
    pub discount: Money,
    pub total: Money,
    /// Name of the applied coupon.
    pub coupon: Option<String>,
}

/// Sums `unit_price × quantity` over all lines with overflow checks.
pub fn raw_total(lines: &[SaleLine]) -> CoreResult<Money> {
    lines.iter().try_fold(Money::zero(), |acc, line| {
        line.line_total()
            .and_then(|line_total| acc.checked_add(line_total))
            .ok_or_else(|| CoreError::from(total_overflow()))
    })
}

/// Prices a sale.
///
/// ## Arguments
/// * `lines` - Lines in caller order (prices are trusted as supplied)
/// * `coupon` - A coupon that has already passed the expiry check
///
/// ## Returns
/// `SaleTotals` with `discount = 0` and no coupon name when `coupon` is `None`.
///
/// ## Example
/// ```rust
/// use till_core::pricing::price_sale;
/// use till_core::types::SaleLine;
///
/// let totals = price_sale(&[SaleLine::new("p-1", 3, 1000)], None).unwrap();
/// assert_eq!(totals.total.cents(), 3000);
/// assert!(totals.discount.is_zero());
/// ```
pub fn price_sale(lines: &[SaleLine], coupon: Option<&Coupon>) -> CoreResult<SaleTotals> {
    let raw_total = raw_total(lines)?;

    let (discount, coupon_name) = match coupon {
        Some(coupon) => (
            raw_total.percentage_of(coupon.percentage),
            Some(coupon.name.clone()),
        ),
        None => (Money::zero(), None),
    };

    Ok(SaleTotals {
        raw_total,
        discount,
        total: raw_total - discount,
        coupon: coupon_name,
    })
}

fn total_overflow() -> ValidationError {
    ValidationError::OutOfRange {
        field: "total".to_string(),
        min: 0,
        max: i64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Percentage;
    use chrono::NaiveDate;

    fn coupon(pct: u8) -> Coupon {
        Coupon {
            id: "c-1".to_string(),
            name: "SAVE".to_string(),
            percentage: Percentage::new(pct).unwrap(),
            expiration_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_price_without_coupon() {
        let lines = vec![SaleLine::new("a", 3, 1000), SaleLine::new("b", 2, 250)];
        let totals = price_sale(&lines, None).unwrap();

        assert_eq!(totals.raw_total.cents(), 3500);
        assert_eq!(totals.total.cents(), 3500);
        assert!(totals.discount.is_zero());
        assert_eq!(totals.coupon, None);
    }

    #[test]
    fn test_price_with_ten_percent() {
        let lines = vec![SaleLine::new("a", 1, 10_000)];
        let totals = price_sale(&lines, Some(&coupon(10))).unwrap();

        assert_eq!(totals.discount.cents(), 1_000);
        assert_eq!(totals.total.cents(), 9_000);
        assert_eq!(totals.coupon.as_deref(), Some("SAVE"));
    }

    #[test]
    fn test_discount_rounding_half_up() {
        let totals = price_sale(&[SaleLine::new("a", 1, 999)], Some(&coupon(15))).unwrap();
        assert_eq!(totals.discount.cents(), 150);
        assert_eq!(totals.total.cents(), 849);

        let totals = price_sale(&[SaleLine::new("a", 1, 1)], Some(&coupon(50))).unwrap();
        assert_eq!(totals.discount.cents(), 1);
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn test_zero_and_full_discount() {
        let lines = vec![SaleLine::new("a", 2, 499)];

        let zero = price_sale(&lines, Some(&coupon(0))).unwrap();
        assert!(zero.discount.is_zero());
        assert_eq!(zero.total.cents(), 998);
        assert_eq!(zero.coupon.as_deref(), Some("SAVE"));

        let full = price_sale(&lines, Some(&coupon(100))).unwrap();
        assert_eq!(full.discount.cents(), 998);
        assert!(full.total.is_zero());
    }

    #[test]
    fn test_total_is_raw_minus_discount() {
        let lines = vec![
            SaleLine::new("a", 7, 333),
            SaleLine::new("b", 1, 1),
            SaleLine::new("c", 13, 77),
        ];
        for pct in [0u8, 1, 7, 33, 50, 99, 100] {
            let totals = price_sale(&lines, Some(&coupon(pct))).unwrap();
            assert_eq!(totals.total + totals.discount, totals.raw_total);
            assert!(!totals.total.is_negative());
        }
    }

    #[test]
    fn test_overflow_is_rejected() {
        let lines = vec![SaleLine::new("a", 2, i64::MAX)];
        let err = price_sale(&lines, None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        let lines = vec![SaleLine::new("a", 1, i64::MAX), SaleLine::new("b", 1, 1)];
        assert!(raw_total(&lines).is_err());
    }
}
