//! Order-level aggregation of priced lines.

use super::pricing::{apply_discount, PricedLine};
use crate::error::OrderError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub total_units: i32,
    pub total_cartons: i32,
    pub subtotal: Decimal,
    pub closing_discount_percent: Decimal,
    pub final_total: Decimal,
}

impl OrderTotals {
    /// Sum priced lines and apply the closing discount once on the subtotal.
    ///
    /// Line discounts are already part of each `line_amount`. An empty slice
    /// yields zero totals. Sums that leave the `i32` or decimal range reject
    /// the draft.
    pub fn aggregate(
        lines: &[PricedLine],
        closing_discount_percent: Decimal,
    ) -> Result<Self, OrderError> {
        let (total_units, total_cartons, subtotal) = lines
            .iter()
            .try_fold((0i32, 0i32, Decimal::ZERO), |(units, cartons, amount), line| {
                Some((
                    units.checked_add(line.total_units)?,
                    cartons.checked_add(line.cartons)?,
                    amount.checked_add(line.line_amount)?,
                ))
            })
            .ok_or_else(overflow)?;

        let final_total = apply_discount(subtotal, closing_discount_percent).ok_or_else(overflow)?;

        Ok(Self {
            total_units,
            total_cartons,
            subtotal,
            closing_discount_percent,
            final_total,
        })
    }
}

fn overflow() -> OrderError {
    OrderError::InvalidDraft("order totals overflow".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn line(cartons: i32, loose: i32, amount: Decimal) -> PricedLine {
        PricedLine {
            product_id: Uuid::new_v4(),
            product_code: "P".to_string(),
            product_name: "Product".to_string(),
            cartons,
            loose_units: loose,
            total_units: cartons * 6 + loose,
            unit_price: Decimal::ONE,
            discount_percent: Decimal::ZERO,
            final_unit_price: Decimal::ONE,
            line_amount: amount,
        }
    }

    #[test]
    fn test_applies_closing_discount_once() {
        let lines = vec![
            line(2, 0, Decimal::new(12000, 2)),
            line(1, 4, Decimal::new(18000, 2)),
        ];
        let totals = OrderTotals::aggregate(&lines, Decimal::new(5, 0)).unwrap();

        assert_eq!(totals.total_units, 22);
        assert_eq!(totals.total_cartons, 3);
        assert_eq!(totals.subtotal, Decimal::new(30000, 2));
        assert_eq!(totals.final_total, Decimal::new(28500, 2));
    }

    #[test]
    fn test_zero_discount_keeps_subtotal() {
        let lines = vec![line(1, 1, Decimal::new(3333, 2))];
        let totals = OrderTotals::aggregate(&lines, Decimal::ZERO).unwrap();
        assert_eq!(totals.final_total, totals.subtotal);
        assert_eq!(totals.final_total.scale(), totals.subtotal.scale());
    }

    #[test]
    fn test_empty_lines_yield_zero_totals() {
        let totals = OrderTotals::aggregate(&[], Decimal::new(10, 0)).unwrap();
        assert_eq!(totals.total_units, 0);
        assert_eq!(totals.total_cartons, 0);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.final_total, Decimal::ZERO);
    }

    #[test]
    fn test_full_discount_is_never_negative() {
        let lines = vec![line(1, 0, Decimal::new(999, 1))];
        let totals = OrderTotals::aggregate(&lines, Decimal::ONE_HUNDRED).unwrap();
        assert_eq!(totals.final_total, Decimal::ZERO);
    }

    #[test]
    fn test_unit_sum_overflow_is_rejected() {
        let lines = vec![line(i32::MAX / 6, 0, Decimal::ONE), line(i32::MAX / 6, 0, Decimal::ONE)];

        let result = OrderTotals::aggregate(&lines, Decimal::ZERO);

        assert!(matches!(result, Err(OrderError::InvalidDraft(_))));
    }

    #[test]
    fn test_subtotal_overflow_is_rejected() {
        let lines = vec![line(1, 0, Decimal::MAX), line(1, 0, Decimal::ONE)];

        let result = OrderTotals::aggregate(&lines, Decimal::ZERO);

        assert!(matches!(result, Err(OrderError::InvalidDraft(_))));
    }
}
