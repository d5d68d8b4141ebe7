//! Cart line pricing.

use crate::error::OrderError;
use crate::models::{CartEntry, Product, CARTON_SIZE};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A cart entry with quantities resolved and prices computed. Amounts are not rounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub product_code: String,
    pub product_name: String,
    pub cartons: i32,
    pub loose_units: i32,
    pub total_units: i32,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub final_unit_price: Decimal,
    pub line_amount: Decimal,
}

/// Turns cart entries into priced lines.
pub struct CartLineCalculator;

impl CartLineCalculator {
    /// Price one entry against its product.
    ///
    /// The unit price defaults to the product list price. The carton factor is
    /// always [`CARTON_SIZE`], whatever the product row stores.
    pub fn price(product: &Product, entry: &CartEntry) -> Result<PricedLine, OrderError> {
        let unit_price = entry.unit_price.unwrap_or(product.list_price);
        Self::price_parts(
            product,
            entry.cartons,
            entry.loose_units,
            unit_price,
            entry.discount_percent,
        )
    }

    pub fn price_parts(
        product: &Product,
        cartons: i32,
        loose_units: i32,
        unit_price: Decimal,
        discount_percent: Decimal,
    ) -> Result<PricedLine, OrderError> {
        let product_id = product.product_id;

        if cartons < 0 || loose_units < 0 {
            return Err(OrderError::invalid_line(product_id, "negative quantity"));
        }
        if cartons == 0 && loose_units == 0 {
            return Err(OrderError::invalid_line(
                product_id,
                "cartons and loose units are both zero",
            ));
        }
        if unit_price < Decimal::ZERO {
            return Err(OrderError::invalid_line(product_id, "negative unit price"));
        }
        if discount_percent < Decimal::ZERO || discount_percent > Decimal::ONE_HUNDRED {
            return Err(OrderError::invalid_line(
                product_id,
                format!("discount {} outside 0-100", discount_percent),
            ));
        }

        let total_units = cartons
            .checked_mul(CARTON_SIZE)
            .and_then(|units| units.checked_add(loose_units))
            .ok_or_else(|| OrderError::invalid_line(product_id, "quantity overflow"))?;

        let final_unit_price = apply_discount(unit_price, discount_percent)
            .ok_or_else(|| OrderError::invalid_line(product_id, "price overflow"))?;
        let line_amount = Decimal::from(total_units)
            .checked_mul(final_unit_price)
            .ok_or_else(|| OrderError::invalid_line(product_id, "amount overflow"))?;

        Ok(PricedLine {
            product_id,
            product_code: product.code.clone(),
            product_name: product.name.clone(),
            cartons,
            loose_units,
            total_units,
            unit_price,
            discount_percent,
            final_unit_price,
            line_amount,
        })
    }
}

/// `amount * (1 - percent/100)`, or `None` when the result leaves the
/// decimal range. A zero percent returns `amount` untouched.
pub fn apply_discount(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    if percent.is_zero() {
        return Some(amount);
    }
    let factor = Decimal::ONE.checked_sub(percent.checked_div(Decimal::ONE_HUNDRED)?)?;
    amount.checked_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(carton_size: i32) -> Product {
        Product {
            product_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            code: "VIN-001".to_string(),
            name: "Rosso Toscano".to_string(),
            unit_of_measure: "PZ".to_string(),
            list_price: Decimal::new(1250, 2),
            carton_size,
            available: true,
            created_utc: Utc::now(),
            updated_utc: Utc::now(),
        }
    }

    fn entry(product: &Product, cartons: i32, loose: i32) -> CartEntry {
        CartEntry {
            product_id: product.product_id,
            cartons,
            loose_units: loose,
            unit_price: Some(Decimal::new(1000, 2)),
            discount_percent: Decimal::new(10, 0),
        }
    }

    #[test]
    fn test_prices_cartons_and_loose_units() {
        let p = product(6);
        let line = CartLineCalculator::price(&p, &entry(&p, 2, 3)).unwrap();

        assert_eq!(line.total_units, 15);
        assert_eq!(line.final_unit_price, Decimal::new(900, 2));
        assert_eq!(line.line_amount, Decimal::new(13500, 2));
        assert_eq!(line.product_code, "VIN-001");
    }

    #[test]
    fn test_ignores_stored_carton_size() {
        let p = product(12);
        let line = CartLineCalculator::price(&p, &entry(&p, 3, 1)).unwrap();
        assert_eq!(line.total_units, 19);
    }

    #[test]
    fn test_defaults_to_list_price() {
        let p = product(6);
        let e = CartEntry {
            unit_price: None,
            discount_percent: Decimal::ZERO,
            ..entry(&p, 0, 4)
        };
        let line = CartLineCalculator::price(&p, &e).unwrap();
        assert_eq!(line.unit_price, Decimal::new(1250, 2));
        assert_eq!(line.line_amount, Decimal::new(5000, 2));
    }

    #[test]
    fn test_rejects_zero_quantities() {
        let p = product(6);
        let result = CartLineCalculator::price(&p, &entry(&p, 0, 0));
        assert!(matches!(result, Err(OrderError::InvalidLine { .. })));
    }

    #[test]
    fn test_rejects_discount_out_of_range() {
        let p = product(6);
        let e = CartEntry {
            discount_percent: Decimal::new(101, 0),
            ..entry(&p, 1, 0)
        };
        assert!(matches!(
            CartLineCalculator::price(&p, &e),
            Err(OrderError::InvalidLine { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_values() {
        let p = product(6);
        assert!(CartLineCalculator::price(&p, &entry(&p, -1, 3)).is_err());
        let e = CartEntry {
            unit_price: Some(Decimal::new(-1, 0)),
            ..entry(&p, 1, 0)
        };
        assert!(CartLineCalculator::price(&p, &e).is_err());
    }

    #[test]
    fn test_amount_overflow_is_an_invalid_line() {
        let p = product(6);
        let e = CartEntry {
            unit_price: Some(Decimal::from_i128_with_scale(70_000_000_000_000_000_000_000_000, 0)),
            discount_percent: Decimal::ZERO,
            ..entry(&p, 1000, 0)
        };

        let result = CartLineCalculator::price(&p, &e);

        assert!(matches!(
            result,
            Err(OrderError::InvalidLine { reason, .. }) if reason == "amount overflow"
        ));
    }

    #[test]
    fn test_discount_overflow_is_none() {
        assert_eq!(apply_discount(Decimal::MAX, Decimal::ZERO), Some(Decimal::MAX));
        assert!(apply_discount(Decimal::MAX, Decimal::new(10, 0)).is_some());
        assert_eq!(apply_discount(Decimal::MAX, Decimal::new(-10, 0)), None);
    }

    #[test]
    fn test_amount_non_increasing_in_discount() {
        let p = product(6);
        let mut previous = None;
        for discount in [0, 5, 10, 33, 50, 99, 100] {
            let e = CartEntry {
                discount_percent: Decimal::new(discount, 0),
                ..entry(&p, 1, 1)
            };
            let amount = CartLineCalculator::price(&p, &e).unwrap().line_amount;
            if let Some(prev) = previous {
                assert!(amount <= prev, "discount {} raised the amount", discount);
            }
            previous = Some(amount);
        }
        assert_eq!(previous, Some(Decimal::ZERO));
    }

    #[test]
    fn test_units_formula_holds_across_quantities() {
        let p = product(24);
        for cartons in 0..5 {
            for loose in 0..7 {
                if cartons == 0 && loose == 0 {
                    continue;
                }
                let line = CartLineCalculator::price(&p, &entry(&p, cartons, loose)).unwrap();
                assert_eq!(line.total_units, cartons * 6 + loose);
                assert_eq!(
                    line.line_amount,
                    Decimal::from(line.total_units) * Decimal::new(900, 2)
                );
            }
        }
    }
}
