use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricingInput {
    pub base_price: Decimal,
    pub discount_percent: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub base_price: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
    pub discount_applied: bool,
}

pub trait PricingEngine: Send + Sync {
    fn price(&self, input: &PricingInput) -> Result<PricingResult, DomainError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn price(&self, input: &PricingInput) -> Result<PricingResult, DomainError> {
        compute_final_price(input.base_price, input.discount_percent)
    }
}

/// Applies a percentage discount to a list price.
///
/// Discounts outside `0..=100` and non-positive base prices are rejected
/// rather than clamped, so every caller sees the same validation error.
pub fn compute_final_price(
    base_price: Decimal,
    discount_percent: Decimal,
) -> Result<PricingResult, DomainError> {
    if base_price <= Decimal::ZERO {
        return Err(DomainError::Validation(format!(
            "base price must be positive, got {base_price}"
        )));
    }
    if discount_percent < Decimal::ZERO {
        return Err(DomainError::Validation(format!(
            "discount percent must not be negative, got {discount_percent}"
        )));
    }
    if discount_percent > ONE_HUNDRED {
        return Err(DomainError::Validation(format!(
            "discount percent must not exceed 100, got {discount_percent}"
        )));
    }

    if discount_percent.is_zero() {
        return Ok(PricingResult {
            base_price,
            discount_percent: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            final_price: base_price,
            discount_applied: false,
        });
    }

    let final_price = base_price * (Decimal::ONE - discount_percent / ONE_HUNDRED);
    Ok(PricingResult {
        base_price,
        discount_percent,
        discount_amount: base_price - final_price,
        final_price,
        discount_applied: true,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{compute_final_price, DeterministicPricingEngine, PricingEngine, PricingInput};
    use crate::errors::DomainError;

    #[test]
    fn zero_discount_keeps_base_price_exactly() {
        for base in [Decimal::new(1, 2), Decimal::from(15_000), Decimal::new(123_456_789, 3)] {
            let result = compute_final_price(base, Decimal::ZERO).expect("price");
            assert_eq!(result.final_price, base);
            assert!(!result.discount_applied);
            assert_eq!(result.discount_amount, Decimal::ZERO);
        }
    }

    #[test]
    fn positive_discount_reduces_price_proportionally() {
        let result = compute_final_price(Decimal::from(25_000), Decimal::from(10)).expect("price");
        assert_eq!(result.final_price, Decimal::from(22_500));
        assert_eq!(result.discount_amount, Decimal::from(2_500));
        assert!(result.discount_applied);

        let result =
            compute_final_price(Decimal::from(18_000), Decimal::new(125, 1)).expect("price");
        assert_eq!(result.final_price, Decimal::from(15_750));
    }

    #[test]
    fn full_discount_yields_zero_price() {
        let result = compute_final_price(Decimal::from(11_000), Decimal::from(100)).expect("price");
        assert_eq!(result.final_price, Decimal::ZERO);
        assert!(result.discount_applied);
    }

    #[test]
    fn out_of_range_discounts_are_rejected() {
        let negative = compute_final_price(Decimal::from(1_000), Decimal::from(-5));
        assert!(matches!(negative, Err(DomainError::Validation(_))));

        let excessive = compute_final_price(Decimal::from(1_000), Decimal::new(1001, 1));
        assert!(matches!(excessive, Err(DomainError::Validation(_))));
    }

    #[test]
    fn non_positive_base_price_is_rejected() {
        let result = compute_final_price(Decimal::ZERO, Decimal::ZERO);
        assert!(matches!(result, Err(DomainError::Validation(ref message)) if message.contains("base price")));
    }

    #[test]
    fn engine_delegates_to_pure_function() {
        let engine = DeterministicPricingEngine;
        let result = engine
            .price(&PricingInput {
                base_price: Decimal::from(40_000),
                discount_percent: Decimal::from(25),
            })
            .expect("price");
        assert_eq!(result.final_price, Decimal::from(30_000));
    }
}
