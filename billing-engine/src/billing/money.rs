//! Money handling using rust_decimal for precision
//!
//! Amounts enter as `Decimal`, are rounded half-up to 2 decimal places and
//! stored as integer minor units so that SQLite sums stay exact.

use rust_decimal::prelude::*;

use super::error::{BillingError, BillingResult};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed amount for a single month / admission fee (1,000,000)
pub const MAX_MONTHLY_AMOUNT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Round to 2dp, half away from zero
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate an amount and convert it to cents
pub fn to_cents(amount: Decimal, field: &str) -> BillingResult<i64> {
    let rounded = round_money(amount);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        return Err(BillingError::invalid_amount(format!(
            "{field} must be non-negative, got {amount}"
        )));
    }
    if rounded > MAX_MONTHLY_AMOUNT {
        return Err(BillingError::invalid_amount(format!(
            "{field} exceeds maximum allowed ({MAX_MONTHLY_AMOUNT}), got {amount}"
        )));
    }
    (rounded * Decimal::ONE_HUNDRED).trunc().to_i64().ok_or_else(|| {
        BillingError::invalid_amount(format!("{field} is not representable: {amount}"))
    })
}

/// Cents back to a 2dp `Decimal`
#[inline]
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, DECIMAL_PLACES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_rounds_half_up() {
        assert_eq!(to_cents(dec!(10.005), "fee").unwrap(), 1001);
        assert_eq!(to_cents(dec!(10.004), "fee").unwrap(), 1000);
        assert_eq!(to_cents(dec!(500), "fee").unwrap(), 50_000);
    }

    #[test]
    fn test_rejects_negative_and_oversized() {
        assert!(to_cents(dec!(-0.01), "fee").is_err());
        assert!(to_cents(dec!(1000000.01), "fee").is_err());
        assert_eq!(to_cents(dec!(1000000), "fee").unwrap(), 100_000_000);
        // rounds to zero, accepted
        assert_eq!(to_cents(dec!(-0.001), "fee").unwrap(), 0);
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(from_cents(50_000), dec!(500.00));
        assert_eq!(from_cents(1), dec!(0.01));
        assert_eq!(from_cents(0), Decimal::ZERO);
    }
}
