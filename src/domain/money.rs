//! Decimal money helpers. Amounts carry two fractional digits; the gateway
//! speaks integer minor units.

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};

use super::errors::DomainError;

pub const MONEY_SCALE: i64 = 2;

/// Round half-up to the currency's minor-unit precision.
pub fn round_money(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(MONEY_SCALE, RoundingMode::HalfUp)
}

pub fn zero() -> BigDecimal {
    BigDecimal::zero().with_scale(MONEY_SCALE)
}

pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, DomainError> {
    (amount * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .ok_or_else(|| DomainError::Internal(format!("amount {} out of range", amount)))
}

pub fn from_minor_units(minor: i64) -> BigDecimal {
    (BigDecimal::from(minor) / BigDecimal::from(100)).with_scale(MONEY_SCALE)
}
