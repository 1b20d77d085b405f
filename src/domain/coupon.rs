//! Coupon eligibility rules and discount computation.
//!
//! Evaluation is side-effect free so a discount can be previewed any number of
//! times. Redemption is a separate write performed when the order becomes real.

use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Signed};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::money::{round_money, zero};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscountType::Percentage => "PERCENTAGE",
            DiscountType::Fixed => "FIXED",
        }
    }
}

impl FromStr for DiscountType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PERCENTAGE" => Ok(DiscountType::Percentage),
            "FIXED" => Ok(DiscountType::Fixed),
            other => Err(DomainError::validation(format!(
                "Unknown discount type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: BigDecimal,
    pub min_purchase_amount: Option<BigDecimal>,
    pub max_discount_amount: Option<BigDecimal>,
    /// Global cap; `None` means unlimited.
    pub usage_limit: Option<i32>,
    pub usage_limit_per_user: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
}

/// Redemption counts derived from `coupon_usages` rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CouponUsageCounts {
    pub total: i64,
    pub by_user: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub discount_amount: BigDecimal,
}

/// Codes compare case-insensitively; the stored form is upper case.
pub fn canonical_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Coupon {
    /// Activity, validity window and minimum purchase, in that order.
    pub fn check_eligibility(
        &self,
        subtotal: &BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.is_active {
            return Err(DomainError::validation("Coupon is not active"));
        }
        if now < self.valid_from || now > self.valid_until {
            return Err(DomainError::validation("Coupon is expired or not yet valid"));
        }
        if let Some(min) = &self.min_purchase_amount {
            if subtotal < min {
                return Err(DomainError::validation(format!(
                    "Coupon requires a minimum purchase of {}",
                    round_money(min)
                )));
            }
        }
        Ok(())
    }

    /// Global cap first, then the per-user cap.
    pub fn check_usage(&self, counts: &CouponUsageCounts) -> Result<(), DomainError> {
        if let Some(limit) = self.usage_limit {
            if counts.total >= i64::from(limit) {
                return Err(DomainError::validation("Coupon usage limit reached"));
            }
        }
        if counts.by_user >= i64::from(self.usage_limit_per_user) {
            return Err(DomainError::validation("Coupon already used"));
        }
        Ok(())
    }

    /// Discount clamped to `max_discount_amount` and then to the subtotal.
    pub fn discount_for(&self, subtotal: &BigDecimal) -> BigDecimal {
        let raw = match self.discount_type {
            DiscountType::Percentage => subtotal * &self.discount_value / BigDecimal::from(100),
            DiscountType::Fixed => self.discount_value.clone(),
        };

        let mut discount = round_money(&raw);
        if let Some(cap) = &self.max_discount_amount {
            if &discount > cap {
                discount = round_money(cap);
            }
        }
        if &discount > subtotal {
            discount = round_money(subtotal);
        }
        if discount.is_negative() {
            discount = zero();
        }
        discount
    }

    /// Full rule chain for a coupon that was found by code.
    pub fn evaluate(
        &self,
        subtotal: &BigDecimal,
        counts: &CouponUsageCounts,
        now: DateTime<Utc>,
    ) -> Result<AppliedCoupon, DomainError> {
        self.check_eligibility(subtotal, now)?;
        self.check_usage(counts)?;
        Ok(AppliedCoupon {
            coupon_id: self.id,
            discount_amount: self.discount_for(subtotal),
        })
    }
}
