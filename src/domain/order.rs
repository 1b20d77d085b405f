use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Signed};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coupon::Coupon;
use super::errors::DomainError;
use super::money::{round_money, zero};

// ── Enumerations ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingReview,
    Accepted,
    Rejected,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::PendingReview,
        OrderStatus::Accepted,
        OrderStatus::Rejected,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::PendingReview => "PENDING_REVIEW",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("Unknown order status '{}'", s)))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    /// Statuses a gateway notification may overwrite when moving to `self`.
    /// A capture never resurrects a refund and a failure never undoes a capture;
    /// re-applying the current status is always allowed so replays are no-ops.
    pub fn overwritable_from(self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Success => &[
                PaymentStatus::Pending,
                PaymentStatus::Failed,
                PaymentStatus::Success,
            ],
            PaymentStatus::Failed => &[PaymentStatus::Pending, PaymentStatus::Failed],
            PaymentStatus::Refunded => &[PaymentStatus::Success, PaymentStatus::Refunded],
            PaymentStatus::Pending => &[PaymentStatus::Pending],
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::validation(format!(
                "Unknown payment status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Online,
    Offline,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Online => "ONLINE",
            PaymentMethod::Offline => "OFFLINE",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONLINE" => Ok(PaymentMethod::Online),
            "OFFLINE" => Ok(PaymentMethod::Offline),
            other => Err(DomainError::validation(format!(
                "Unknown payment method '{}'",
                other
            ))),
        }
    }
}

// ── Cart and pricing ─────────────────────────────────────────────────────────

/// A line of the caller's cart for one checkout attempt. Also embedded in the
/// gateway session metadata, hence the stable camelCase wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    #[serde(default)]
    pub customization_text: Option<String>,
    #[serde(default)]
    pub customization_asset_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLineItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
    pub customization_text: Option<String>,
    pub customization_asset_refs: Vec<String>,
}

/// Reconciled order money. Only ever built through [`OrderTotals::compute`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    pub subtotal: BigDecimal,
    pub discount_amount: Option<BigDecimal>,
    pub shipping_charges: Option<BigDecimal>,
    pub total: BigDecimal,
}

impl OrderTotals {
    /// `total = subtotal - discount + shipping`, every term at minor-unit precision.
    pub fn compute(
        subtotal: &BigDecimal,
        discount_amount: Option<&BigDecimal>,
        shipping_charges: Option<&BigDecimal>,
    ) -> Result<Self, DomainError> {
        let subtotal = round_money(subtotal);
        if subtotal.is_negative() {
            return Err(DomainError::validation("Subtotal cannot be negative"));
        }

        let discount_amount = discount_amount.map(round_money);
        if let Some(discount) = &discount_amount {
            if discount.is_negative() {
                return Err(DomainError::validation("Discount cannot be negative"));
            }
            if discount > &subtotal {
                return Err(DomainError::validation("Discount cannot exceed the subtotal"));
            }
        }

        let shipping_charges = shipping_charges.map(round_money);
        if let Some(shipping) = &shipping_charges {
            if shipping.is_negative() {
                return Err(DomainError::validation("Shipping charges cannot be negative"));
            }
        }

        let total = &subtotal - discount_amount.clone().unwrap_or_else(zero)
            + shipping_charges.clone().unwrap_or_else(zero);

        Ok(Self {
            subtotal,
            discount_amount,
            shipping_charges,
            total: round_money(&total),
        })
    }
}

// ── Persisted entities ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_id: Uuid,
    pub subtotal: BigDecimal,
    pub discount_amount: Option<BigDecimal>,
    pub shipping_charges: Option<BigDecimal>,
    pub total: BigDecimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub gateway_session_id: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub line_total: BigDecimal,
    pub customization_text: Option<String>,
    pub customization_asset_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub history: Vec<StatusHistoryEntry>,
    pub payments: Vec<Payment>,
}

impl OrderDetails {
    /// The most recent successful payment, if any.
    pub fn effective_payment(&self) -> Option<&Payment> {
        self.payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Success)
            .max_by_key(|p| p.created_at)
    }
}

// ── Write-side commands ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub gateway_payment_id: Option<String>,
    pub status: PaymentStatus,
}

/// Everything needed to make an order real in one unit of work.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: Uuid,
    pub address_id: Uuid,
    pub items: Vec<PricedLineItem>,
    pub totals: OrderTotals,
    pub payment_method: PaymentMethod,
    pub gateway_session_id: Option<String>,
    /// Coupon to redeem; usage limits are re-checked inside the write transaction.
    pub coupon: Option<Coupon>,
    pub payment: PaymentDraft,
}

#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub session_id: String,
    pub user_id: Uuid,
    pub gateway_payment_id: String,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
    pub order_id: Uuid,
    pub target: OrderStatus,
    pub comment: String,
    /// Only honoured when `target` is `Cancelled`.
    pub refund: bool,
}

#[derive(Debug, Clone)]
pub struct StatusChangeOutcome {
    pub order: Order,
    pub refunded: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OrderUpdate {
    pub address_id: Option<Uuid>,
    pub shipping_charges: Option<BigDecimal>,
    pub discount_amount: Option<BigDecimal>,
    pub items: Option<Vec<PricedLineItem>>,
}

#[derive(Debug, Clone)]
pub struct UpdatedOrder {
    pub order: Order,
    /// Items that were replaced when the update carried a new item list.
    pub replaced_items: Vec<OrderItem>,
}
