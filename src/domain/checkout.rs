//! Checkout attempts and the gateway session that carries them.
//!
//! The cart is not stored locally while the customer pays. It travels inside the
//! gateway session's opaque metadata and is read back when payment is confirmed.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coupon::Coupon;
use super::order::{CartLineRequest, OrderTotals, PricedLineItem};

/// Gateway ceiling on receipt length.
pub const MAX_RECEIPT_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub items: Vec<CartLineRequest>,
    pub address_id: Uuid,
    pub coupon_code: Option<String>,
    pub shipping_charges: Option<BigDecimal>,
}

/// A checkout priced by the shared pricing and coupon engines.
#[derive(Debug, Clone)]
pub struct Quote {
    pub items: Vec<PricedLineItem>,
    pub totals: OrderTotals,
    pub coupon: Option<Coupon>,
}

/// Serialized into the gateway session metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub user_id: Uuid,
    pub items: Vec<CartLineRequest>,
    pub address_id: Uuid,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub shipping_charges: Option<BigDecimal>,
    pub amount: BigDecimal,
}

impl CheckoutMetadata {
    pub fn to_request(&self) -> CheckoutRequest {
        CheckoutRequest {
            items: self.items.clone(),
            address_id: self.address_id,
            coupon_code: self.coupon_code.clone(),
            shipping_charges: self.shipping_charges.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySession {
    pub session_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct FetchedSession {
    pub session_id: String,
    pub amount_minor: i64,
    /// `None` when the session carries no decodable checkout metadata.
    pub metadata: Option<CheckoutMetadata>,
}

/// What the client needs to open the gateway's payment widget.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub public_key: String,
}

/// Deterministic receipt for a checkout attempt, cut to the gateway ceiling.
pub fn receipt_for(user_id: Uuid, issued_at: DateTime<Utc>) -> String {
    let receipt = format!(
        "rcpt_{}_{}",
        issued_at.timestamp_millis(),
        user_id.simple()
    );
    receipt.chars().take(MAX_RECEIPT_LEN).collect()
}
