use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::dto::{cart_lines, CartLineDto};
use super::identity::CallerId;
use crate::domain::checkout::CheckoutRequest;
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub items: Vec<CartLineDto>,
    pub address_id: Uuid,
    /// Total the client displayed; must match the server-side total.
    #[schema(value_type = String)]
    pub amount: BigDecimal,
    pub coupon_code: Option<String>,
    #[schema(value_type = Option<String>)]
    pub shipping_charges: Option<BigDecimal>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: String,
    pub public_key: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub session_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    pub order_id: Uuid,
    pub payment_id: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /payment/session
///
/// Prices the cart on the server and opens a gateway session for that total.
#[utoipa::path(
    post,
    path = "/payment/session",
    request_body = CreateSessionRequest,
    params(("X-User-Id" = Uuid, Header, description = "Authenticated caller")),
    responses(
        (status = 200, description = "Session opened", body = CreateSessionResponse),
        (status = 400, description = "Invalid cart, coupon or amount"),
        (status = 401, description = "Missing caller identity"),
        (status = 404, description = "Address, product or coupon not found"),
        (status = 502, description = "Payment gateway unavailable"),
    ),
    tag = "payment"
)]
pub async fn create_session(
    state: web::Data<AppState>,
    caller: CallerId,
    body: web::Json<CreateSessionRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let request = CheckoutRequest {
        items: cart_lines(body.items),
        address_id: body.address_id,
        coupon_code: body.coupon_code,
        shipping_charges: body.shipping_charges,
    };

    let session = state
        .checkout
        .create_session(caller.0, request, &body.amount)
        .await?;

    Ok(HttpResponse::Ok().json(CreateSessionResponse {
        session_id: session.session_id,
        amount: session.amount_minor,
        currency: session.currency,
        public_key: session.public_key,
    }))
}

/// POST /payment/verify
///
/// Client-side confirmation after checkout. Creates the order for the
/// session, or returns the one already created by an earlier confirmation.
#[utoipa::path(
    post,
    path = "/payment/verify",
    request_body = VerifyPaymentRequest,
    params(("X-User-Id" = Uuid, Header, description = "Authenticated caller")),
    responses(
        (status = 200, description = "Payment verified", body = VerifyPaymentResponse),
        (status = 400, description = "Invalid signature or cart no longer valid"),
        (status = 401, description = "Session belongs to another caller"),
        (status = 502, description = "Payment gateway unavailable"),
    ),
    tag = "payment"
)]
pub async fn verify_payment(
    state: web::Data<AppState>,
    caller: CallerId,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let order = state
        .checkout
        .verify_payment(caller.0, &body.session_id, &body.payment_id, &body.signature)
        .await?;

    Ok(HttpResponse::Ok().json(VerifyPaymentResponse {
        verified: true,
        order_id: order.id,
        payment_id: body.payment_id,
    }))
}
