use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::identity::CallerId;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub code: String,
    #[schema(value_type = String)]
    pub subtotal: BigDecimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponResponse {
    pub coupon_id: Uuid,
    #[schema(value_type = String)]
    pub discount_amount: BigDecimal,
}

/// POST /coupons/validate
///
/// Previews the discount a coupon would give. Nothing is redeemed.
#[utoipa::path(
    post,
    path = "/coupons/validate",
    request_body = ValidateCouponRequest,
    params(("X-User-Id" = Uuid, Header, description = "Authenticated caller")),
    responses(
        (status = 200, description = "Coupon applies", body = ValidateCouponResponse),
        (status = 400, description = "Coupon not applicable"),
        (status = 404, description = "Coupon not found"),
    ),
    tag = "coupons"
)]
pub async fn validate_coupon(
    state: web::Data<AppState>,
    caller: CallerId,
    body: web::Json<ValidateCouponRequest>,
) -> Result<HttpResponse, AppError> {
    let applied = state
        .checkout
        .preview_coupon(caller.0, &body.code, &body.subtotal)
        .await?;

    Ok(HttpResponse::Ok().json(ValidateCouponResponse {
        coupon_id: applied.coupon_id,
        discount_amount: applied.discount_amount,
    }))
}
