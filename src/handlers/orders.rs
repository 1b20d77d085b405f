use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::dto::{cart_lines, CartLineDto, OrderDetailsDto, OrderDto};
use super::identity::CallerId;
use crate::domain::checkout::CheckoutRequest;
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<CartLineDto>,
    pub address_id: Uuid,
    pub coupon_code: Option<String>,
    #[schema(value_type = Option<String>)]
    pub shipping_charges: Option<BigDecimal>,
}

/// POST /orders
///
/// Places an order that is paid outside the gateway. The order exists right
/// away with a PENDING payment.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    params(("X-User-Id" = Uuid, Header, description = "Authenticated caller")),
    responses(
        (status = 201, description = "Order placed", body = OrderDto),
        (status = 400, description = "Invalid cart or coupon"),
        (status = 401, description = "Missing caller identity"),
        (status = 404, description = "Address, product or coupon not found"),
    ),
    tag = "orders"
)]
pub async fn place_order(
    state: web::Data<AppState>,
    caller: CallerId,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let request = CheckoutRequest {
        items: cart_lines(body.items),
        address_id: body.address_id,
        coupon_code: body.coupon_code,
        shipping_charges: body.shipping_charges,
    };

    let order = state.checkout.place_offline_order(caller.0, request).await?;

    Ok(HttpResponse::Created().json(OrderDto::from(order)))
}

/// GET /orders/{id}
///
/// Returns the order together with its items, status history and payments.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-User-Id" = Uuid, Header, description = "Authenticated caller"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderDetailsDto),
        (status = 401, description = "Missing caller identity"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    caller: CallerId,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let details = state
        .orders
        .get_order_for_user(caller.0, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(OrderDetailsDto::from(details)))
}
