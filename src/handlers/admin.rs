use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::dto::{cart_lines, CartLineDto, OrderDto};
use super::identity::AdminCaller;
use crate::application::order_service::OrderEditRequest;
use crate::errors::AppError;
use crate::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChangeRequest {
    /// Target status, e.g. "ACCEPTED".
    pub status: String,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelOrderRequest {
    pub comment: Option<String>,
    #[serde(default)]
    pub refund: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelOrderResponse {
    pub order: OrderDto,
    /// Whether a successful payment was marked refunded.
    pub refunded: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub address_id: Option<Uuid>,
    #[schema(value_type = Option<String>)]
    pub shipping_charges: Option<BigDecimal>,
    #[schema(value_type = Option<String>)]
    pub discount_amount: Option<BigDecimal>,
    /// Replaces every line item when present.
    pub items: Option<Vec<CartLineDto>>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /admin/orders/{id}/status
#[utoipa::path(
    post,
    path = "/admin/orders/{id}/status",
    request_body = StatusChangeRequest,
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-Admin-Key" = String, Header, description = "Admin API key"),
    ),
    responses(
        (status = 200, description = "Status changed", body = OrderDto),
        (status = 400, description = "Unknown status or illegal transition"),
        (status = 401, description = "Missing or wrong admin key"),
        (status = 404, description = "Order not found"),
    ),
    tag = "admin"
)]
pub async fn change_status(
    state: web::Data<AppState>,
    _admin: AdminCaller,
    path: web::Path<Uuid>,
    body: web::Json<StatusChangeRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let order = state
        .orders
        .transition(path.into_inner(), &body.status, body.comment)
        .await?;

    Ok(HttpResponse::Ok().json(OrderDto::from(order)))
}

/// POST /admin/orders/{id}/cancel
#[utoipa::path(
    post,
    path = "/admin/orders/{id}/cancel",
    request_body = CancelOrderRequest,
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-Admin-Key" = String, Header, description = "Admin API key"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = CancelOrderResponse),
        (status = 400, description = "Order can no longer be cancelled"),
        (status = 401, description = "Missing or wrong admin key"),
        (status = 404, description = "Order not found"),
    ),
    tag = "admin"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    _admin: AdminCaller,
    path: web::Path<Uuid>,
    body: web::Json<CancelOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let outcome = state
        .orders
        .cancel(path.into_inner(), body.comment, body.refund)
        .await?;

    Ok(HttpResponse::Ok().json(CancelOrderResponse {
        order: outcome.order.into(),
        refunded: outcome.refunded,
    }))
}

/// PATCH /admin/orders/{id}
///
/// Edits address, charges or items of an order that has not shipped.
#[utoipa::path(
    patch,
    path = "/admin/orders/{id}",
    request_body = UpdateOrderRequest,
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("X-Admin-Key" = String, Header, description = "Admin API key"),
    ),
    responses(
        (status = 200, description = "Order updated", body = OrderDto),
        (status = 400, description = "Order is locked or the edit is invalid"),
        (status = 401, description = "Missing or wrong admin key"),
        (status = 404, description = "Order, address or product not found"),
    ),
    tag = "admin"
)]
pub async fn update_order(
    state: web::Data<AppState>,
    _admin: AdminCaller,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let edit = OrderEditRequest {
        address_id: body.address_id,
        shipping_charges: body.shipping_charges,
        discount_amount: body.discount_amount,
        items: body.items.map(cart_lines),
    };

    let order = state.orders.update_order(path.into_inner(), edit).await?;

    Ok(HttpResponse::Ok().json(OrderDto::from(order)))
}
