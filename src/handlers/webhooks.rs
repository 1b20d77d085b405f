use actix_web::{web, HttpRequest, HttpResponse};
use log::error;
use serde_json::json;

use crate::domain::errors::DomainError;
use crate::errors::AppError;
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "X-Signature";

/// POST /webhooks/payment-gateway
///
/// The signature covers the raw body, so the payload is read as bytes and
/// only parsed after it has been authenticated. Once authenticated the event
/// is always acknowledged; processing failures are logged, not returned.
#[utoipa::path(
    post,
    path = "/webhooks/payment-gateway",
    request_body(content = String, content_type = "application/json", description = "Signed gateway event"),
    params(("X-Signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body")),
    responses(
        (status = 200, description = "Event received"),
        (status = 400, description = "Missing or invalid signature"),
    ),
    tag = "webhooks"
)]
pub async fn payment_gateway(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.webhooks.handle(&body, signature).await {
        Ok(_) => {}
        Err(DomainError::Signature) => return Err(AppError::Signature),
        Err(e) => error!("Failed to apply gateway webhook: {}", e),
    }

    Ok(HttpResponse::Ok().json(json!({ "received": true })))
}
