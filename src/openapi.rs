use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Order Settlement API",
        version = "0.1.0",
        description = "Checkout, payment confirmation and order lifecycle"
    ),
    paths(
        handlers::payment::create_session,
        handlers::payment::verify_payment,
        handlers::webhooks::payment_gateway,
        handlers::orders::place_order,
        handlers::orders::get_order,
        handlers::coupons::validate_coupon,
        handlers::admin::change_status,
        handlers::admin::cancel_order,
        handlers::admin::update_order,
        handlers::health::health,
    ),
    components(schemas(
        handlers::dto::CartLineDto,
        handlers::dto::OrderDto,
        handlers::dto::OrderItemDto,
        handlers::dto::HistoryEntryDto,
        handlers::dto::PaymentDto,
        handlers::dto::OrderDetailsDto,
        handlers::payment::CreateSessionRequest,
        handlers::payment::CreateSessionResponse,
        handlers::payment::VerifyPaymentRequest,
        handlers::payment::VerifyPaymentResponse,
        handlers::orders::PlaceOrderRequest,
        handlers::coupons::ValidateCouponRequest,
        handlers::coupons::ValidateCouponResponse,
        handlers::admin::StatusChangeRequest,
        handlers::admin::CancelOrderRequest,
        handlers::admin::CancelOrderResponse,
        handlers::admin::UpdateOrderRequest,
    )),
    tags(
        (name = "payment", description = "Checkout sessions and payment confirmation"),
        (name = "webhooks", description = "Signed payment gateway notifications"),
        (name = "orders", description = "Customer order endpoints"),
        (name = "coupons", description = "Coupon previews"),
        (name = "admin", description = "Order management"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let json = ApiDoc::openapi().to_json().expect("serialize");
        for path in [
            "/payment/session",
            "/payment/verify",
            "/webhooks/payment-gateway",
            "/orders/{id}",
            "/coupons/validate",
            "/admin/orders/{id}/cancel",
            "/health",
        ] {
            assert!(json.contains(path), "missing {}", path);
        }
    }
}
