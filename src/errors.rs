use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("invalid signature")]
    Signature,

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("payment gateway unavailable")]
    Gateway,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(msg) => AppError::BadRequest(msg),
            DomainError::Signature => AppError::Signature,
            DomainError::Unauthorized => AppError::Unauthorized,
            e @ DomainError::NotFound(_) => AppError::NotFound(e.to_string()),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Gateway(msg) => {
                log::error!("Payment gateway failure: {}", msg);
                AppError::Gateway
            }
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Signature => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gateway => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Internal(detail) => {
                log::error!("Request failed: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::ResponseError;

    async fn body_of(err: AppError) -> serde_json::Value {
        let bytes = to_bytes(err.error_response().into_body())
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[test]
    fn validation_returns_400() {
        let err: AppError = DomainError::validation("Coupon is not active").into();
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn validation_keeps_its_message() {
        let err: AppError = DomainError::validation("Coupon usage limit reached").into();
        assert_eq!(
            body_of(err).await["error"],
            "Coupon usage limit reached"
        );
    }

    #[actix_web::test]
    async fn signature_failure_is_a_generic_400() {
        let err: AppError = DomainError::Signature.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body_of(err).await["error"], "invalid signature");
    }

    #[test]
    fn not_found_returns_404() {
        let err: AppError = DomainError::not_found("Order").into();
        assert_eq!(err.error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Order not found");
    }

    #[test]
    fn unauthorized_returns_401() {
        let err: AppError = DomainError::Unauthorized.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn gateway_failure_returns_502_without_detail() {
        let err: AppError = DomainError::Gateway("connect timeout to 10.0.0.3".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_of(err).await["error"], "payment gateway unavailable");
    }

    #[actix_web::test]
    async fn internal_error_hides_detail() {
        let err = AppError::Internal("relation \"orders\" does not exist".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(err).await["error"], "Internal server error");
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }

    #[test]
    fn conflict_returns_409() {
        let err: AppError = DomainError::Conflict("duplicate key".into()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
