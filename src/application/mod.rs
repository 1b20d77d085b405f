pub mod checkout_service;
pub mod order_service;
pub mod webhook_service;

pub use checkout_service::CheckoutService;
pub use order_service::OrderService;
pub use webhook_service::{WebhookOutcome, WebhookService};

use crate::domain::errors::DomainError;

/// Run synchronous store work on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(e.to_string()))?
}
