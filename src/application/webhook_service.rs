use std::sync::Arc;

use log::{info, warn};

use super::blocking;
use crate::domain::errors::DomainError;
use crate::domain::events::GatewayEvent;
use crate::domain::money::to_minor_units;
use crate::domain::order::PaymentStatus;
use crate::domain::ports::{OrderRepository, PaymentGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// At least one row matched the event.
    Applied,
    /// Authentic but nothing to do: unknown event, malformed payload, no
    /// matching rows yet, or an amount that does not reconcile.
    Ignored,
}

/// Applies gateway notifications. Every update assigns a status rather than
/// counting, so at-least-once delivery and replays are harmless.
pub struct WebhookService {
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl WebhookService {
    pub fn new(orders: Arc<dyn OrderRepository>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { orders, gateway }
    }

    pub async fn handle(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, DomainError> {
        let verified = signature
            .ok_or(DomainError::Signature)
            .and_then(|sig| self.gateway.verify_webhook_signature(raw_body, sig));
        if verified.is_err() {
            warn!("Rejected gateway webhook with a missing or invalid signature");
            return Err(DomainError::Signature);
        }

        let event = match GatewayEvent::parse(raw_body) {
            Ok(event) => event,
            Err(e) => {
                warn!("Ignoring gateway webhook: {}", e);
                return Ok(WebhookOutcome::Ignored);
            }
        };

        match event {
            GatewayEvent::PaymentCaptured {
                payment_id,
                session_id,
                amount_minor,
            } => {
                self.on_payment_captured(payment_id, session_id, amount_minor)
                    .await
            }
            GatewayEvent::PaymentFailed { payment_id } => self.on_payment_failed(payment_id).await,
            GatewayEvent::OrderPaid {
                session_id,
                amount_minor,
            } => self.on_order_paid(session_id, amount_minor).await,
            GatewayEvent::Unknown { event } => {
                info!("Ignoring unhandled gateway event {}", event);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn on_payment_captured(
        &self,
        payment_id: String,
        session_id: Option<String>,
        amount_minor: Option<i64>,
    ) -> Result<WebhookOutcome, DomainError> {
        if let Some(session_id) = &session_id {
            if !self.amount_reconciles(session_id, amount_minor).await? {
                return Ok(WebhookOutcome::Ignored);
            }
        }

        let orders = Arc::clone(&self.orders);
        let pid = payment_id.clone();
        let payments_changed = blocking(move || {
            orders.set_payment_status_by_gateway_payment(&pid, PaymentStatus::Success)
        })
        .await?;

        let orders_changed = match session_id {
            Some(session_id) => self.mark_order_paid(session_id).await?,
            None => 0,
        };

        if payments_changed == 0 && orders_changed == 0 {
            warn!(
                "payment.captured for {} matched no payment or order yet",
                payment_id
            );
            return Ok(WebhookOutcome::Ignored);
        }
        Ok(WebhookOutcome::Applied)
    }

    async fn on_payment_failed(&self, payment_id: String) -> Result<WebhookOutcome, DomainError> {
        let orders = Arc::clone(&self.orders);
        let pid = payment_id.clone();
        let changed = blocking(move || {
            orders.set_payment_status_by_gateway_payment(&pid, PaymentStatus::Failed)
        })
        .await?;

        if changed == 0 {
            warn!("payment.failed for {} matched no updatable payment", payment_id);
            return Ok(WebhookOutcome::Ignored);
        }
        Ok(WebhookOutcome::Applied)
    }

    async fn on_order_paid(
        &self,
        session_id: String,
        amount_minor: Option<i64>,
    ) -> Result<WebhookOutcome, DomainError> {
        if !self.amount_reconciles(&session_id, amount_minor).await? {
            return Ok(WebhookOutcome::Ignored);
        }
        let changed = self.mark_order_paid(session_id.clone()).await?;
        if changed == 0 {
            warn!("order.paid for session {} matched no order yet", session_id);
            return Ok(WebhookOutcome::Ignored);
        }
        Ok(WebhookOutcome::Applied)
    }

    async fn mark_order_paid(&self, session_id: String) -> Result<usize, DomainError> {
        let orders = Arc::clone(&self.orders);
        blocking(move || {
            orders.set_order_payment_status_by_session(&session_id, PaymentStatus::Success)
        })
        .await
    }

    /// A notification without an amount, or with one that differs from the
    /// local order total, is not trusted. With no local order yet there is
    /// nothing to compare against.
    async fn amount_reconciles(
        &self,
        session_id: &str,
        amount_minor: Option<i64>,
    ) -> Result<bool, DomainError> {
        let Some(amount_minor) = amount_minor else {
            warn!("Gateway notification for session {} carries no amount", session_id);
            return Ok(false);
        };

        let orders = Arc::clone(&self.orders);
        let sid = session_id.to_string();
        let Some(order) = blocking(move || orders.find_by_session(&sid)).await? else {
            return Ok(true);
        };

        let expected = to_minor_units(&order.total)?;
        if expected != amount_minor {
            warn!(
                "Gateway amount {} for session {} does not match order {} total {}",
                amount_minor, session_id, order.id, expected
            );
            return Ok(false);
        }
        Ok(true)
    }
}
