use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::checkout::{CheckoutMetadata, FetchedSession, GatewaySession, SessionRequest};
use crate::domain::errors::DomainError;
use crate::domain::ports::PaymentGateway;
use crate::domain::signature;

/// Notes key under which the serialized checkout travels with the session.
const CHECKOUT_NOTE: &str = "checkout";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub webhook_secret: String,
    pub currency: String,
    pub timeout: Duration,
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: CheckoutNotes,
}

#[derive(Debug, Serialize)]
struct CheckoutNotes {
    checkout: String,
}

#[derive(Debug, Deserialize)]
struct GatewayOrder {
    id: String,
    amount: i64,
    currency: String,
    /// An object when notes were set, an empty array otherwise.
    #[serde(default)]
    notes: Value,
}

impl GatewayOrder {
    fn checkout_metadata(&self) -> Option<CheckoutMetadata> {
        let raw = self.notes.get(CHECKOUT_NOTE)?.as_str()?;
        match serde_json::from_str(raw) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("Session {} carries undecodable checkout notes: {}", self.id, e);
                None
            }
        }
    }
}

fn transport(e: reqwest::Error) -> DomainError {
    DomainError::Gateway(e.to_string())
}

// ── Adapter ──────────────────────────────────────────────────────────────────

/// Orders-API style payment gateway reached over HTTPS with basic auth.
pub struct HttpPaymentGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(transport)?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    fn public_key(&self) -> &str {
        &self.config.key_id
    }

    fn currency(&self) -> &str {
        &self.config.currency
    }

    async fn create_session(&self, request: SessionRequest) -> Result<GatewaySession, DomainError> {
        let body = CreateOrderBody {
            amount: request.amount_minor,
            currency: &request.currency,
            receipt: &request.receipt,
            notes: CheckoutNotes {
                checkout: serde_json::to_string(&request.metadata)?,
            },
        };

        let response = self
            .client
            .post(self.url("orders"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            warn!("Gateway refused session creation with status {}", status);
            return Err(DomainError::Gateway(format!(
                "session creation failed with status {}",
                status
            )));
        }

        let order: GatewayOrder = response.json().await.map_err(transport)?;
        Ok(GatewaySession {
            session_id: order.id,
            amount_minor: order.amount,
            currency: order.currency,
        })
    }

    async fn fetch_session(&self, session_id: &str) -> Result<FetchedSession, DomainError> {
        let response = self
            .client
            .get(self.url(&format!("orders/{}", session_id)))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(DomainError::not_found("Payment session")),
            status if !status.is_success() => {
                warn!("Gateway lookup of session {} failed with status {}", session_id, status);
                return Err(DomainError::Gateway(format!(
                    "session lookup failed with status {}",
                    status
                )));
            }
            _ => {}
        }

        let order: GatewayOrder = response.json().await.map_err(transport)?;
        Ok(FetchedSession {
            metadata: order.checkout_metadata(),
            session_id: order.id,
            amount_minor: order.amount,
        })
    }

    fn verify_payment_signature(
        &self,
        session_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), DomainError> {
        signature::verify_payment_signature(
            &self.config.key_secret,
            session_id,
            payment_id,
            signature,
        )
    }

    fn verify_webhook_signature(&self, raw_body: &[u8], signature: &str) -> Result<(), DomainError> {
        signature::verify_webhook_signature(&self.config.webhook_secret, raw_body, signature)
    }
}
