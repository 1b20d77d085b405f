//! Gateway webhook events.
//!
//! Payloads are loosely typed JSON. The envelope is decoded first, the event
//! name is matched exhaustively, and only then are the fields that event needs
//! pulled out. Anything missing yields an error the caller logs and ignores.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    PaymentCaptured {
        payment_id: String,
        session_id: Option<String>,
        amount_minor: Option<i64>,
    },
    PaymentFailed {
        payment_id: String,
    },
    OrderPaid {
        session_id: String,
        amount_minor: Option<i64>,
    },
    Unknown {
        event: String,
    },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Debug, Deserialize)]
struct PaymentEntity {
    id: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PaymentPayload {
    payment: Wrapped<PaymentEntity>,
}

#[derive(Debug, Deserialize)]
struct OrderEntity {
    id: String,
    #[serde(default)]
    amount_paid: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OrderPayload {
    order: Wrapped<OrderEntity>,
}

fn payload<T: DeserializeOwned>(event: &str, value: Value) -> Result<T, DomainError> {
    serde_json::from_value(value)
        .map_err(|e| DomainError::validation(format!("malformed {} payload: {}", event, e)))
}

impl GatewayEvent {
    pub fn parse(raw_body: &[u8]) -> Result<Self, DomainError> {
        let envelope: Envelope = serde_json::from_slice(raw_body)
            .map_err(|e| DomainError::validation(format!("malformed webhook envelope: {}", e)))?;

        match envelope.event.as_str() {
            "payment.captured" => {
                let p: PaymentPayload = payload(&envelope.event, envelope.payload)?;
                Ok(GatewayEvent::PaymentCaptured {
                    payment_id: p.payment.entity.id,
                    session_id: p.payment.entity.order_id,
                    amount_minor: p.payment.entity.amount,
                })
            }
            "payment.failed" => {
                let p: PaymentPayload = payload(&envelope.event, envelope.payload)?;
                Ok(GatewayEvent::PaymentFailed {
                    payment_id: p.payment.entity.id,
                })
            }
            "order.paid" => {
                let p: OrderPayload = payload(&envelope.event, envelope.payload)?;
                Ok(GatewayEvent::OrderPaid {
                    session_id: p.order.entity.id,
                    amount_minor: p.order.entity.amount_paid,
                })
            }
            _ => Ok(GatewayEvent::Unknown {
                event: envelope.event,
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            GatewayEvent::PaymentCaptured { .. } => "payment.captured",
            GatewayEvent::PaymentFailed { .. } => "payment.failed",
            GatewayEvent::OrderPaid { .. } => "order.paid",
            GatewayEvent::Unknown { event } => event,
        }
    }
}
