//! HMAC-SHA256 authentication of gateway callbacks.
//!
//! Signatures are lowercase or uppercase hex. Comparison goes through
//! `Mac::verify_slice`, which does not short-circuit on the first differing byte.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::errors::DomainError;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &[u8], message: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length, so this constructor cannot fail.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 takes keys of any size"));
    mac.update(message);
    mac
}

fn verify(secret: &[u8], message: &[u8], signature: &str) -> Result<(), DomainError> {
    let expected = hex::decode(signature.trim()).map_err(|_| DomainError::Signature)?;
    mac_for(secret, message)
        .verify_slice(&expected)
        .map_err(|_| DomainError::Signature)
}

pub fn sign(secret: &str, message: &[u8]) -> String {
    hex::encode(mac_for(secret.as_bytes(), message).finalize().into_bytes())
}

/// Message the gateway signs for a completed checkout: `session_id|payment_id`.
pub fn payment_message(session_id: &str, payment_id: &str) -> String {
    format!("{}|{}", session_id, payment_id)
}

pub fn sign_payment(secret: &str, session_id: &str, payment_id: &str) -> String {
    sign(secret, payment_message(session_id, payment_id).as_bytes())
}

pub fn verify_payment_signature(
    secret: &str,
    session_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<(), DomainError> {
    verify(
        secret.as_bytes(),
        payment_message(session_id, payment_id).as_bytes(),
        signature,
    )
}

pub fn verify_webhook_signature(
    secret: &str,
    raw_body: &[u8],
    signature: &str,
) -> Result<(), DomainError> {
    verify(secret.as_bytes(), raw_body, signature)
}

/// Equality for shared secrets that does not leak the mismatch position.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
