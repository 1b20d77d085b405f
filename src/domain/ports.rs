use async_trait::async_trait;
use uuid::Uuid;

use super::catalog::{Address, Product};
use super::checkout::{FetchedSession, GatewaySession, SessionRequest};
use super::coupon::{Coupon, CouponUsageCounts};
use super::errors::DomainError;
use super::order::{
    Order, OrderDetails, OrderDraft, OrderUpdate, PaymentConfirmation, PaymentStatus,
    StatusChange, StatusChangeOutcome, UpdatedOrder,
};

pub trait CatalogReader: Send + Sync + 'static {
    /// One round trip regardless of how many ids are requested.
    fn find_products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError>;
}

pub trait AddressStore: Send + Sync + 'static {
    fn find_address(&self, id: Uuid, user_id: Uuid) -> Result<Option<Address>, DomainError>;
}

pub trait CouponRepository: Send + Sync + 'static {
    /// Looks up by canonical (upper-case) code.
    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError>;
    fn usage_counts(&self, coupon_id: Uuid, user_id: Uuid)
        -> Result<CouponUsageCounts, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Creates the order, its items, first history row, first payment and the
    /// coupon redemption as one unit. When the draft carries a gateway session
    /// that already produced an order, the payment is confirmed on that order
    /// instead and it is returned unchanged otherwise.
    fn materialize(&self, draft: OrderDraft) -> Result<Order, DomainError>;

    /// Upserts the session's payment as SUCCESS and marks the order paid.
    /// `Ok(None)` when no order exists yet for `(session_id, user_id)`.
    fn confirm_payment(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<Option<Order>, DomainError>;

    fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, DomainError>;
    fn find_details(&self, order_id: Uuid) -> Result<Option<OrderDetails>, DomainError>;

    fn apply_status_change(&self, change: StatusChange)
        -> Result<StatusChangeOutcome, DomainError>;
    fn update_order(&self, order_id: Uuid, update: OrderUpdate)
        -> Result<UpdatedOrder, DomainError>;

    /// Returns the number of payment rows changed.
    fn set_payment_status_by_gateway_payment(
        &self,
        gateway_payment_id: &str,
        status: PaymentStatus,
    ) -> Result<usize, DomainError>;

    /// Returns the number of order rows changed.
    fn set_order_payment_status_by_session(
        &self,
        session_id: &str,
        status: PaymentStatus,
    ) -> Result<usize, DomainError>;
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    fn public_key(&self) -> &str;
    fn currency(&self) -> &str;

    async fn create_session(&self, request: SessionRequest) -> Result<GatewaySession, DomainError>;
    async fn fetch_session(&self, session_id: &str) -> Result<FetchedSession, DomainError>;

    fn verify_payment_signature(
        &self,
        session_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<(), DomainError>;
    fn verify_webhook_signature(&self, raw_body: &[u8], signature: &str)
        -> Result<(), DomainError>;
}

pub trait AssetStore: Send + Sync + 'static {
    fn delete(&self, asset_ref: &str) -> Result<(), DomainError>;
}
