use std::sync::Arc;

use bigdecimal::{BigDecimal, Signed};
use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use super::blocking;
use crate::domain::checkout::{
    receipt_for, CheckoutMetadata, CheckoutRequest, CheckoutSession, Quote, SessionRequest,
};
use crate::domain::coupon::{canonical_code, AppliedCoupon, Coupon};
use crate::domain::errors::DomainError;
use crate::domain::money::{round_money, to_minor_units};
use crate::domain::order::{
    Order, OrderDraft, OrderTotals, PaymentConfirmation, PaymentDraft, PaymentMethod,
    PaymentStatus,
};
use crate::domain::ports::{
    AddressStore, CatalogReader, CouponRepository, OrderRepository, PaymentGateway,
};
use crate::domain::pricing;

/// Checkout use cases. Every path that turns a cart into money goes through
/// [`CheckoutService::quote`], so offline placement, session creation and
/// payment confirmation can never disagree on a total.
pub struct CheckoutService {
    catalog: Arc<dyn CatalogReader>,
    addresses: Arc<dyn AddressStore>,
    coupons: Arc<dyn CouponRepository>,
    orders: Arc<dyn OrderRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        addresses: Arc<dyn AddressStore>,
        coupons: Arc<dyn CouponRepository>,
        orders: Arc<dyn OrderRepository>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            catalog,
            addresses,
            coupons,
            orders,
            gateway,
        }
    }

    /// Price a checkout: address ownership, line items, coupon, totals.
    pub async fn quote(
        &self,
        user_id: Uuid,
        request: &CheckoutRequest,
    ) -> Result<Quote, DomainError> {
        let addresses = Arc::clone(&self.addresses);
        let address_id = request.address_id;
        blocking(move || addresses.find_address(address_id, user_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Address"))?;

        let ids = pricing::distinct_product_ids(&request.items);
        let catalog = Arc::clone(&self.catalog);
        let products = blocking(move || catalog.find_products_by_ids(&ids)).await?;

        let items = pricing::price_items(&request.items, &products)?;
        let subtotal = pricing::subtotal(&items);

        let code = request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        let (coupon, discount) = match code {
            Some(code) => {
                let (coupon, applied) = self.apply_coupon(code, &subtotal, user_id).await?;
                (Some(coupon), Some(applied.discount_amount))
            }
            None => (None, None),
        };

        let totals = OrderTotals::compute(
            &subtotal,
            discount.as_ref(),
            request.shipping_charges.as_ref(),
        )?;

        Ok(Quote {
            items,
            totals,
            coupon,
        })
    }

    async fn apply_coupon(
        &self,
        code: &str,
        subtotal: &BigDecimal,
        user_id: Uuid,
    ) -> Result<(Coupon, AppliedCoupon), DomainError> {
        let canonical = canonical_code(code);
        let coupons = Arc::clone(&self.coupons);
        let (coupon, counts) = blocking(move || {
            let coupon = coupons
                .find_by_code(&canonical)?
                .ok_or_else(|| DomainError::not_found("Coupon"))?;
            let counts = coupons.usage_counts(coupon.id, user_id)?;
            Ok((coupon, counts))
        })
        .await?;

        let applied = coupon.evaluate(subtotal, &counts, Utc::now())?;
        Ok((coupon, applied))
    }

    /// Discount a coupon would give right now. Never records a redemption.
    pub async fn preview_coupon(
        &self,
        user_id: Uuid,
        code: &str,
        subtotal: &BigDecimal,
    ) -> Result<AppliedCoupon, DomainError> {
        if subtotal.is_negative() {
            return Err(DomainError::validation("Subtotal cannot be negative"));
        }
        let (_, applied) = self
            .apply_coupon(code, &round_money(subtotal), user_id)
            .await?;
        Ok(applied)
    }

    /// Open a gateway session for the recomputed total, embedding the cart in
    /// the session metadata.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        request: CheckoutRequest,
        client_amount: &BigDecimal,
    ) -> Result<CheckoutSession, DomainError> {
        let quote = self.quote(user_id, &request).await?;
        let total = quote.totals.total.clone();

        if round_money(client_amount) != total {
            return Err(DomainError::validation(format!(
                "Amount does not match the order total of {}",
                total
            )));
        }
        let amount_minor = to_minor_units(&total)?;
        if amount_minor <= 0 {
            return Err(DomainError::validation(
                "Order total must be positive for online payment",
            ));
        }

        let metadata = CheckoutMetadata {
            user_id,
            items: request.items,
            address_id: request.address_id,
            coupon_code: quote.coupon.as_ref().map(|c| c.code.clone()),
            shipping_charges: quote.totals.shipping_charges.clone(),
            amount: total,
        };

        let session = self
            .gateway
            .create_session(SessionRequest {
                amount_minor,
                currency: self.gateway.currency().to_string(),
                receipt: receipt_for(user_id, Utc::now()),
                metadata,
            })
            .await?;

        info!(
            "Opened payment session {} for user {} ({} {})",
            session.session_id, user_id, session.amount_minor, session.currency
        );

        Ok(CheckoutSession {
            session_id: session.session_id,
            amount_minor: session.amount_minor,
            currency: session.currency,
            public_key: self.gateway.public_key().to_string(),
        })
    }

    /// Synchronous confirmation from the client. The signature is checked
    /// before anything touches the store.
    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        session_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Order, DomainError> {
        if let Err(e) = self
            .gateway
            .verify_payment_signature(session_id, payment_id, signature)
        {
            warn!("Rejected payment confirmation with an invalid signature");
            return Err(e);
        }

        self.materialize(session_id, user_id, payment_id).await
    }

    /// Create-or-find the single order for a paid gateway session.
    pub async fn materialize(
        &self,
        session_id: &str,
        user_id: Uuid,
        payment_id: &str,
    ) -> Result<Order, DomainError> {
        if let Some(order) = self.confirm_existing(session_id, user_id, payment_id).await? {
            debug!("Session {} already materialized as {}", session_id, order.id);
            return Ok(order);
        }

        let fetched = self.gateway.fetch_session(session_id).await?;
        let metadata = fetched.metadata.ok_or_else(|| {
            DomainError::validation("Payment session carries no checkout data")
        })?;
        if metadata.user_id != user_id {
            warn!("Payment session {} does not belong to the caller", session_id);
            return Err(DomainError::Unauthorized);
        }

        let quote = match self.quote(user_id, &metadata.to_request()).await {
            Ok(quote) => quote,
            Err(e) => {
                // A concurrent confirmation may have redeemed the coupon for
                // this very session between the first lookup and the re-price.
                if let Some(order) = self.confirm_existing(session_id, user_id, payment_id).await? {
                    return Ok(order);
                }
                return Err(e);
            }
        };

        if to_minor_units(&quote.totals.total)? != fetched.amount_minor {
            warn!(
                "Recomputed total {} for session {} differs from the paid amount {} (minor units)",
                quote.totals.total, session_id, fetched.amount_minor
            );
        }

        let draft = OrderDraft {
            user_id,
            address_id: metadata.address_id,
            items: quote.items,
            totals: quote.totals,
            payment_method: PaymentMethod::Online,
            gateway_session_id: Some(session_id.to_string()),
            coupon: quote.coupon,
            payment: PaymentDraft {
                gateway_payment_id: Some(payment_id.to_string()),
                status: PaymentStatus::Success,
            },
        };

        let orders = Arc::clone(&self.orders);
        let order = blocking(move || orders.materialize(draft)).await?;
        info!(
            "Order {} materialized from session {} (total {})",
            order.id, session_id, order.total
        );
        Ok(order)
    }

    async fn confirm_existing(
        &self,
        session_id: &str,
        user_id: Uuid,
        payment_id: &str,
    ) -> Result<Option<Order>, DomainError> {
        let orders = Arc::clone(&self.orders);
        let confirmation = PaymentConfirmation {
            session_id: session_id.to_string(),
            user_id,
            gateway_payment_id: payment_id.to_string(),
        };
        blocking(move || orders.confirm_payment(confirmation)).await
    }

    /// Cash-on-delivery style placement: the order is real immediately, its
    /// payment stays PENDING.
    pub async fn place_offline_order(
        &self,
        user_id: Uuid,
        request: CheckoutRequest,
    ) -> Result<Order, DomainError> {
        let quote = self.quote(user_id, &request).await?;

        let draft = OrderDraft {
            user_id,
            address_id: request.address_id,
            items: quote.items,
            totals: quote.totals,
            payment_method: PaymentMethod::Offline,
            gateway_session_id: None,
            coupon: quote.coupon,
            payment: PaymentDraft {
                gateway_payment_id: None,
                status: PaymentStatus::Pending,
            },
        };

        let orders = Arc::clone(&self.orders);
        let order = blocking(move || orders.materialize(draft)).await?;
        info!("Offline order {} placed by user {}", order.id, user_id);
        Ok(order)
    }
}
