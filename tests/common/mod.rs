//! In-memory stand-ins for every port, with the same atomicity as the Postgres
//! adapters: each repository call runs under one lock.

#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use order_settlement::application::{CheckoutService, OrderService, WebhookService};
use order_settlement::domain::catalog::{Address, Product, ProductVariant};
use order_settlement::domain::checkout::{
    CheckoutRequest, FetchedSession, GatewaySession, SessionRequest,
};
use order_settlement::domain::coupon::{canonical_code, Coupon, CouponUsageCounts, DiscountType};
use order_settlement::domain::errors::DomainError;
use order_settlement::domain::order::{
    CartLineRequest, Order, OrderDetails, OrderDraft, OrderItem, OrderStatus, OrderTotals,
    OrderUpdate, Payment, PaymentConfirmation, PaymentMethod, PaymentStatus, PricedLineItem,
    StatusChange, StatusChangeOutcome, StatusHistoryEntry, UpdatedOrder,
};
use order_settlement::domain::ports::{
    AddressStore, AssetStore, CatalogReader, CouponRepository, OrderRepository, PaymentGateway,
};
use order_settlement::domain::pricing;
use order_settlement::domain::signature;
use order_settlement::domain::state_machine::{check_transition, ensure_editable};

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "key_secret_test";
pub const WEBHOOK_SECRET: &str = "webhook_secret_test";

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).expect("valid decimal")
}

// ── Store ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Usage {
    pub coupon_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
}

#[derive(Debug, Default)]
pub struct Store {
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
    pub history: Vec<StatusHistoryEntry>,
    pub payments: Vec<Payment>,
    pub usages: Vec<Usage>,
}

impl Store {
    fn counts(&self, coupon_id: Uuid, user_id: Uuid) -> CouponUsageCounts {
        let of_coupon = self.usages.iter().filter(|u| u.coupon_id == coupon_id);
        CouponUsageCounts {
            total: of_coupon.clone().count() as i64,
            by_user: of_coupon.filter(|u| u.user_id == user_id).count() as i64,
        }
    }

    fn push_history(&mut self, order_id: Uuid, status: OrderStatus, comment: &str) {
        self.history.push(StatusHistoryEntry {
            id: Uuid::new_v4(),
            order_id,
            status,
            comment: comment.to_string(),
            created_at: Utc::now(),
        });
    }

    fn push_items(&mut self, order_id: Uuid, items: &[PricedLineItem]) {
        for item in items {
            self.items.push(OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: item.product_id,
                variant_id: item.variant_id,
                quantity: item.quantity,
                unit_price: item.unit_price.clone(),
                line_total: item.line_total.clone(),
                customization_text: item.customization_text.clone(),
                customization_asset_refs: item.customization_asset_refs.clone(),
            });
        }
    }

    fn confirm(&mut self, idx: usize, session_id: &str, payment_id: &str) -> Order {
        let (order_id, user_id, total) = {
            let o = &self.orders[idx];
            (o.id, o.user_id, o.total.clone())
        };
        let now = Utc::now();
        let existing = self.payments.iter_mut().rev().find(|p| {
            p.gateway_order_id.as_deref() == Some(session_id) && p.user_id == user_id
        });
        match existing {
            Some(p) if p.status == PaymentStatus::Refunded => {}
            Some(p) => {
                p.status = PaymentStatus::Success;
                p.gateway_payment_id = Some(payment_id.to_string());
                p.updated_at = now;
            }
            None => self.payments.push(Payment {
                id: Uuid::new_v4(),
                order_id,
                user_id,
                amount: total,
                gateway_order_id: Some(session_id.to_string()),
                gateway_payment_id: Some(payment_id.to_string()),
                method: PaymentMethod::Online,
                status: PaymentStatus::Success,
                created_at: now,
                updated_at: now,
            }),
        }
        let order = &mut self.orders[idx];
        if !matches!(
            order.payment_status,
            PaymentStatus::Success | PaymentStatus::Refunded
        ) {
            order.payment_status = PaymentStatus::Success;
            order.updated_at = now;
        }
        order.clone()
    }

    fn session_index(&self, session_id: &str) -> Option<usize> {
        self.orders
            .iter()
            .position(|o| o.gateway_session_id.as_deref() == Some(session_id))
    }

    fn order_index(&self, order_id: Uuid) -> Result<usize, DomainError> {
        self.orders
            .iter()
            .position(|o| o.id == order_id)
            .ok_or_else(|| DomainError::not_found("Order"))
    }
}

pub type SharedStore = Arc<Mutex<Store>>;

// ── Repositories ─────────────────────────────────────────────────────────────

pub struct InMemoryCatalog(pub Vec<Product>);

impl CatalogReader for InMemoryCatalog {
    fn find_products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        Ok(self
            .0
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

pub struct InMemoryAddresses(pub Vec<Address>);

impl AddressStore for InMemoryAddresses {
    fn find_address(&self, id: Uuid, user_id: Uuid) -> Result<Option<Address>, DomainError> {
        Ok(self
            .0
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }
}

pub struct InMemoryCoupons {
    pub coupons: Mutex<Vec<Coupon>>,
    store: SharedStore,
}

impl CouponRepository for InMemoryCoupons {
    fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        Ok(self
            .coupons
            .lock()
            .expect("coupons")
            .iter()
            .find(|c| canonical_code(&c.code) == canonical_code(code))
            .cloned())
    }

    fn usage_counts(
        &self,
        coupon_id: Uuid,
        user_id: Uuid,
    ) -> Result<CouponUsageCounts, DomainError> {
        Ok(self.store.lock().expect("store").counts(coupon_id, user_id))
    }
}

pub struct InMemoryOrders {
    store: SharedStore,
    pub unavailable: AtomicBool,
}

impl OrderRepository for InMemoryOrders {
    fn materialize(&self, draft: OrderDraft) -> Result<Order, DomainError> {
        let mut s = self.store.lock().expect("store");

        if let Some(session_id) = &draft.gateway_session_id {
            if let Some(idx) = s.session_index(session_id) {
                if s.orders[idx].user_id != draft.user_id {
                    return Err(DomainError::Unauthorized);
                }
                return Ok(match &draft.payment.gateway_payment_id {
                    Some(pid) => s.confirm(idx, session_id, pid),
                    None => s.orders[idx].clone(),
                });
            }
        }

        if let Some(coupon) = &draft.coupon {
            coupon.check_usage(&s.counts(coupon.id, draft.user_id))?;
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            address_id: draft.address_id,
            subtotal: draft.totals.subtotal.clone(),
            discount_amount: draft.totals.discount_amount.clone(),
            shipping_charges: draft.totals.shipping_charges.clone(),
            total: draft.totals.total.clone(),
            payment_method: draft.payment_method,
            payment_status: draft.payment.status,
            status: OrderStatus::PendingReview,
            gateway_session_id: draft.gateway_session_id.clone(),
            coupon_id: draft.coupon.as_ref().map(|c| c.id),
            created_at: now,
            updated_at: now,
        };
        s.orders.push(order.clone());
        s.push_items(order.id, &draft.items);
        s.push_history(order.id, OrderStatus::PendingReview, "Order placed");
        s.payments.push(Payment {
            id: Uuid::new_v4(),
            order_id: order.id,
            user_id: draft.user_id,
            amount: draft.totals.total.clone(),
            gateway_order_id: draft.gateway_session_id.clone(),
            gateway_payment_id: draft.payment.gateway_payment_id.clone(),
            method: draft.payment_method,
            status: draft.payment.status,
            created_at: now,
            updated_at: now,
        });
        if let Some(coupon) = &draft.coupon {
            s.usages.push(Usage {
                coupon_id: coupon.id,
                user_id: draft.user_id,
                order_id: order.id,
            });
        }
        Ok(order)
    }

    fn confirm_payment(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<Option<Order>, DomainError> {
        let mut s = self.store.lock().expect("store");
        let Some(idx) = s.session_index(&confirmation.session_id) else {
            return Ok(None);
        };
        if s.orders[idx].user_id != confirmation.user_id {
            return Err(DomainError::Unauthorized);
        }
        Ok(Some(s.confirm(
            idx,
            &confirmation.session_id,
            &confirmation.gateway_payment_id,
        )))
    }

    fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, DomainError> {
        let s = self.store.lock().expect("store");
        Ok(s.session_index(session_id).map(|i| s.orders[i].clone()))
    }

    fn find_details(&self, order_id: Uuid) -> Result<Option<OrderDetails>, DomainError> {
        let s = self.store.lock().expect("store");
        let Some(order) = s.orders.iter().find(|o| o.id == order_id).cloned() else {
            return Ok(None);
        };
        Ok(Some(OrderDetails {
            items: s.items.iter().filter(|i| i.order_id == order_id).cloned().collect(),
            history: s.history.iter().filter(|h| h.order_id == order_id).cloned().collect(),
            payments: s.payments.iter().filter(|p| p.order_id == order_id).cloned().collect(),
            order,
        }))
    }

    fn apply_status_change(
        &self,
        change: StatusChange,
    ) -> Result<StatusChangeOutcome, DomainError> {
        let mut s = self.store.lock().expect("store");
        let idx = s.order_index(change.order_id)?;
        check_transition(s.orders[idx].status, change.target)?;

        let mut refunded = false;
        if change.target == OrderStatus::Cancelled && change.refund {
            if let Some(p) = s.payments.iter_mut().rev().find(|p| {
                p.order_id == change.order_id && p.status == PaymentStatus::Success
            }) {
                p.status = PaymentStatus::Refunded;
                refunded = true;
            }
        }

        let order = &mut s.orders[idx];
        order.status = change.target;
        if refunded {
            order.payment_status = PaymentStatus::Refunded;
        }
        order.updated_at = Utc::now();
        let order = order.clone();
        s.push_history(order.id, change.target, &change.comment);

        Ok(StatusChangeOutcome { order, refunded })
    }

    fn update_order(&self, order_id: Uuid, update: OrderUpdate) -> Result<UpdatedOrder, DomainError> {
        let mut s = self.store.lock().expect("store");
        let idx = s.order_index(order_id)?;
        ensure_editable(s.orders[idx].status)?;

        let current = s.orders[idx].clone();
        let subtotal = match &update.items {
            Some(items) => pricing::subtotal(items),
            None => current.subtotal.clone(),
        };
        let totals = OrderTotals::compute(
            &subtotal,
            update.discount_amount.as_ref().or(current.discount_amount.as_ref()),
            update.shipping_charges.as_ref().or(current.shipping_charges.as_ref()),
        )?;

        let mut replaced_items = Vec::new();
        if let Some(items) = &update.items {
            let (old, kept): (Vec<_>, Vec<_>) =
                s.items.drain(..).partition(|i| i.order_id == order_id);
            s.items = kept;
            replaced_items = old;
            s.push_items(order_id, items);
        }

        for p in s
            .payments
            .iter_mut()
            .filter(|p| p.order_id == order_id && p.status == PaymentStatus::Pending)
        {
            p.amount = totals.total.clone();
        }

        let order = &mut s.orders[idx];
        order.address_id = update.address_id.unwrap_or(current.address_id);
        order.subtotal = totals.subtotal;
        order.discount_amount = totals.discount_amount;
        order.shipping_charges = totals.shipping_charges;
        order.total = totals.total;
        order.updated_at = Utc::now();

        Ok(UpdatedOrder {
            order: order.clone(),
            replaced_items,
        })
    }

    fn set_payment_status_by_gateway_payment(
        &self,
        gateway_payment_id: &str,
        status: PaymentStatus,
    ) -> Result<usize, DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("database unavailable".into()));
        }
        let mut s = self.store.lock().expect("store");
        let from = status.overwritable_from();
        let mut changed = 0;
        for p in s.payments.iter_mut().filter(|p| {
            p.gateway_payment_id.as_deref() == Some(gateway_payment_id) && from.contains(&p.status)
        }) {
            p.status = status;
            changed += 1;
        }
        Ok(changed)
    }

    fn set_order_payment_status_by_session(
        &self,
        session_id: &str,
        status: PaymentStatus,
    ) -> Result<usize, DomainError> {
        let mut s = self.store.lock().expect("store");
        let from = status.overwritable_from();
        let mut changed = 0;
        for o in s.orders.iter_mut().filter(|o| {
            o.gateway_session_id.as_deref() == Some(session_id) && from.contains(&o.payment_status)
        }) {
            o.payment_status = status;
            changed += 1;
        }
        Ok(changed)
    }
}

// ── Gateway and assets ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeGateway {
    sessions: Mutex<HashMap<String, FetchedSession>>,
    counter: AtomicUsize,
    pub unavailable: AtomicBool,
}

impl FakeGateway {
    pub fn session(&self, session_id: &str) -> Option<FetchedSession> {
        self.sessions.lock().expect("sessions").get(session_id).cloned()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    fn public_key(&self) -> &str {
        KEY_ID
    }

    fn currency(&self) -> &str {
        "INR"
    }

    async fn create_session(&self, request: SessionRequest) -> Result<GatewaySession, DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::Gateway("connection refused".into()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let session_id = format!("order_T{}", n);
        self.sessions.lock().expect("sessions").insert(
            session_id.clone(),
            FetchedSession {
                session_id: session_id.clone(),
                amount_minor: request.amount_minor,
                metadata: Some(request.metadata),
            },
        );
        Ok(GatewaySession {
            session_id,
            amount_minor: request.amount_minor,
            currency: request.currency,
        })
    }

    async fn fetch_session(&self, session_id: &str) -> Result<FetchedSession, DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::Gateway("connection refused".into()));
        }
        self.session(session_id)
            .ok_or_else(|| DomainError::not_found("Payment session"))
    }

    fn verify_payment_signature(
        &self,
        session_id: &str,
        payment_id: &str,
        sig: &str,
    ) -> Result<(), DomainError> {
        signature::verify_payment_signature(KEY_SECRET, session_id, payment_id, sig)
    }

    fn verify_webhook_signature(&self, raw_body: &[u8], sig: &str) -> Result<(), DomainError> {
        signature::verify_webhook_signature(WEBHOOK_SECRET, raw_body, sig)
    }
}

#[derive(Default)]
pub struct RecordingAssets {
    pub deleted: Mutex<Vec<String>>,
    pub failing: Mutex<Vec<String>>,
}

impl AssetStore for RecordingAssets {
    fn delete(&self, asset_ref: &str) -> Result<(), DomainError> {
        if self.failing.lock().expect("failing").iter().any(|r| r == asset_ref) {
            return Err(DomainError::Internal("disk unavailable".into()));
        }
        self.deleted.lock().expect("deleted").push(asset_ref.to_string());
        Ok(())
    }
}

// ── World ────────────────────────────────────────────────────────────────────

/// A shop with one customer, one address and a small catalog:
/// a mug at 100.00 (variant "Large" +10.00), a poster at 25.00 and a
/// retired product.
pub struct World {
    pub store: SharedStore,
    pub catalog: Arc<InMemoryCatalog>,
    pub addresses: Arc<InMemoryAddresses>,
    pub coupons: Arc<InMemoryCoupons>,
    pub orders: Arc<InMemoryOrders>,
    pub gateway: Arc<FakeGateway>,
    pub assets: Arc<RecordingAssets>,
    pub user_id: Uuid,
    pub other_user_id: Uuid,
    pub address_id: Uuid,
    pub other_address_id: Uuid,
    pub mug: Uuid,
    pub large_mug: Uuid,
    pub poster: Uuid,
    pub retired: Uuid,
}

impl World {
    pub fn new() -> Self {
        let store: SharedStore = Arc::new(Mutex::new(Store::default()));
        let user_id = Uuid::new_v4();
        let other_user_id = Uuid::new_v4();
        let (mug, large_mug, poster, retired) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let address_id = Uuid::new_v4();
        let other_address_id = Uuid::new_v4();

        let product = |id: Uuid, price: &str, active: bool, variants: Vec<ProductVariant>| Product {
            id,
            name: "Product".to_string(),
            base_price: dec(price),
            selling_price: None,
            is_active: active,
            variants,
        };
        let catalog = vec![
            product(
                mug,
                "100.00",
                true,
                vec![ProductVariant {
                    id: large_mug,
                    product_id: mug,
                    name: "Large".to_string(),
                    price_modifier: dec("10.00"),
                    available: true,
                    stock: 3,
                }],
            ),
            product(poster, "25.00", true, vec![]),
            product(retired, "9.00", false, vec![]),
        ];
        let address = |id: Uuid, owner: Uuid| Address {
            id,
            user_id: owner,
            line1: "12 Market Street".to_string(),
            city: "Pune".to_string(),
            postal_code: "411001".to_string(),
            country: "IN".to_string(),
        };

        World {
            catalog: Arc::new(InMemoryCatalog(catalog)),
            addresses: Arc::new(InMemoryAddresses(vec![
                address(address_id, user_id),
                address(other_address_id, other_user_id),
            ])),
            coupons: Arc::new(InMemoryCoupons {
                coupons: Mutex::new(Vec::new()),
                store: Arc::clone(&store),
            }),
            orders: Arc::new(InMemoryOrders {
                store: Arc::clone(&store),
                unavailable: AtomicBool::new(false),
            }),
            gateway: Arc::new(FakeGateway::default()),
            assets: Arc::new(RecordingAssets::default()),
            store,
            user_id,
            other_user_id,
            address_id,
            other_address_id,
            mug,
            large_mug,
            poster,
            retired,
        }
    }

    pub fn add_coupon(&self, coupon: Coupon) -> Coupon {
        self.coupons.coupons.lock().expect("coupons").push(coupon.clone());
        coupon
    }

    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(
            self.catalog.clone(),
            self.addresses.clone(),
            self.coupons.clone(),
            self.orders.clone(),
            self.gateway.clone(),
        )
    }

    pub fn order_service(&self) -> OrderService {
        OrderService::new(
            self.orders.clone(),
            self.catalog.clone(),
            self.addresses.clone(),
            self.assets.clone(),
        )
    }

    pub fn webhooks(&self) -> WebhookService {
        WebhookService::new(self.orders.clone(), self.gateway.clone())
    }

    pub fn line(&self, product_id: Uuid, quantity: i32) -> CartLineRequest {
        CartLineRequest {
            product_id,
            variant_id: None,
            quantity,
            customization_text: None,
            customization_asset_refs: vec![],
        }
    }

    /// Two mugs, optional coupon, 15.00 shipping.
    pub fn cart(&self, coupon_code: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            items: vec![self.line(self.mug, 2)],
            address_id: self.address_id,
            coupon_code: coupon_code.map(str::to_string),
            shipping_charges: Some(dec("15.00")),
        }
    }

    pub fn usage_count(&self) -> usize {
        self.store.lock().expect("store").usages.len()
    }

    pub fn order_count(&self) -> usize {
        self.store.lock().expect("store").orders.len()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.store.lock().expect("store").payments.clone()
    }
}

// ── Coupons and gateway payloads ─────────────────────────────────────────────

pub fn percent_coupon(code: &str, percent: &str, usage_limit: Option<i32>, per_user: i32) -> Coupon {
    let now = Utc::now();
    Coupon {
        id: Uuid::new_v4(),
        code: code.to_string(),
        discount_type: DiscountType::Percentage,
        discount_value: dec(percent),
        min_purchase_amount: None,
        max_discount_amount: None,
        usage_limit,
        usage_limit_per_user: per_user,
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(30),
        is_active: true,
    }
}

pub fn expired_coupon(code: &str) -> Coupon {
    let now = Utc::now();
    Coupon {
        valid_from: now - Duration::days(30),
        valid_until: now - Duration::days(1),
        ..percent_coupon(code, "10", None, 1)
    }
}

pub fn captured_event(payment_id: &str, session_id: &str, amount_minor: i64) -> Vec<u8> {
    json!({
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": session_id,
                    "amount": amount_minor,
                    "status": "captured"
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}

pub fn failed_event(payment_id: &str) -> Vec<u8> {
    json!({
        "event": "payment.failed",
        "payload": { "payment": { "entity": { "id": payment_id, "status": "failed" } } }
    })
    .to_string()
    .into_bytes()
}

pub fn order_paid_event(session_id: &str, amount_minor: i64) -> Vec<u8> {
    json!({
        "event": "order.paid",
        "payload": { "order": { "entity": { "id": session_id, "amount_paid": amount_minor } } }
    })
    .to_string()
    .into_bytes()
}

pub fn sign_webhook(body: &[u8]) -> String {
    signature::sign(WEBHOOK_SECRET, body)
}

pub fn sign_payment(session_id: &str, payment_id: &str) -> String {
    signature::sign_payment(KEY_SECRET, session_id, payment_id)
}
