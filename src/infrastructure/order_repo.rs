use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Text;
use log::{debug, info};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    Order, OrderDetails, OrderDraft, OrderItem, OrderStatus, OrderTotals, OrderUpdate,
    Payment, PaymentConfirmation, PaymentMethod, PaymentStatus, PricedLineItem, StatusChange,
    StatusChangeOutcome, StatusHistoryEntry, UpdatedOrder,
};
use crate::domain::ports::OrderRepository;
use crate::domain::pricing;
use crate::domain::state_machine::{check_transition, ensure_editable};
use crate::schema::{coupon_usages, order_items, order_outbox, order_status_history, orders, payments};

use super::coupon_repo::count_usages;
use super::models::{
    NewCouponUsageRow, NewOrderItemRow, NewOrderRow, NewOutboxEventRow, NewPaymentRow,
    NewStatusHistoryRow, OrderItemRow, OrderRow, PaymentRow, StatusHistoryRow,
};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                debug!("Unique violation: {}", info.message());
                DomainError::Conflict("Resource already exists".to_string())
            }
            DieselError::NotFound => DomainError::not_found("Record"),
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

// ── Transaction-scoped helpers ───────────────────────────────────────────────

const INITIAL_COMMENT: &str = "Order placed";

/// Serialises writers on `key` until the surrounding transaction ends.
fn advisory_lock(conn: &mut PgConnection, key: &str) -> QueryResult<()> {
    diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind::<Text, _>(key)
        .execute(conn)
        .map(|_| ())
}

fn session_lock_key(session_id: &str) -> String {
    format!("order-session:{}", session_id)
}

fn order_by_session(conn: &mut PgConnection, session_id: &str) -> Result<Option<Order>, DomainError> {
    orders::table
        .filter(orders::gateway_session_id.eq(session_id))
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?
        .map(Order::try_from)
        .transpose()
}

fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<Order, DomainError> {
    orders::table
        .filter(orders::id.eq(order_id))
        .select(OrderRow::as_select())
        .for_update()
        .first(conn)
        .optional()?
        .ok_or_else(|| DomainError::not_found("Order"))
        .and_then(Order::try_from)
}

fn append_history(
    conn: &mut PgConnection,
    order_id: Uuid,
    status: OrderStatus,
    comment: &str,
) -> QueryResult<()> {
    diesel::insert_into(order_status_history::table)
        .values(&NewStatusHistoryRow {
            id: Uuid::new_v4(),
            order_id,
            status: status.as_str().to_string(),
            comment: comment.to_string(),
        })
        .execute(conn)
        .map(|_| ())
}

/// Outbox rows are committed or rolled back together with the change they describe.
fn write_outbox(
    conn: &mut PgConnection,
    order_id: Uuid,
    event_type: &str,
    payload: Value,
) -> QueryResult<()> {
    diesel::insert_into(order_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: "Order".to_string(),
            aggregate_id: order_id.to_string(),
            event_type: event_type.to_string(),
            payload,
        })
        .execute(conn)
        .map(|_| ())
}

fn insert_items(
    conn: &mut PgConnection,
    order_id: Uuid,
    items: &[PricedLineItem],
) -> QueryResult<()> {
    let rows: Vec<NewOrderItemRow> = items
        .iter()
        .map(|item| NewOrderItemRow {
            id: Uuid::new_v4(),
            order_id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            unit_price: item.unit_price.clone(),
            line_total: item.line_total.clone(),
            customization_text: item.customization_text.clone(),
            customization_asset_refs: item.customization_asset_refs.clone(),
        })
        .collect();
    diesel::insert_into(order_items::table)
        .values(&rows)
        .execute(conn)
        .map(|_| ())
}

/// Upsert the session's payment as SUCCESS and mark the order paid.
fn confirm_in_tx(
    conn: &mut PgConnection,
    order: Order,
    session_id: &str,
    gateway_payment_id: &str,
) -> Result<Order, DomainError> {
    let now = Utc::now();
    let existing = payments::table
        .filter(payments::gateway_order_id.eq(session_id))
        .filter(payments::user_id.eq(order.user_id))
        .order(payments::created_at.desc())
        .select(PaymentRow::as_select())
        .first(conn)
        .optional()?;

    match existing {
        Some(payment) if payment.status == PaymentStatus::Refunded.as_str() => {}
        Some(payment) => {
            diesel::update(payments::table.find(payment.id))
                .set((
                    payments::status.eq(PaymentStatus::Success.as_str()),
                    payments::gateway_payment_id.eq(gateway_payment_id),
                    payments::updated_at.eq(now),
                ))
                .execute(conn)?;
        }
        None => {
            diesel::insert_into(payments::table)
                .values(&NewPaymentRow {
                    id: Uuid::new_v4(),
                    order_id: order.id,
                    user_id: order.user_id,
                    amount: order.total.clone(),
                    gateway_order_id: Some(session_id.to_string()),
                    gateway_payment_id: Some(gateway_payment_id.to_string()),
                    method: PaymentMethod::Online.as_str().to_string(),
                    status: PaymentStatus::Success.as_str().to_string(),
                })
                .execute(conn)?;
        }
    }

    if matches!(
        order.payment_status,
        PaymentStatus::Success | PaymentStatus::Refunded
    ) {
        return Ok(order);
    }

    let row = diesel::update(orders::table.find(order.id))
        .set((
            orders::payment_status.eq(PaymentStatus::Success.as_str()),
            orders::updated_at.eq(now),
        ))
        .returning(OrderRow::as_returning())
        .get_result(conn)?;
    Order::try_from(row)
}

fn confirm_existing_in_tx(
    conn: &mut PgConnection,
    confirmation: &PaymentConfirmation,
) -> Result<Option<Order>, DomainError> {
    let Some(order) = order_by_session(conn, &confirmation.session_id)? else {
        return Ok(None);
    };
    if order.user_id != confirmation.user_id {
        return Err(DomainError::Unauthorized);
    }
    confirm_in_tx(
        conn,
        order,
        &confirmation.session_id,
        &confirmation.gateway_payment_id,
    )
    .map(Some)
}

fn order_placed_payload(order: &Order, items: &[PricedLineItem]) -> Value {
    let lines: Vec<Value> = items
        .iter()
        .map(|item| {
            json!({
                "product_id": item.product_id,
                "variant_id": item.variant_id,
                "quantity": item.quantity,
                "unit_price": item.unit_price.to_string(),
                "line_total": item.line_total.to_string(),
            })
        })
        .collect();

    json!({
        "order_id": order.id,
        "user_id": order.user_id,
        "status": order.status.as_str(),
        "payment_method": order.payment_method.as_str(),
        "payment_status": order.payment_status.as_str(),
        "subtotal": order.subtotal.to_string(),
        "discount_amount": order.discount_amount.as_ref().map(ToString::to_string),
        "shipping_charges": order.shipping_charges.as_ref().map(ToString::to_string),
        "total": order.total.to_string(),
        "coupon_id": order.coupon_id,
        "lines": lines,
    })
}

fn insert_or_confirm(conn: &mut PgConnection, draft: &OrderDraft) -> Result<Order, DomainError> {
    if let Some(session_id) = &draft.gateway_session_id {
        advisory_lock(conn, &session_lock_key(session_id))?;
        if let Some(existing) = order_by_session(conn, session_id)? {
            if existing.user_id != draft.user_id {
                return Err(DomainError::Unauthorized);
            }
            return match &draft.payment.gateway_payment_id {
                Some(payment_id) => confirm_in_tx(conn, existing, session_id, payment_id),
                None => Ok(existing),
            };
        }
    }

    if let Some(coupon) = &draft.coupon {
        // Session lock first, coupon lock second: one global order, no deadlocks.
        advisory_lock(conn, &format!("coupon:{}", coupon.id))?;
        let counts = count_usages(conn, coupon.id, draft.user_id)?;
        coupon.check_usage(&counts)?;
    }

    let order_id = Uuid::new_v4();
    let row = diesel::insert_into(orders::table)
        .values(&NewOrderRow {
            id: order_id,
            user_id: draft.user_id,
            address_id: draft.address_id,
            subtotal: draft.totals.subtotal.clone(),
            discount_amount: draft.totals.discount_amount.clone(),
            shipping_charges: draft.totals.shipping_charges.clone(),
            total: draft.totals.total.clone(),
            payment_method: draft.payment_method.as_str().to_string(),
            payment_status: draft.payment.status.as_str().to_string(),
            status: OrderStatus::PendingReview.as_str().to_string(),
            gateway_session_id: draft.gateway_session_id.clone(),
            coupon_id: draft.coupon.as_ref().map(|c| c.id),
        })
        .returning(OrderRow::as_returning())
        .get_result(conn)?;
    let order = Order::try_from(row)?;

    insert_items(conn, order_id, &draft.items)?;
    append_history(conn, order_id, OrderStatus::PendingReview, INITIAL_COMMENT)?;

    diesel::insert_into(payments::table)
        .values(&NewPaymentRow {
            id: Uuid::new_v4(),
            order_id,
            user_id: draft.user_id,
            amount: draft.totals.total.clone(),
            gateway_order_id: draft.gateway_session_id.clone(),
            gateway_payment_id: draft.payment.gateway_payment_id.clone(),
            method: draft.payment_method.as_str().to_string(),
            status: draft.payment.status.as_str().to_string(),
        })
        .execute(conn)?;

    if let Some(coupon) = &draft.coupon {
        diesel::insert_into(coupon_usages::table)
            .values(&NewCouponUsageRow {
                id: Uuid::new_v4(),
                coupon_id: coupon.id,
                user_id: draft.user_id,
                order_id,
            })
            .execute(conn)?;
        info!("Coupon {} redeemed by user {} on order {}", coupon.code, draft.user_id, order_id);
    }

    write_outbox(conn, order_id, "OrderPlaced", order_placed_payload(&order, &draft.items))?;

    Ok(order)
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn materialize(&self, draft: OrderDraft) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        let result = conn.transaction::<_, DomainError, _>(|conn| insert_or_confirm(conn, &draft));

        // Losing the race on the unique session index means the order exists:
        // that is the idempotent path, not a failure.
        match (result, &draft.gateway_session_id, &draft.payment.gateway_payment_id) {
            (Err(DomainError::Conflict(_)), Some(session_id), Some(payment_id)) => {
                let confirmation = PaymentConfirmation {
                    session_id: session_id.clone(),
                    user_id: draft.user_id,
                    gateway_payment_id: payment_id.clone(),
                };
                conn.transaction::<_, DomainError, _>(|conn| {
                    confirm_existing_in_tx(conn, &confirmation)?
                        .ok_or_else(|| DomainError::Internal("order vanished after conflict".into()))
                })
            }
            (result, _, _) => result,
        }
    }

    fn confirm_payment(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            advisory_lock(conn, &session_lock_key(&confirmation.session_id))?;
            confirm_existing_in_tx(conn, &confirmation)
        })
    }

    fn find_by_session(&self, session_id: &str) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        order_by_session(&mut conn, session_id)
    }

    fn find_details(&self, order_id: Uuid) -> Result<Option<OrderDetails>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(order_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let items = OrderItemRow::belonging_to(&order)
            .select(OrderItemRow::as_select())
            .order(order_items::created_at.asc())
            .load(&mut conn)?;

        let history = order_status_history::table
            .filter(order_status_history::order_id.eq(order.id))
            .select(StatusHistoryRow::as_select())
            .order(order_status_history::created_at.asc())
            .load(&mut conn)?;

        let payment_rows = payments::table
            .filter(payments::order_id.eq(order.id))
            .select(PaymentRow::as_select())
            .order(payments::created_at.asc())
            .load(&mut conn)?;

        Ok(Some(OrderDetails {
            order: Order::try_from(order)?,
            items: items.into_iter().map(OrderItem::from).collect(),
            history: history
                .into_iter()
                .map(StatusHistoryEntry::try_from)
                .collect::<Result<_, _>>()?,
            payments: payment_rows
                .into_iter()
                .map(Payment::try_from)
                .collect::<Result<_, _>>()?,
        }))
    }

    fn apply_status_change(
        &self,
        change: StatusChange,
    ) -> Result<StatusChangeOutcome, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let current = lock_order(conn, change.order_id)?;
            check_transition(current.status, change.target)?;

            let now = Utc::now();
            let mut payment_status = current.payment_status;
            let mut refunded_payment: Option<PaymentRow> = None;

            if change.target == OrderStatus::Cancelled && change.refund {
                let effective = payments::table
                    .filter(payments::order_id.eq(current.id))
                    .filter(payments::status.eq(PaymentStatus::Success.as_str()))
                    .order(payments::created_at.desc())
                    .select(PaymentRow::as_select())
                    .first(conn)
                    .optional()?;
                if let Some(payment) = effective {
                    diesel::update(payments::table.find(payment.id))
                        .set((
                            payments::status.eq(PaymentStatus::Refunded.as_str()),
                            payments::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                    payment_status = PaymentStatus::Refunded;
                    refunded_payment = Some(payment);
                }
            }

            let row = diesel::update(orders::table.find(current.id))
                .set((
                    orders::status.eq(change.target.as_str()),
                    orders::payment_status.eq(payment_status.as_str()),
                    orders::updated_at.eq(now),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;
            append_history(conn, current.id, change.target, &change.comment)?;

            write_outbox(
                conn,
                current.id,
                "OrderStatusChanged",
                json!({
                    "order_id": current.id,
                    "from": current.status.as_str(),
                    "to": change.target.as_str(),
                    "comment": change.comment,
                }),
            )?;
            if let Some(payment) = &refunded_payment {
                write_outbox(
                    conn,
                    current.id,
                    "OrderRefunded",
                    json!({
                        "order_id": current.id,
                        "payment_id": payment.id,
                        "gateway_payment_id": payment.gateway_payment_id,
                        "amount": payment.amount.to_string(),
                    }),
                )?;
            }

            Ok(StatusChangeOutcome {
                order: Order::try_from(row)?,
                refunded: refunded_payment.is_some(),
            })
        })
    }

    fn update_order(&self, order_id: Uuid, update: OrderUpdate) -> Result<UpdatedOrder, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let current = lock_order(conn, order_id)?;
            ensure_editable(current.status)?;

            let (subtotal, replaced_items) = match &update.items {
                Some(items) => {
                    let replaced: Vec<OrderItemRow> = diesel::delete(
                        order_items::table.filter(order_items::order_id.eq(order_id)),
                    )
                    .returning(OrderItemRow::as_returning())
                    .get_results(conn)?;
                    insert_items(conn, order_id, items)?;
                    (
                        pricing::subtotal(items),
                        replaced.into_iter().map(OrderItem::from).collect(),
                    )
                }
                None => (current.subtotal.clone(), Vec::new()),
            };

            let totals = OrderTotals::compute(
                &subtotal,
                update
                    .discount_amount
                    .as_ref()
                    .or(current.discount_amount.as_ref()),
                update
                    .shipping_charges
                    .as_ref()
                    .or(current.shipping_charges.as_ref()),
            )?;

            let row = diesel::update(orders::table.find(order_id))
                .set((
                    orders::address_id.eq(update.address_id.unwrap_or(current.address_id)),
                    orders::subtotal.eq(totals.subtotal.clone()),
                    orders::discount_amount.eq(totals.discount_amount.clone()),
                    orders::shipping_charges.eq(totals.shipping_charges.clone()),
                    orders::total.eq(totals.total.clone()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            // Unsettled payments follow the order total.
            diesel::update(
                payments::table
                    .filter(payments::order_id.eq(order_id))
                    .filter(payments::status.eq(PaymentStatus::Pending.as_str())),
            )
            .set(payments::amount.eq(totals.total.clone()))
            .execute(conn)?;

            Ok(UpdatedOrder {
                order: Order::try_from(row)?,
                replaced_items,
            })
        })
    }

    fn set_payment_status_by_gateway_payment(
        &self,
        gateway_payment_id: &str,
        status: PaymentStatus,
    ) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;
        let from: Vec<&str> = status.overwritable_from().iter().map(|s| s.as_str()).collect();

        Ok(diesel::update(
            payments::table
                .filter(payments::gateway_payment_id.eq(gateway_payment_id))
                .filter(payments::status.eq_any(from)),
        )
        .set((
            payments::status.eq(status.as_str()),
            payments::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?)
    }

    fn set_order_payment_status_by_session(
        &self,
        session_id: &str,
        status: PaymentStatus,
    ) -> Result<usize, DomainError> {
        let mut conn = self.pool.get()?;
        let from: Vec<&str> = status.overwritable_from().iter().map(|s| s.as_str()).collect();

        Ok(diesel::update(
            orders::table
                .filter(orders::gateway_session_id.eq(session_id))
                .filter(orders::payment_status.eq_any(from)),
        )
        .set((
            orders::payment_status.eq(status.as_str()),
            orders::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?)
    }
}
