//! JSON shapes shared by several handlers. Money travels as decimal strings.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::order::{
    CartLineRequest, Order, OrderDetails, OrderItem, Payment, StatusHistoryEntry,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLineDto {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    pub customization_text: Option<String>,
    /// References to files already uploaded for this line.
    #[serde(default)]
    pub customization_asset_refs: Vec<String>,
}

impl From<CartLineDto> for CartLineRequest {
    fn from(dto: CartLineDto) -> Self {
        CartLineRequest {
            product_id: dto.product_id,
            variant_id: dto.variant_id,
            quantity: dto.quantity,
            customization_text: dto.customization_text,
            customization_asset_refs: dto.customization_asset_refs,
        }
    }
}

pub fn cart_lines(items: Vec<CartLineDto>) -> Vec<CartLineRequest> {
    items.into_iter().map(CartLineRequest::from).collect()
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub address_id: Uuid,
    #[schema(value_type = String)]
    pub subtotal: BigDecimal,
    #[schema(value_type = Option<String>)]
    pub discount_amount: Option<BigDecimal>,
    #[schema(value_type = Option<String>)]
    pub shipping_charges: Option<BigDecimal>,
    #[schema(value_type = String)]
    pub total: BigDecimal,
    pub payment_method: String,
    pub payment_status: String,
    pub status: String,
    pub gateway_session_id: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderDto {
    fn from(o: Order) -> Self {
        OrderDto {
            id: o.id,
            user_id: o.user_id,
            address_id: o.address_id,
            subtotal: o.subtotal,
            discount_amount: o.discount_amount,
            shipping_charges: o.shipping_charges,
            total: o.total,
            payment_method: o.payment_method.as_str().to_string(),
            payment_status: o.payment_status.as_str().to_string(),
            status: o.status.as_str().to_string(),
            gateway_session_id: o.gateway_session_id,
            coupon_id: o.coupon_id,
            created_at: o.created_at,
            updated_at: o.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDto {
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: BigDecimal,
    #[schema(value_type = String)]
    pub line_total: BigDecimal,
    pub customization_text: Option<String>,
    pub customization_asset_refs: Vec<String>,
}

impl From<OrderItem> for OrderItemDto {
    fn from(i: OrderItem) -> Self {
        OrderItemDto {
            id: i.id,
            product_id: i.product_id,
            variant_id: i.variant_id,
            quantity: i.quantity,
            unit_price: i.unit_price,
            line_total: i.line_total,
            customization_text: i.customization_text,
            customization_asset_refs: i.customization_asset_refs,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryDto {
    pub status: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl From<StatusHistoryEntry> for HistoryEntryDto {
    fn from(h: StatusHistoryEntry) -> Self {
        HistoryEntryDto {
            status: h.status.as_str().to_string(),
            comment: h.comment,
            created_at: h.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    pub id: Uuid,
    #[schema(value_type = String)]
    pub amount: BigDecimal,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub method: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        PaymentDto {
            id: p.id,
            amount: p.amount,
            gateway_order_id: p.gateway_order_id,
            gateway_payment_id: p.gateway_payment_id,
            method: p.method.as_str().to_string(),
            status: p.status.as_str().to_string(),
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailsDto {
    pub order: OrderDto,
    pub items: Vec<OrderItemDto>,
    pub history: Vec<HistoryEntryDto>,
    pub payments: Vec<PaymentDto>,
}

impl From<OrderDetails> for OrderDetailsDto {
    fn from(d: OrderDetails) -> Self {
        OrderDetailsDto {
            order: d.order.into(),
            items: d.items.into_iter().map(Into::into).collect(),
            history: d.history.into_iter().map(Into::into).collect(),
            payments: d.payments.into_iter().map(Into::into).collect(),
        }
    }
}
