use std::collections::HashSet;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use log::{info, warn};
use uuid::Uuid;

use super::blocking;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    CartLineRequest, Order, OrderDetails, OrderStatus, OrderUpdate, StatusChange,
    StatusChangeOutcome,
};
use crate::domain::ports::{AddressStore, AssetStore, CatalogReader, OrderRepository};
use crate::domain::pricing;
use crate::domain::state_machine::{ensure_editable, history_comment};

/// Edits an admin may make to an order that has not shipped yet.
#[derive(Debug, Clone, Default)]
pub struct OrderEditRequest {
    pub address_id: Option<Uuid>,
    pub shipping_charges: Option<BigDecimal>,
    pub discount_amount: Option<BigDecimal>,
    pub items: Option<Vec<CartLineRequest>>,
}

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    catalog: Arc<dyn CatalogReader>,
    addresses: Arc<dyn AddressStore>,
    assets: Arc<dyn AssetStore>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        catalog: Arc<dyn CatalogReader>,
        addresses: Arc<dyn AddressStore>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            orders,
            catalog,
            addresses,
            assets,
        }
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, DomainError> {
        let orders = Arc::clone(&self.orders);
        blocking(move || orders.find_details(order_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    /// Orders owned by someone else are reported as missing.
    pub async fn get_order_for_user(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderDetails, DomainError> {
        let details = self.get_order(order_id).await?;
        if details.order.user_id != user_id {
            return Err(DomainError::not_found("Order"));
        }
        Ok(details)
    }

    pub async fn transition(
        &self,
        order_id: Uuid,
        status: &str,
        comment: Option<String>,
    ) -> Result<Order, DomainError> {
        let target: OrderStatus = status.parse()?;
        let outcome = self
            .apply(StatusChange {
                order_id,
                target,
                comment: history_comment(target, comment),
                refund: false,
            })
            .await?;
        Ok(outcome.order)
    }

    /// Cancel, optionally refunding the effective payment in the same unit of work.
    pub async fn cancel(
        &self,
        order_id: Uuid,
        comment: Option<String>,
        refund: bool,
    ) -> Result<StatusChangeOutcome, DomainError> {
        let outcome = self
            .apply(StatusChange {
                order_id,
                target: OrderStatus::Cancelled,
                comment: history_comment(OrderStatus::Cancelled, comment),
                refund,
            })
            .await?;
        if refund && !outcome.refunded {
            info!(
                "Order {} cancelled with refund requested but no successful payment to refund",
                order_id
            );
        }
        Ok(outcome)
    }

    async fn apply(&self, change: StatusChange) -> Result<StatusChangeOutcome, DomainError> {
        let orders = Arc::clone(&self.orders);
        let target = change.target;
        let outcome = blocking(move || orders.apply_status_change(change)).await?;
        info!("Order {} moved to {}", outcome.order.id, target);
        Ok(outcome)
    }

    pub async fn update_order(
        &self,
        order_id: Uuid,
        edit: OrderEditRequest,
    ) -> Result<Order, DomainError> {
        let current = self.get_order(order_id).await?.order;
        ensure_editable(current.status)?;

        if let Some(address_id) = edit.address_id {
            let addresses = Arc::clone(&self.addresses);
            let owner = current.user_id;
            blocking(move || addresses.find_address(address_id, owner))
                .await?
                .ok_or_else(|| DomainError::not_found("Address"))?;
        }

        let items = match edit.items {
            Some(lines) => {
                let ids = pricing::distinct_product_ids(&lines);
                let catalog = Arc::clone(&self.catalog);
                let products = blocking(move || catalog.find_products_by_ids(&ids)).await?;
                Some(pricing::price_items(&lines, &products)?)
            }
            None => None,
        };

        let kept_refs: HashSet<String> = items
            .iter()
            .flatten()
            .flat_map(|item| item.customization_asset_refs.iter().cloned())
            .collect();

        let update = OrderUpdate {
            address_id: edit.address_id,
            shipping_charges: edit.shipping_charges,
            discount_amount: edit.discount_amount,
            items,
        };
        let orders = Arc::clone(&self.orders);
        let updated = blocking(move || orders.update_order(order_id, update)).await?;

        let orphaned: Vec<String> = updated
            .replaced_items
            .iter()
            .flat_map(|item| item.customization_asset_refs.iter())
            .filter(|r| !kept_refs.contains(*r))
            .cloned()
            .collect();
        self.cleanup_assets(orphaned).await;

        info!("Order {} updated (total {})", updated.order.id, updated.order.total);
        Ok(updated.order)
    }

    /// Best effort: failures are logged and never fail the edit.
    async fn cleanup_assets(&self, refs: Vec<String>) {
        if refs.is_empty() {
            return;
        }
        let assets = Arc::clone(&self.assets);
        let result = blocking(move || {
            for asset_ref in &refs {
                if let Err(e) = assets.delete(asset_ref) {
                    warn!("Could not delete customization asset {}: {}", asset_ref, e);
                }
            }
            Ok(())
        })
        .await;
        if let Err(e) = result {
            warn!("Customization asset cleanup aborted: {}", e);
        }
    }
}
