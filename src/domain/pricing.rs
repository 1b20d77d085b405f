//! Line-item pricing against a point-in-time catalog snapshot.

use std::collections::{BTreeSet, HashMap};

use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::catalog::Product;
use super::errors::DomainError;
use super::money::{round_money, zero};
use super::order::{CartLineRequest, PricedLineItem};

/// Distinct product ids of a cart, in a stable order, for one batched catalog read.
pub fn distinct_product_ids(items: &[CartLineRequest]) -> Vec<Uuid> {
    items
        .iter()
        .map(|item| item.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Price every cart line. Unit prices are snapshotted here; later catalog
/// changes never reach an order priced by this call.
pub fn price_items(
    items: &[CartLineRequest],
    catalog: &[Product],
) -> Result<Vec<PricedLineItem>, DomainError> {
    if items.is_empty() {
        return Err(DomainError::validation("Cart is empty"));
    }

    let by_id: HashMap<Uuid, &Product> = catalog.iter().map(|p| (p.id, p)).collect();

    items
        .iter()
        .map(|item| {
            if item.quantity < 1 {
                return Err(DomainError::validation(format!(
                    "Quantity for product {} must be at least 1",
                    item.product_id
                )));
            }

            let product = by_id
                .get(&item.product_id)
                .filter(|p| p.is_active)
                .ok_or_else(|| DomainError::not_found(format!("Product {}", item.product_id)))?;

            let mut unit_price = product.effective_price().clone();
            if let Some(variant_id) = item.variant_id {
                let variant = product.variant(variant_id).ok_or_else(|| {
                    DomainError::validation(format!(
                        "Variant {} does not belong to product {}",
                        variant_id, product.id
                    ))
                })?;
                if !variant.available {
                    return Err(DomainError::validation(format!(
                        "Variant {} is not available",
                        variant.name
                    )));
                }
                unit_price += &variant.price_modifier;
            }

            let unit_price = round_money(&unit_price);
            let line_total = round_money(&(&unit_price * BigDecimal::from(item.quantity)));

            Ok(PricedLineItem {
                product_id: product.id,
                variant_id: item.variant_id,
                quantity: item.quantity,
                unit_price,
                line_total,
                customization_text: item.customization_text.clone(),
                customization_asset_refs: item.customization_asset_refs.clone(),
            })
        })
        .collect()
}

pub fn subtotal(items: &[PricedLineItem]) -> BigDecimal {
    items
        .iter()
        .fold(zero(), |acc, item| acc + &item.line_total)
}
