//! Read models owned by the catalog and profile services.

use bigdecimal::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price_modifier: BigDecimal,
    pub available: bool,
    pub stock: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub base_price: BigDecimal,
    pub selling_price: Option<BigDecimal>,
    pub is_active: bool,
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Price the storefront charges before any variant modifier.
    pub fn effective_price(&self) -> &BigDecimal {
        self.selling_price.as_ref().unwrap_or(&self.base_price)
    }

    pub fn variant(&self, id: Uuid) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}
