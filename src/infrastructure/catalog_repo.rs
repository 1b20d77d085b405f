use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{Address, Product};
use crate::domain::errors::DomainError;
use crate::domain::ports::{AddressStore, CatalogReader};
use crate::schema::{addresses, products};

use super::models::{AddressRow, ProductRow, ProductVariantRow};

/// Read-only view over the catalog tables.
pub struct DieselCatalogReader {
    pool: DbPool,
}

impl DieselCatalogReader {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogReader for DieselCatalogReader {
    fn find_products_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;

        let rows = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load(&mut conn)?;

        let variants = ProductVariantRow::belonging_to(&rows)
            .select(ProductVariantRow::as_select())
            .load(&mut conn)?;

        Ok(variants
            .grouped_by(&rows)
            .into_iter()
            .zip(rows)
            .map(|(variants, product)| product.into_product(variants))
            .collect())
    }
}

pub struct DieselAddressStore {
    pool: DbPool,
}

impl DieselAddressStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AddressStore for DieselAddressStore {
    fn find_address(&self, id: Uuid, user_id: Uuid) -> Result<Option<Address>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = addresses::table
            .filter(addresses::id.eq(id))
            .filter(addresses::user_id.eq(user_id))
            .select(AddressRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(Address::from))
    }
}
