pub mod assets;
pub mod catalog_repo;
pub mod coupon_repo;
pub mod gateway;
pub mod models;
pub mod order_repo;

#[cfg(test)]
pub(crate) mod test_db;
