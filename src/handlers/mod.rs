pub mod admin;
pub mod coupons;
pub mod dto;
pub mod health;
pub mod identity;
pub mod orders;
pub mod payment;
pub mod webhooks;
