pub mod auth;
pub mod customers;
pub mod finance;
pub mod goals;
pub mod iam;
pub mod menu;
pub mod restaurants;
pub mod stock;
