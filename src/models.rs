pub mod auth;
pub mod catalog;
pub mod customers;
pub mod entitlement;
pub mod finance;
pub mod goals;
pub mod menu;
pub mod permission;
pub mod rbac;
pub mod restaurant;
pub mod stock;
