//! HTTP request handlers, grouped by resource.

pub mod account;
pub mod auth;
pub mod confirmation;
pub mod password_reset;
pub mod registration;
pub mod sessions;
