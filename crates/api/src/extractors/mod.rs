//! Custom Axum extractors.

pub mod client_ip;
pub mod user_auth;

pub use client_ip::{client_ip, ClientIp};
