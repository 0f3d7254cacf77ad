//! Shared utilities and common types for the ERP backend.
//!
//! This crate provides common functionality used across all other crates:
//! - JWT token issuance and validation
//! - Masking of sensitive request fields
//! - Page-number pagination

pub mod jwt;
pub mod masking;
pub mod pagination;
