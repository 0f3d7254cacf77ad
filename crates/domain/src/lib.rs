//! Domain layer for the ERP back end.
//!
//! This crate contains:
//! - Event log models, filters and statistics types
//! - System settings and line-item totals
//! - Change tracking, readable rendering and export of log records
//! - The event log service and its storage abstraction

pub mod models;
pub mod services;
