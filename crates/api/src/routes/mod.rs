//! HTTP route handlers.

pub mod health;
pub mod log_files;
pub mod logs;
pub mod settings;
