//! Repository implementations for database operations.

pub mod log_record;
pub mod system_settings;

pub use log_record::LogRecordRepository;
pub use system_settings::{SettingsStoreError, SystemSettingsRepository};
