//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod log_record;
pub mod system_settings;

pub use log_record::LogRecordEntity;
pub use system_settings::SystemSettingsEntity;
