//! Domain models for the ERP back end.

pub mod line_item;
pub mod log_record;
pub mod system_settings;

pub use line_item::{order_total, round_cents, InvoiceTotals, LineItem};
pub use log_record::*;
pub use system_settings::{
    PaymentInstallments, SettingsError, SystemSettings, UpdateSettingsRequest,
};
