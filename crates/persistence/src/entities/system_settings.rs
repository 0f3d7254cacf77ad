//! System settings entity.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database entity for the settings singleton row.
#[derive(Debug, Clone, FromRow)]
pub struct SystemSettingsEntity {
    pub company_name: String,
    pub company_address: String,
    pub company_email: String,
    pub company_phone: String,
    pub tax_id: String,
    pub currency: String,
    pub default_tax_rate: f64,
    pub invoice_prefix: String,
    pub payment_terms_days: i32,
    pub first_rate: f64,
    pub second_rate: f64,
    pub final_rate: f64,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}
