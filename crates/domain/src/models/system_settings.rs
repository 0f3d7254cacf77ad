//! System settings domain models.
//!
//! A single settings document holds company, currency, tax and billing
//! configuration for the whole installation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use validator::Validate;

use crate::services::change_diff::Snapshot;

/// Allowed deviation of the installment sum from 100 percent.
pub const INSTALLMENT_TOLERANCE: f64 = 0.01;

/// Absorbs binary rounding of decimal rates such as `33.33 * 3`.
const FLOAT_SLACK: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Payment installments must add up to 100% (currently {sum}%)")]
    InvalidInstallments { sum: f64 },
}

/// Three-way split of an invoice amount, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstallments {
    pub first_rate: f64,
    pub second_rate: f64,
    pub final_rate: f64,
}

impl Default for PaymentInstallments {
    fn default() -> Self {
        Self {
            first_rate: 30.0,
            second_rate: 40.0,
            final_rate: 30.0,
        }
    }
}

impl PaymentInstallments {
    pub fn sum(&self) -> f64 {
        self.first_rate + self.second_rate + self.final_rate
    }

    /// Request-level check: the sum must lie within the tolerance around 100.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let sum = self.sum();
        if (sum - 100.0).abs() > INSTALLMENT_TOLERANCE + FLOAT_SLACK {
            return Err(SettingsError::InvalidInstallments {
                sum: round_hundredths(sum),
            });
        }
        Ok(())
    }

    /// Storage-level check: the tolerance holds and the rounded sum is exactly 100.
    pub fn ensure_storable(&self) -> Result<(), SettingsError> {
        self.validate()?;
        let sum = self.sum();
        if sum.round() != 100.0 {
            return Err(SettingsError::InvalidInstallments {
                sum: round_hundredths(sum),
            });
        }
        Ok(())
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The settings singleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub company_name: String,
    pub company_address: String,
    pub company_email: String,
    pub company_phone: String,
    pub tax_id: String,
    pub currency: String,
    pub default_tax_rate: f64,
    pub invoice_prefix: String,
    pub payment_terms_days: i32,
    pub payment_installments: PaymentInstallments,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<String>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            company_address: String::new(),
            company_email: String::new(),
            company_phone: String::new(),
            tax_id: String::new(),
            currency: "EUR".to_string(),
            default_tax_rate: 19.0,
            invoice_prefix: "RE-".to_string(),
            payment_terms_days: 14,
            payment_installments: PaymentInstallments::default(),
            updated_at: Utc::now(),
            updated_by: None,
        }
    }
}

impl SystemSettings {
    /// Merge an update into a copy of these settings.
    ///
    /// The installment split of the merged result is validated before it is returned.
    pub fn apply(
        &self,
        update: &UpdateSettingsRequest,
        updated_by: &str,
    ) -> Result<SystemSettings, SettingsError> {
        let mut merged = self.clone();

        if let Some(ref v) = update.company_name {
            merged.company_name = v.clone();
        }
        if let Some(ref v) = update.company_address {
            merged.company_address = v.clone();
        }
        if let Some(ref v) = update.company_email {
            merged.company_email = v.clone();
        }
        if let Some(ref v) = update.company_phone {
            merged.company_phone = v.clone();
        }
        if let Some(ref v) = update.tax_id {
            merged.tax_id = v.clone();
        }
        if let Some(ref v) = update.currency {
            merged.currency = v.to_uppercase();
        }
        if let Some(v) = update.default_tax_rate {
            merged.default_tax_rate = v;
        }
        if let Some(ref v) = update.invoice_prefix {
            merged.invoice_prefix = v.clone();
        }
        if let Some(v) = update.payment_terms_days {
            merged.payment_terms_days = v;
        }
        if let Some(v) = update.payment_installments {
            merged.payment_installments = v;
        }

        merged.payment_installments.validate()?;
        merged.updated_at = Utc::now();
        merged.updated_by = Some(updated_by.to_string());
        Ok(merged)
    }

    /// Field snapshot used for change tracking.
    pub fn snapshot(&self) -> Snapshot {
        match serde_json::to_value(self) {
            Ok(JsonValue::Object(map)) => map,
            _ => Snapshot::new(),
        }
    }
}

/// PUT request to update system settings. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[validate(length(max = 255, message = "Company name must be at most 255 characters"))]
    pub company_name: Option<String>,
    #[validate(length(max = 1000, message = "Company address must be at most 1000 characters"))]
    pub company_address: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub company_email: Option<String>,
    #[validate(length(max = 50, message = "Phone number must be at most 50 characters"))]
    pub company_phone: Option<String>,
    #[validate(length(max = 50, message = "Tax id must be at most 50 characters"))]
    pub tax_id: Option<String>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter ISO code"))]
    pub currency: Option<String>,
    #[validate(range(min = 0.0, max = 100.0, message = "Tax rate must be between 0 and 100"))]
    pub default_tax_rate: Option<f64>,
    #[validate(length(max = 20, message = "Invoice prefix must be at most 20 characters"))]
    pub invoice_prefix: Option<String>,
    #[validate(range(min = 0, max = 365, message = "Payment terms must be between 0 and 365 days"))]
    pub payment_terms_days: Option<i32>,
    pub payment_installments: Option<PaymentInstallments>,
}
