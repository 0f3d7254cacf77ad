//! System settings repository for database operations.

use domain::models::{PaymentInstallments, SettingsError, SystemSettings};
use sqlx::PgPool;
use thiserror::Error;

use crate::entities::SystemSettingsEntity;
use crate::metrics::QueryTimer;

const COLUMNS: &str = "company_name, company_address, company_email, company_phone, tax_id, \
                       currency, default_tax_rate, invoice_prefix, payment_terms_days, \
                       first_rate, second_rate, final_rate, updated_at, updated_by";

/// Failure to persist settings.
#[derive(Debug, Error)]
pub enum SettingsStoreError {
    #[error(transparent)]
    Invalid(#[from] SettingsError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Repository for the settings singleton.
#[derive(Clone)]
pub struct SystemSettingsRepository {
    pool: PgPool,
}

impl SystemSettingsRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Return the settings row, inserting defaults first if it does not exist.
    pub async fn get_or_create(&self) -> Result<SystemSettings, sqlx::Error> {
        let timer = QueryTimer::new("get_or_create_system_settings");
        sqlx::query("INSERT INTO system_settings (id) VALUES (1) ON CONFLICT (id) DO NOTHING")
            .execute(&self.pool)
            .await?;

        let result = sqlx::query_as::<_, SystemSettingsEntity>(&format!(
            "SELECT {} FROM system_settings WHERE id = 1",
            COLUMNS
        ))
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(entity_to_domain(result?))
    }

    /// Persist settings. Refuses installment splits outside the tolerance.
    pub async fn save(&self, settings: &SystemSettings) -> Result<SystemSettings, SettingsStoreError> {
        settings.payment_installments.ensure_storable()?;

        let timer = QueryTimer::new("save_system_settings");
        let result = sqlx::query_as::<_, SystemSettingsEntity>(&format!(
            r#"
            INSERT INTO system_settings (
                id, company_name, company_address, company_email, company_phone, tax_id,
                currency, default_tax_rate, invoice_prefix, payment_terms_days,
                first_rate, second_rate, final_rate, updated_at, updated_by
            )
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                company_name = EXCLUDED.company_name,
                company_address = EXCLUDED.company_address,
                company_email = EXCLUDED.company_email,
                company_phone = EXCLUDED.company_phone,
                tax_id = EXCLUDED.tax_id,
                currency = EXCLUDED.currency,
                default_tax_rate = EXCLUDED.default_tax_rate,
                invoice_prefix = EXCLUDED.invoice_prefix,
                payment_terms_days = EXCLUDED.payment_terms_days,
                first_rate = EXCLUDED.first_rate,
                second_rate = EXCLUDED.second_rate,
                final_rate = EXCLUDED.final_rate,
                updated_at = EXCLUDED.updated_at,
                updated_by = EXCLUDED.updated_by
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&settings.company_name)
        .bind(&settings.company_address)
        .bind(&settings.company_email)
        .bind(&settings.company_phone)
        .bind(&settings.tax_id)
        .bind(&settings.currency)
        .bind(settings.default_tax_rate)
        .bind(&settings.invoice_prefix)
        .bind(settings.payment_terms_days)
        .bind(settings.payment_installments.first_rate)
        .bind(settings.payment_installments.second_rate)
        .bind(settings.payment_installments.final_rate)
        .bind(settings.updated_at)
        .bind(&settings.updated_by)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(entity_to_domain(result?))
    }
}

/// Convert entity to domain model.
fn entity_to_domain(entity: SystemSettingsEntity) -> SystemSettings {
    SystemSettings {
        company_name: entity.company_name,
        company_address: entity.company_address,
        company_email: entity.company_email,
        company_phone: entity.company_phone,
        tax_id: entity.tax_id,
        currency: entity.currency,
        default_tax_rate: entity.default_tax_rate,
        invoice_prefix: entity.invoice_prefix,
        payment_terms_days: entity.payment_terms_days,
        payment_installments: PaymentInstallments {
            first_rate: entity.first_rate,
            second_rate: entity.second_rate,
            final_rate: entity.final_rate,
        },
        updated_at: entity.updated_at,
        updated_by: entity.updated_by,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_entity_to_domain_conversion() {
        let entity = SystemSettingsEntity {
            company_name: "Muster GmbH".to_string(),
            company_address: "Hauptstr. 1, Berlin".to_string(),
            company_email: "info@muster.de".to_string(),
            company_phone: "+49 30 123".to_string(),
            tax_id: "DE123456789".to_string(),
            currency: "EUR".to_string(),
            default_tax_rate: 19.0,
            invoice_prefix: "RE-".to_string(),
            payment_terms_days: 14,
            first_rate: 50.0,
            second_rate: 25.0,
            final_rate: 25.0,
            updated_at: Utc::now(),
            updated_by: Some("u-1".to_string()),
        };

        let settings = entity_to_domain(entity);
        assert_eq!(settings.company_name, "Muster GmbH");
        assert_eq!(settings.payment_installments.first_rate, 50.0);
        assert_eq!(settings.payment_installments.sum(), 100.0);
    }

    #[test]
    fn test_settings_store_error_display() {
        let err = SettingsStoreError::from(SettingsError::InvalidInstallments { sum: 90.0 });
        assert!(err.to_string().contains("100%"));
    }
}
