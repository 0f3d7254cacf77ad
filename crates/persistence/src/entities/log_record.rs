//! Log record entity.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for event log records.
#[derive(Debug, Clone, FromRow)]
pub struct LogRecordEntity {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// One of info, warning, error.
    pub level: String,
    pub message: String,
    pub user_id: String,
    pub user_name: String,
    pub module: String,
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    /// Field name to `{old, new}` pair.
    pub changes: JsonValue,
    pub details: JsonValue,
    pub source: String,
    pub ip_address: Option<String>,
}
