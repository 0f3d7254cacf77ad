//! Log record repository for database operations.

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::models::{
    Changes, DailyLevelCount, Details, FacetCount, LogField, LogFilter, LogLevel, LogRecord,
    LogSource, NewLogRecord,
};
use domain::services::{LogStore, StoreError};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::LogRecordEntity;
use crate::metrics::QueryTimer;

const COLUMNS: &str = "id, timestamp, level, message, user_id, user_name, module, action, \
                       entity, entity_id, changes, details, source, ip_address";

/// Helper struct for building dynamic WHERE clauses from log filters.
/// Tracks conditions and parameter positions to avoid code duplication.
struct LogFilterBuilder {
    conditions: Vec<String>,
    param_count: i32,
}

impl LogFilterBuilder {
    /// Build filter conditions, numbering parameters from `$1`.
    fn build(filter: &LogFilter) -> Self {
        let mut conditions = Vec::new();
        let mut param_count = 0;

        let mut push = |condition: &str| {
            param_count += 1;
            conditions.push(condition.replace("$?", &format!("${}", param_count)));
        };

        if filter.sources.is_some() {
            push("source = ANY($?)");
        }
        if filter.level.is_some() {
            push("level = $?");
        }
        if filter.user_id.is_some() {
            push("user_id = $?");
        }
        if filter.module.is_some() {
            push("module = $?");
        }
        if filter.action.is_some() {
            push("action = $?");
        }
        if filter.entity.is_some() {
            push("entity = $?");
        }
        if filter.search.is_some() {
            push("message ILIKE $? ESCAPE '\\'");
        }
        if filter.from.is_some() {
            push("timestamp >= $?");
        }
        if filter.to.is_some() {
            push("timestamp <= $?");
        }

        Self {
            conditions,
            param_count,
        }
    }

    /// Get the WHERE clause as a string.
    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            "TRUE".to_string()
        } else {
            self.conditions.join(" AND ")
        }
    }

    /// Get the current parameter count.
    fn param_count(&self) -> i32 {
        self.param_count
    }
}

/// Escape LIKE wildcards so the search term matches literally.
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Macro to bind log filter parameters to a SQLx builder, in the order the
/// filter builder numbered them.
macro_rules! bind_log_filters {
    ($builder:expr, $filter:expr) => {{
        let mut b = $builder;
        if let Some(ref sources) = $filter.sources {
            b = b.bind(
                sources
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect::<Vec<String>>(),
            );
        }
        if let Some(level) = $filter.level {
            b = b.bind(level.as_str());
        }
        if let Some(ref user_id) = $filter.user_id {
            b = b.bind(user_id);
        }
        if let Some(ref module) = $filter.module {
            b = b.bind(module);
        }
        if let Some(ref action) = $filter.action {
            b = b.bind(action);
        }
        if let Some(ref entity) = $filter.entity {
            b = b.bind(entity);
        }
        if let Some(ref search) = $filter.search {
            b = b.bind(like_pattern(search));
        }
        if let Some(ref from) = $filter.from {
            b = b.bind(from);
        }
        if let Some(ref to) = $filter.to {
            b = b.bind(to);
        }
        b
    }};
}

/// Map a driver error onto the storage error taxonomy.
fn store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(e.to_string())
        }
        _ => StoreError::Query(e.to_string()),
    }
}

/// Repository for log record database operations.
#[derive(Clone)]
pub struct LogRecordRepository {
    pool: PgPool,
}

impl LogRecordRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for LogRecordRepository {
    async fn insert(&self, input: NewLogRecord) -> Result<LogRecord, StoreError> {
        let record = input.into_record();
        let changes_json = serde_json::to_value(&record.changes)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let timer = QueryTimer::new("insert_log_record");
        let result = sqlx::query_as::<_, LogRecordEntity>(&format!(
            r#"
            INSERT INTO log_records (
                id, timestamp, level, message, user_id, user_name, module, action,
                entity, entity_id, changes, details, source, ip_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(record.id)
        .bind(record.timestamp)
        .bind(record.level.as_str())
        .bind(&record.message)
        .bind(&record.user_id)
        .bind(&record.user_name)
        .bind(&record.module)
        .bind(&record.action)
        .bind(&record.entity)
        .bind(&record.entity_id)
        .bind(changes_json)
        .bind(JsonValue::Object(record.details.clone()))
        .bind(record.source.as_str())
        .bind(&record.ip_address)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        Ok(entity_to_domain(result.map_err(store_error)?))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LogRecord>, StoreError> {
        let timer = QueryTimer::new("find_log_record_by_id");
        let result = sqlx::query_as::<_, LogRecordEntity>(&format!(
            "SELECT {} FROM log_records WHERE id = $1",
            COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.map(entity_to_domain))
    }

    async fn count(&self, filter: &LogFilter) -> Result<i64, StoreError> {
        let builder = LogFilterBuilder::build(filter);
        let query = format!(
            "SELECT COUNT(*) FROM log_records WHERE {}",
            builder.where_clause()
        );

        let timer = QueryTimer::new("count_log_records");
        let count_builder = bind_log_filters!(sqlx::query_scalar::<_, i64>(&query), filter);
        let result = count_builder.fetch_one(&self.pool).await;
        timer.record();

        result.map_err(store_error)
    }

    async fn list(
        &self,
        filter: &LogFilter,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<LogRecord>, StoreError> {
        let builder = LogFilterBuilder::build(filter);
        let param_count = builder.param_count();

        let paging = match limit {
            Some(_) => format!("LIMIT ${} OFFSET ${}", param_count + 1, param_count + 2),
            None => format!("OFFSET ${}", param_count + 1),
        };
        let query = format!(
            r#"
            SELECT {}
            FROM log_records
            WHERE {}
            ORDER BY timestamp DESC
            {}
            "#,
            COLUMNS,
            builder.where_clause(),
            paging
        );

        let timer = QueryTimer::new("list_log_records");
        let mut list_builder =
            bind_log_filters!(sqlx::query_as::<_, LogRecordEntity>(&query), filter);
        if let Some(limit) = limit {
            list_builder = list_builder.bind(limit);
        }
        let result = list_builder.bind(offset.max(0)).fetch_all(&self.pool).await;
        timer.record();

        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(entity_to_domain)
            .collect())
    }

    async fn delete(&self, filter: &LogFilter) -> Result<u64, StoreError> {
        let builder = LogFilterBuilder::build(filter);
        let query = format!("DELETE FROM log_records WHERE {}", builder.where_clause());

        let timer = QueryTimer::new("delete_log_records");
        let delete_builder = bind_log_filters!(sqlx::query(&query), filter);
        let result = delete_builder.execute(&self.pool).await;
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected())
    }

    async fn distinct_values(&self, field: LogField) -> Result<Vec<String>, StoreError> {
        let column = field.column();
        let query = format!(
            "SELECT DISTINCT {col} FROM log_records WHERE {col} IS NOT NULL ORDER BY {col}",
            col = column
        );

        let timer = QueryTimer::new("distinct_log_values");
        let result = sqlx::query_scalar::<_, String>(&query)
            .fetch_all(&self.pool)
            .await;
        timer.record();

        result.map_err(store_error)
    }

    async fn count_grouped(
        &self,
        filter: &LogFilter,
        field: LogField,
        limit: i64,
    ) -> Result<Vec<FacetCount>, StoreError> {
        let builder = LogFilterBuilder::build(filter);
        let column = field.column();
        let query = format!(
            r#"
            SELECT {col} AS value, COUNT(*) AS count
            FROM log_records
            WHERE {filter} AND {col} IS NOT NULL
            GROUP BY {col}
            ORDER BY count DESC, value ASC
            LIMIT ${limit}
            "#,
            col = column,
            filter = builder.where_clause(),
            limit = builder.param_count() + 1
        );

        let timer = QueryTimer::new("count_log_records_grouped");
        let grouped_builder =
            bind_log_filters!(sqlx::query_as::<_, (String, i64)>(&query), filter);
        let result = grouped_builder.bind(limit).fetch_all(&self.pool).await;
        timer.record();

        Ok(result
            .map_err(store_error)?
            .into_iter()
            .map(|(value, count)| FacetCount { value, count })
            .collect())
    }

    async fn daily_level_counts(
        &self,
        filter: &LogFilter,
    ) -> Result<Vec<DailyLevelCount>, StoreError> {
        let builder = LogFilterBuilder::build(filter);
        let query = format!(
            r#"
            SELECT (timestamp AT TIME ZONE 'UTC')::date AS day, level, COUNT(*) AS count
            FROM log_records
            WHERE {}
            GROUP BY day, level
            ORDER BY day ASC
            "#,
            builder.where_clause()
        );

        let timer = QueryTimer::new("daily_log_level_counts");
        let daily_builder =
            bind_log_filters!(sqlx::query_as::<_, (NaiveDate, String, i64)>(&query), filter);
        let result = daily_builder.fetch_all(&self.pool).await;
        timer.record();

        let rows = result.map_err(store_error)?;
        let mut counts = Vec::with_capacity(rows.len());
        for (date, level, count) in rows {
            match level.parse::<LogLevel>() {
                Ok(level) => counts.push(DailyLevelCount { date, level, count }),
                Err(e) => tracing::warn!(level = %level, error = %e, "Skipping unknown log level"),
            }
        }
        Ok(counts)
    }
}

/// Convert entity to domain model.
fn entity_to_domain(entity: LogRecordEntity) -> LogRecord {
    let level = entity.level.parse::<LogLevel>().unwrap_or(LogLevel::Info);
    let source = entity.source.parse::<LogSource>().unwrap_or_default();

    let changes: Changes = serde_json::from_value(entity.changes).unwrap_or_default();
    let details: Details = match entity.details {
        JsonValue::Object(map) => map,
        _ => Details::new(),
    };

    LogRecord {
        id: entity.id,
        timestamp: entity.timestamp,
        level,
        message: entity.message,
        user_id: entity.user_id,
        user_name: entity.user_name,
        module: entity.module,
        action: entity.action,
        entity: entity.entity,
        entity_id: entity.entity_id,
        changes,
        details,
        source,
        ip_address: entity.ip_address,
    }
}
