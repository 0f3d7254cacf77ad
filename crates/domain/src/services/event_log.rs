//! Event log service.
//!
//! Implements listing, statistics, export and guarded bulk deletion over a
//! pluggable [`LogStore`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use shared::pagination::{PageRequest, Pagination};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    DailyLevelCount, DailyStats, DeleteLogsRequest, FacetCount, FilterOptions, LevelCounts,
    LogField, LogFilter, LogLevel, LogPage, LogRecord, LogStats, NewLogRecord, LogSource,
    SYSTEM_ACTOR,
};
use crate::services::change_diff::{change_record, ChangeContext, Snapshot};
use crate::services::log_export::{self, ExportError, ExportFormat};

/// Default statistics window in days.
pub const DEFAULT_STATS_DAYS: i64 = 30;

/// Upper bound for the statistics window.
pub const MAX_STATS_DAYS: i64 = 365;

/// Number of entries in each top list.
pub const TOP_LIMIT: i64 = 5;

/// Placeholder values that never show up as filter options.
const SENTINEL_VALUES: [&str; 3] = ["", "null", "undefined"];

/// Failure of the underlying store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage query failed: {0}")]
    Query(String),

    #[error("Invalid stored data: {0}")]
    Corrupt(String),
}

/// Storage backend for log records.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append a record.
    async fn insert(&self, input: NewLogRecord) -> Result<LogRecord, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LogRecord>, StoreError>;

    async fn count(&self, filter: &LogFilter) -> Result<i64, StoreError>;

    /// Matching records, newest first. `limit = None` returns the full set.
    async fn list(
        &self,
        filter: &LogFilter,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<LogRecord>, StoreError>;

    /// Remove matching records and return how many were removed.
    async fn delete(&self, filter: &LogFilter) -> Result<u64, StoreError>;

    /// Distinct non-null values of a column, ascending.
    async fn distinct_values(&self, field: LogField) -> Result<Vec<String>, StoreError>;

    /// Matching records grouped by a column, most frequent first.
    async fn count_grouped(
        &self,
        filter: &LogFilter,
        field: LogField,
        limit: i64,
    ) -> Result<Vec<FacetCount>, StoreError>;

    /// Matching records grouped by UTC day and level.
    async fn daily_level_counts(&self, filter: &LogFilter)
        -> Result<Vec<DailyLevelCount>, StoreError>;
}

#[derive(Debug, Error)]
pub enum LogServiceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Deletion of {count} log entries requires confirmation")]
    ConfirmationRequired { count: i64 },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Who triggered an administrative operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub ip_address: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ip_address: None,
        }
    }

    pub fn system() -> Self {
        Self::new(SYSTEM_ACTOR, SYSTEM_ACTOR)
    }

    pub fn with_ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }
}

/// An export ready to be sent as a download.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
    pub count: usize,
}

/// Result of a confirmed bulk delete.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub deleted: u64,
    /// The record documenting the deletion.
    pub audit_record: LogRecord,
}

/// Event log operations on top of a [`LogStore`].
#[derive(Clone)]
pub struct EventLogService {
    store: Arc<dyn LogStore>,
}

impl EventLogService {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Persist a record. Debug records are logged and dropped.
    pub async fn record(&self, input: NewLogRecord) -> Result<Option<LogRecord>, LogServiceError> {
        if input.message.trim().is_empty() {
            return Err(LogServiceError::Validation(
                "A log message is required".to_string(),
            ));
        }

        if !input.level.is_persisted() {
            debug!(
                module = %input.module,
                action = %input.action,
                message = %input.message,
                "Debug event not persisted"
            );
            return Ok(None);
        }

        let record = self.store.insert(input).await?;
        debug!(id = %record.id, source = %record.source, "Log record stored");
        Ok(Some(record))
    }

    /// Diff two snapshots and persist the resulting update record, if any.
    pub async fn record_changes(
        &self,
        ctx: &ChangeContext,
        old: &Snapshot,
        new: &Snapshot,
    ) -> Result<Option<LogRecord>, LogServiceError> {
        match change_record(ctx, old, new) {
            Some(input) => self.record(input).await,
            None => {
                debug!(
                    entity = %ctx.entity_type,
                    entity_id = %ctx.entity_id,
                    "No changes detected, nothing recorded"
                );
                Ok(None)
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Result<LogRecord, LogServiceError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| LogServiceError::NotFound(format!("Log entry {} not found", id)))
    }

    /// One page of matching records plus the known filter values.
    pub async fn list(
        &self,
        filter: &LogFilter,
        page: PageRequest,
    ) -> Result<LogPage, LogServiceError> {
        let total = self.store.count(filter).await?;
        let records = self
            .store
            .list(filter, Some(page.limit), page.offset())
            .await?;
        let filters = self.filter_options().await?;

        Ok(LogPage {
            records,
            pagination: Pagination::new(page, total),
            filters,
        })
    }

    /// Distinct values present in the store, without sentinel placeholders.
    pub async fn filter_options(&self) -> Result<FilterOptions, LogServiceError> {
        Ok(FilterOptions {
            modules: self.known_values(LogField::Module).await?,
            actions: self.known_values(LogField::Action).await?,
            entities: self.known_values(LogField::Entity).await?,
            sources: self.known_values(LogField::Source).await?,
        })
    }

    async fn known_values(&self, field: LogField) -> Result<Vec<String>, LogServiceError> {
        let mut values: Vec<String> = self
            .store
            .distinct_values(field)
            .await?
            .into_iter()
            .filter(|v| !SENTINEL_VALUES.contains(&v.as_str()))
            .collect();
        values.sort();
        values.dedup();
        Ok(values)
    }

    /// Aggregates over the business events of the trailing `days` days.
    ///
    /// The window starts at midnight UTC `days - 1` days before `now`, so the
    /// daily series has exactly `days` entries ending today. `days` must lie in
    /// `1..=MAX_STATS_DAYS`.
    pub async fn stats(&self, days: i64, now: DateTime<Utc>) -> Result<LogStats, LogServiceError> {
        if !(1..=MAX_STATS_DAYS).contains(&days) {
            return Err(LogServiceError::Validation(format!(
                "days must be between 1 and {} (got {})",
                MAX_STATS_DAYS, days
            )));
        }
        let first_day = now.date_naive() - Duration::days(days - 1);
        let since = first_day.and_time(chrono::NaiveTime::MIN).and_utc();

        let filter = LogFilter {
            from: Some(since),
            ..LogFilter::business_events()
        };

        let mut level_counts = LevelCounts::default();
        for facet in self
            .store
            .count_grouped(&filter, LogField::Level, LogLevel::ALL.len() as i64)
            .await?
        {
            match facet.value.parse::<LogLevel>() {
                Ok(level) => level_counts.add(level, facet.count),
                Err(e) => warn!(value = %facet.value, error = %e, "Skipping unknown level"),
            }
        }

        let daily = zero_filled_series(
            first_day,
            days,
            &self.store.daily_level_counts(&filter).await?,
        );

        let top_modules = self
            .store
            .count_grouped(&filter, LogField::Module, TOP_LIMIT)
            .await?;
        let top_actions = self
            .store
            .count_grouped(&filter, LogField::Action, TOP_LIMIT)
            .await?;

        let error_filter = LogFilter {
            level: Some(LogLevel::Error),
            ..filter.clone()
        };
        let top_errors = self
            .store
            .count_grouped(&error_filter, LogField::Message, TOP_LIMIT)
            .await?;

        Ok(LogStats {
            period_days: days,
            since,
            level_counts,
            daily,
            top_modules,
            top_actions,
            top_errors,
        })
    }

    /// The full matching set rendered in the requested format.
    pub async fn export(
        &self,
        filter: &LogFilter,
        format: ExportFormat,
        now: DateTime<Utc>,
    ) -> Result<ExportFile, LogServiceError> {
        let records = self.store.list(filter, None, 0).await?;

        let body = match format {
            ExportFormat::Csv => log_export::to_csv(&records)?,
            ExportFormat::Json => log_export::to_json(&records, filter, now)?,
        };

        info!(count = records.len(), format = format.extension(), "Event log exported");

        Ok(ExportFile {
            filename: log_export::export_filename(format, now.date_naive()),
            content_type: format.content_type(),
            body,
            count: records.len(),
        })
    }

    /// Two-phase bulk delete.
    ///
    /// Requires a date range. Without the literal confirmation the matching count
    /// is reported through [`LogServiceError::ConfirmationRequired`] and nothing is
    /// removed. A confirmed delete appends one record describing itself.
    pub async fn delete(
        &self,
        request: &DeleteLogsRequest,
        actor: &Actor,
    ) -> Result<DeleteOutcome, LogServiceError> {
        if !request.has_date_range() {
            return Err(LogServiceError::Validation(
                "A date range (startDate or endDate) is required to delete log entries".to_string(),
            ));
        }
        let filter = request.to_filter().map_err(LogServiceError::Validation)?;

        let count = self.store.count(&filter).await?;
        if count == 0 {
            return Err(LogServiceError::NotFound(
                "No log entries match the given filter".to_string(),
            ));
        }

        if !request.is_confirmed() {
            return Err(LogServiceError::ConfirmationRequired { count });
        }

        let deleted = self.store.delete(&filter).await?;
        warn!(deleted, user_id = %actor.id, "Log entries deleted");

        let filter_json = serde_json::to_value(&filter).unwrap_or(serde_json::Value::Null);
        let audit = NewLogRecord::new(
            LogLevel::Warning,
            format!("{} Log-Einträge gelöscht", deleted),
        )
        .with_actor(actor.id.clone(), actor.name.clone())
        .with_module("system")
        .with_action("delete")
        .on_entity("logs", None)
        .with_source(LogSource::AdminAction)
        .with_ip_address(actor.ip_address.clone())
        .add_detail("filter", filter_json)
        .add_detail("deletedCount", serde_json::json!(deleted));

        let audit_record = self.store.insert(audit).await?;

        Ok(DeleteOutcome {
            deleted,
            audit_record,
        })
    }
}

/// One entry per day from `first_day`, with missing days and levels at zero.
fn zero_filled_series(
    first_day: NaiveDate,
    days: i64,
    counts: &[DailyLevelCount],
) -> Vec<DailyStats> {
    let mut by_day: BTreeMap<NaiveDate, LevelCounts> = (0..days)
        .map(|offset| (first_day + Duration::days(offset), LevelCounts::default()))
        .collect();

    for entry in counts {
        if let Some(bucket) = by_day.get_mut(&entry.date) {
            bucket.add(entry.level, entry.count);
        }
    }

    by_day
        .into_iter()
        .map(|(date, counts)| DailyStats { date, counts })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory_store::InMemoryLogStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn service() -> (EventLogService, Arc<InMemoryLogStore>) {
        let store = Arc::new(InMemoryLogStore::new());
        (EventLogService::new(store.clone()), store)
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn event(level: LogLevel, source: LogSource, module: &str, ts: DateTime<Utc>) -> NewLogRecord {
        NewLogRecord::new(level, format!("{} event", module))
            .with_module(module)
            .with_action("create")
            .with_source(source)
            .at(ts)
    }

    fn delete_request(start: Option<&str>, confirm: Option<&str>) -> DeleteLogsRequest {
        DeleteLogsRequest {
            start_date: start.map(String::from),
            end_date: Some("2026-03-31".to_string()),
            confirm: confirm.map(|c| json!(c)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_debug_records_are_not_persisted() {
        let (service, store) = service();

        let result = service
            .record(NewLogRecord::new(LogLevel::Debug, "noise"))
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_record_persists_info() {
        let (service, store) = service();

        let record = service
            .record(NewLogRecord::new(LogLevel::Info, "Kunde angelegt"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(service.get(record.id).await.unwrap(), record);
    }

    #[tokio::test]
    async fn test_record_rejects_blank_message() {
        let (service, store) = service();

        let result = service.record(NewLogRecord::new(LogLevel::Info, "  ")).await;

        assert!(matches!(result, Err(LogServiceError::Validation(_))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let (service, _) = service();
        let result = service.get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(LogServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_record_changes_write_through() {
        let (service, store) = service();
        let ctx = ChangeContext::new("customer", "c-1", "Kunde Muster");
        let old = json!({"name": "Muster"}).as_object().cloned().unwrap();
        let new = json!({"name": "Muster AG"}).as_object().cloned().unwrap();

        assert!(service.record_changes(&ctx, &old, &old).await.unwrap().is_none());
        assert_eq!(store.len().await, 0);

        let record = service.record_changes(&ctx, &old, &new).await.unwrap().unwrap();
        assert_eq!(record.module, "customers");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_default_excludes_api_traffic() {
        let (service, _) = service();
        for source in [LogSource::ApiRequest, LogSource::ApiResponse, LogSource::BusinessEvent] {
            service
                .record(event(LogLevel::Info, source, "orders", at(10, 9)))
                .await
                .unwrap();
        }

        let filter = LogFilter::business_events();
        let page = service.list(&filter, PageRequest::new(None, None)).await.unwrap();

        assert_eq!(page.pagination.total, 1);
        assert!(page
            .records
            .iter()
            .all(|r| r.source != LogSource::ApiRequest && r.source != LogSource::ApiResponse));
        assert_eq!(page.filters.sources.len(), 3);
    }

    #[tokio::test]
    async fn test_list_paginates_newest_first() {
        let (service, _) = service();
        for hour in 0..5 {
            service
                .record(event(LogLevel::Info, LogSource::BusinessEvent, "orders", at(10, hour)))
                .await
                .unwrap();
        }

        let page = service
            .list(&LogFilter::default(), PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();

        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.total_pages, 3);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].timestamp, at(10, 2));
        assert_eq!(page.records[1].timestamp, at(10, 1));
    }

    #[tokio::test]
    async fn test_filter_options_skip_sentinels() {
        let (service, _) = service();
        for module in ["orders", "null", "undefined", "customers"] {
            service
                .record(event(LogLevel::Info, LogSource::BusinessEvent, module, at(10, 9)))
                .await
                .unwrap();
        }

        let options = service.filter_options().await.unwrap();
        assert_eq!(options.modules, vec!["customers", "orders"]);
        assert!(options.entities.is_empty());
    }

    #[tokio::test]
    async fn test_stats_zero_filled_and_ranked() {
        let (service, _) = service();
        let now = at(10, 12);

        service.record(event(LogLevel::Info, LogSource::BusinessEvent, "orders", at(10, 8))).await.unwrap();
        service.record(event(LogLevel::Info, LogSource::BusinessEvent, "orders", at(8, 8))).await.unwrap();
        service.record(event(LogLevel::Error, LogSource::DataOperation, "invoices", at(8, 9))).await.unwrap();
        service.record(event(LogLevel::Error, LogSource::DataOperation, "invoices", at(9, 9))).await.unwrap();
        // outside the family and outside the window
        service.record(event(LogLevel::Error, LogSource::ApiResponse, "http", at(10, 9))).await.unwrap();
        service.record(event(LogLevel::Info, LogSource::BusinessEvent, "orders", at(1, 9))).await.unwrap();

        let stats = service.stats(7, now).await.unwrap();

        assert_eq!(stats.period_days, 7);
        assert_eq!(stats.since, at(4, 0));
        assert_eq!(stats.level_counts, LevelCounts { info: 2, warning: 0, error: 2, debug: 0 });
        assert_eq!(stats.daily.len(), 7);
        assert_eq!(stats.daily[0].date, NaiveDate::from_ymd_opt(2026, 3, 4).unwrap());
        assert_eq!(stats.daily[6].date, NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
        assert_eq!(stats.daily[4].counts.error, 1);
        assert_eq!(stats.daily[4].counts.info, 1);
        assert_eq!(stats.daily[0].counts.total(), 0);

        assert_eq!(stats.top_modules.len(), 2);
        assert_eq!(stats.top_modules[0].count, 2);
        assert_eq!(
            stats.top_errors,
            vec![FacetCount { value: "invoices event".to_string(), count: 2 }]
        );
    }

    #[tokio::test]
    async fn test_stats_days_out_of_range_are_rejected() {
        let (service, _) = service();

        for days in [0, -3, MAX_STATS_DAYS + 1, 400] {
            let result = service.stats(days, at(10, 12)).await;
            assert!(matches!(result, Err(LogServiceError::Validation(_))), "days={}", days);
        }

        let stats = service.stats(1, at(10, 12)).await.unwrap();
        assert_eq!(stats.daily.len(), 1);
        let stats = service.stats(MAX_STATS_DAYS, at(10, 12)).await.unwrap();
        assert_eq!(stats.daily.len(), MAX_STATS_DAYS as usize);
    }

    #[tokio::test]
    async fn test_export_csv_is_unpaginated() {
        let (service, _) = service();
        for i in 0..150 {
            service
                .record(event(LogLevel::Info, LogSource::BusinessEvent, "orders", at(10, 0) + Duration::seconds(i)))
                .await
                .unwrap();
        }

        let file = service
            .export(&LogFilter::business_events(), ExportFormat::Csv, at(11, 0))
            .await
            .unwrap();

        assert_eq!(file.count, 150);
        assert_eq!(file.filename, "systemlogs_2026-03-11.csv");
        assert_eq!(file.body.lines().count(), 151);
    }

    #[tokio::test]
    async fn test_delete_requires_date_range() {
        let (service, store) = service();
        service.record(event(LogLevel::Info, LogSource::BusinessEvent, "orders", at(10, 9))).await.unwrap();

        let request = DeleteLogsRequest {
            module: Some("orders".to_string()),
            confirm: Some(json!("true")),
            ..Default::default()
        };
        let result = service.delete(&request, &Actor::system()).await;

        assert!(matches!(result, Err(LogServiceError::Validation(_))));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_without_matches_is_not_found() {
        let (service, _) = service();
        let result = service
            .delete(&delete_request(Some("2026-03-01"), Some("true")), &Actor::system())
            .await;
        assert!(matches!(result, Err(LogServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_without_confirmation_reports_count() {
        let (service, store) = service();
        for day in [5, 6] {
            service.record(event(LogLevel::Info, LogSource::BusinessEvent, "orders", at(day, 9))).await.unwrap();
        }

        for confirm in [None, Some("false"), Some("TRUE")] {
            let result = service
                .delete(&delete_request(Some("2026-03-01"), confirm), &Actor::system())
                .await;
            assert!(matches!(result, Err(LogServiceError::ConfirmationRequired { count: 2 })));
        }
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_confirmed_delete_appends_one_audit_record() {
        let (service, store) = service();
        service.record(event(LogLevel::Info, LogSource::BusinessEvent, "orders", at(5, 9))).await.unwrap();
        service.record(event(LogLevel::Info, LogSource::ApiRequest, "http", at(6, 9))).await.unwrap();
        service.record(event(LogLevel::Info, LogSource::BusinessEvent, "orders", at(20, 9))).await.unwrap();

        let actor = Actor::new("u-admin", "Admin").with_ip_address(Some("10.0.0.5".to_string()));
        let request = DeleteLogsRequest {
            start_date: Some("2026-03-01".to_string()),
            end_date: Some("2026-03-10".to_string()),
            confirm: Some(json!("true")),
            ..Default::default()
        };
        let outcome = service.delete(&request, &actor).await.unwrap();

        assert_eq!(outcome.deleted, 2);
        assert_eq!(store.len().await, 2);

        let audit = outcome.audit_record;
        assert_eq!(audit.level, LogLevel::Warning);
        assert_eq!(audit.source, LogSource::AdminAction);
        assert_eq!(audit.module, "system");
        assert_eq!(audit.action, "delete");
        assert_eq!(audit.entity.as_deref(), Some("logs"));
        assert_eq!(audit.user_id, "u-admin");
        assert_eq!(audit.details["deletedCount"], 2);
        assert!(audit.details["filter"]["from"].is_string());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_storage_error() {
        let service = EventLogService::new(Arc::new(InMemoryLogStore::failing()));
        let result = service.record(NewLogRecord::new(LogLevel::Info, "x")).await;
        assert!(matches!(result, Err(LogServiceError::Storage(_))));
    }
}
