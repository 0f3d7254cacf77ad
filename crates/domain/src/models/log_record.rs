//! Event log domain models.
//!
//! A `LogRecord` is an immutable entry of the event log store. Records carry a
//! closed set of categorical dimensions (level, source, module, action, entity)
//! and two free-form JSON payloads: `changes` (field-level diff) and `details`.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use shared::pagination::Pagination;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Actor name and id used when no authenticated user is involved.
pub const SYSTEM_ACTOR: &str = "System";

/// Default for `module` and `action`.
pub const GENERAL: &str = "general";

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    /// All levels in their fixed reporting order.
    pub const ALL: [LogLevel; 4] = [
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
        }
    }

    /// Debug records are operational noise and never reach the store.
    pub fn is_persisted(&self) -> bool {
        *self != LogLevel::Debug
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin category of a log record.
///
/// Separates business history (`business_event`, `data_operation`, ...) from
/// transport-layer traffic (`api_request`, `api_response`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    #[default]
    BusinessEvent,
    UserAction,
    DataOperation,
    AdminAction,
    SystemStartup,
    SystemMaintenance,
    ApiRequest,
    ApiResponse,
    SystemError,
    SecurityEvent,
    StatusChange,
    Payment,
    Authorization,
    Authentication,
    Assignment,
    Export,
}

impl LogSource {
    /// Sources shown by default in listings and statistics.
    pub const BUSINESS_FAMILY: [LogSource; 6] = [
        LogSource::BusinessEvent,
        LogSource::UserAction,
        LogSource::DataOperation,
        LogSource::AdminAction,
        LogSource::SystemStartup,
        LogSource::SystemMaintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogSource::BusinessEvent => "business_event",
            LogSource::UserAction => "user_action",
            LogSource::DataOperation => "data_operation",
            LogSource::AdminAction => "admin_action",
            LogSource::SystemStartup => "system_startup",
            LogSource::SystemMaintenance => "system_maintenance",
            LogSource::ApiRequest => "api_request",
            LogSource::ApiResponse => "api_response",
            LogSource::SystemError => "system_error",
            LogSource::SecurityEvent => "security_event",
            LogSource::StatusChange => "status_change",
            LogSource::Payment => "payment",
            LogSource::Authorization => "authorization",
            LogSource::Authentication => "authentication",
            LogSource::Assignment => "assignment",
            LogSource::Export => "export",
        }
    }

    pub fn is_business_event(&self) -> bool {
        Self::BUSINESS_FAMILY.contains(self)
    }
}

impl FromStr for LogSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business_event" => Ok(LogSource::BusinessEvent),
            "user_action" => Ok(LogSource::UserAction),
            "data_operation" => Ok(LogSource::DataOperation),
            "admin_action" => Ok(LogSource::AdminAction),
            "system_startup" => Ok(LogSource::SystemStartup),
            "system_maintenance" => Ok(LogSource::SystemMaintenance),
            "api_request" => Ok(LogSource::ApiRequest),
            "api_response" => Ok(LogSource::ApiResponse),
            "system_error" => Ok(LogSource::SystemError),
            "security_event" => Ok(LogSource::SecurityEvent),
            "status_change" => Ok(LogSource::StatusChange),
            "payment" => Ok(LogSource::Payment),
            "authorization" => Ok(LogSource::Authorization),
            "authentication" => Ok(LogSource::Authentication),
            "assignment" => Ok(LogSource::Assignment),
            "export" => Ok(LogSource::Export),
            _ => Err(format!("Unknown log source: {}", s)),
        }
    }
}

impl std::fmt::Display for LogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Old/new pair for a single changed field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: JsonValue,
    pub new: JsonValue,
}

impl FieldChange {
    pub fn new(old: JsonValue, new: JsonValue) -> Self {
        Self { old, new }
    }
}

/// Field name to old/new pair, ordered by field name.
pub type Changes = BTreeMap<String, FieldChange>;

/// Free-form context attached to a record.
pub type Details = JsonMap<String, JsonValue>;

/// A stored event log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub user_id: String,
    pub user_name: String,
    pub module: String,
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    #[serde(default)]
    pub changes: Changes,
    #[serde(default)]
    pub details: Details,
    pub source: LogSource,
    pub ip_address: Option<String>,
}

/// Input for appending a record to the event log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogRecord {
    pub timestamp: Option<DateTime<Utc>>,
    pub level: LogLevel,
    pub message: String,
    pub user_id: String,
    pub user_name: String,
    pub module: String,
    pub action: String,
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    pub changes: Changes,
    pub details: Details,
    pub source: LogSource,
    pub ip_address: Option<String>,
}

impl NewLogRecord {
    /// Create a record attributed to the system with default dimensions.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            level,
            message: message.into(),
            user_id: SYSTEM_ACTOR.to_string(),
            user_name: SYSTEM_ACTOR.to_string(),
            module: GENERAL.to_string(),
            action: GENERAL.to_string(),
            entity: None,
            entity_id: None,
            changes: Changes::new(),
            details: Details::new(),
            source: LogSource::default(),
            ip_address: None,
        }
    }

    pub fn with_actor(mut self, user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self.user_name = user_name.into();
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    pub fn on_entity(mut self, entity: impl Into<String>, entity_id: Option<String>) -> Self {
        self.entity = Some(entity.into());
        self.entity_id = entity_id;
        self
    }

    pub fn with_changes(mut self, changes: Changes) -> Self {
        self.changes = changes;
        self
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    /// Add a single detail entry.
    pub fn add_detail(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_source(mut self, source: LogSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_ip_address(mut self, ip_address: Option<String>) -> Self {
        self.ip_address = ip_address;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Materialize the record with a fresh id.
    pub fn into_record(self) -> LogRecord {
        LogRecord {
            id: Uuid::new_v4(),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            level: self.level,
            message: self.message,
            user_id: self.user_id,
            user_name: self.user_name,
            module: self.module,
            action: self.action,
            entity: self.entity,
            entity_id: self.entity_id,
            changes: self.changes,
            details: self.details,
            source: self.source,
            ip_address: self.ip_address,
        }
    }
}

/// Columns that can be grouped or enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogField {
    Level,
    Module,
    Action,
    Entity,
    Source,
    Message,
}

impl LogField {
    /// Column name in the store.
    pub fn column(&self) -> &'static str {
        match self {
            LogField::Level => "level",
            LogField::Module => "module",
            LogField::Action => "action",
            LogField::Entity => "entity",
            LogField::Source => "source",
            LogField::Message => "message",
        }
    }

    /// Value of this field on a record.
    pub fn value_of<'a>(&self, record: &'a LogRecord) -> Option<&'a str> {
        match self {
            LogField::Level => Some(record.level.as_str()),
            LogField::Module => Some(record.module.as_str()),
            LogField::Action => Some(record.action.as_str()),
            LogField::Entity => record.entity.as_deref(),
            LogField::Source => Some(record.source.as_str()),
            LogField::Message => Some(record.message.as_str()),
        }
    }
}

/// Filter over the event log. Every set dimension must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    /// Accepted sources; `None` accepts every source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<LogSource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Case-insensitive substring of the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

impl LogFilter {
    /// Filter restricted to the business-event family.
    pub fn business_events() -> Self {
        Self {
            sources: Some(LogSource::BUSINESS_FAMILY.to_vec()),
            ..Default::default()
        }
    }

    pub fn has_time_range(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// Evaluate the filter against a record.
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(ref sources) = self.sources {
            if !sources.contains(&record.source) {
                return false;
            }
        }
        if self.level.is_some_and(|level| level != record.level) {
            return false;
        }
        if self.user_id.as_ref().is_some_and(|u| *u != record.user_id) {
            return false;
        }
        if self.module.as_ref().is_some_and(|m| *m != record.module) {
            return false;
        }
        if self.action.as_ref().is_some_and(|a| *a != record.action) {
            return false;
        }
        if let Some(ref entity) = self.entity {
            if record.entity.as_deref() != Some(entity.as_str()) {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            if !record
                .message
                .to_lowercase()
                .contains(&search.to_lowercase())
            {
                return false;
            }
        }
        if self.from.is_some_and(|from| record.timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| record.timestamp > to) {
            return false;
        }
        true
    }
}

/// Which end of a range a date-only value denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Start,
    End,
}

/// Parse an RFC 3339 instant or a `YYYY-MM-DD` date.
///
/// A date-only start begins at midnight UTC; a date-only end covers the whole day.
pub fn parse_date_bound(value: &str, bound: RangeBound) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date: {}", value))?;
    let time = match bound {
        RangeBound::Start => NaiveTime::MIN,
        RangeBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
    };
    Ok(Utc.from_utc_datetime(&date.and_time(time)))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn parse_source_param(value: &Option<String>) -> Result<Option<Vec<LogSource>>, String> {
    match non_empty(value) {
        None => Ok(Some(LogSource::BUSINESS_FAMILY.to_vec())),
        Some(s) if s == "all" => Ok(None),
        Some(s) => Ok(Some(vec![s.parse::<LogSource>()?])),
    }
}

/// Query parameters for listing event logs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLogsQuery {
    pub source: Option<String>,
    pub level: Option<String>,
    pub user: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub module: Option<String>,
    pub action: Option<String>,
    pub entity: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListLogsQuery {
    /// Build the store filter.
    ///
    /// Without an explicit `source` the filter is restricted to the business-event
    /// family; `source=all` lifts the restriction.
    pub fn to_filter(&self) -> Result<LogFilter, String> {
        Ok(LogFilter {
            sources: parse_source_param(&self.source)?,
            level: non_empty(&self.level).map(|l| l.parse()).transpose()?,
            user_id: non_empty(&self.user),
            module: non_empty(&self.module),
            action: non_empty(&self.action),
            entity: non_empty(&self.entity),
            search: non_empty(&self.search),
            from: non_empty(&self.start_date)
                .map(|d| parse_date_bound(&d, RangeBound::Start))
                .transpose()?,
            to: non_empty(&self.end_date)
                .map(|d| parse_date_bound(&d, RangeBound::End))
                .transpose()?,
        })
    }
}

/// Query parameters for exporting event logs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportLogsQuery {
    pub format: Option<String>,
    pub source: Option<String>,
    pub level: Option<String>,
    pub user: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub module: Option<String>,
    pub action: Option<String>,
    pub entity: Option<String>,
    pub search: Option<String>,
}

impl ExportLogsQuery {
    /// Convert to list query for reuse of the filter rules.
    pub fn to_list_query(&self) -> ListLogsQuery {
        ListLogsQuery {
            source: self.source.clone(),
            level: self.level.clone(),
            user: self.user.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            module: self.module.clone(),
            action: self.action.clone(),
            entity: self.entity.clone(),
            search: self.search.clone(),
            page: None,
            limit: None,
        }
    }
}

/// Body of a bulk delete request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLogsRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub level: Option<String>,
    pub user: Option<String>,
    pub module: Option<String>,
    pub source: Option<String>,
    /// Must be the literal string `"true"` to execute.
    pub confirm: Option<JsonValue>,
}

impl DeleteLogsRequest {
    pub fn has_date_range(&self) -> bool {
        non_empty(&self.start_date).is_some() || non_empty(&self.end_date).is_some()
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.confirm, Some(JsonValue::String(ref s)) if s == "true")
    }

    /// Build the store filter. Unlike listings, no source restriction applies
    /// unless one is given.
    pub fn to_filter(&self) -> Result<LogFilter, String> {
        Ok(LogFilter {
            sources: non_empty(&self.source)
                .map(|s| s.parse::<LogSource>().map(|s| vec![s]))
                .transpose()?,
            level: non_empty(&self.level).map(|l| l.parse()).transpose()?,
            user_id: non_empty(&self.user),
            module: non_empty(&self.module),
            from: non_empty(&self.start_date)
                .map(|d| parse_date_bound(&d, RangeBound::Start))
                .transpose()?,
            to: non_empty(&self.end_date)
                .map(|d| parse_date_bound(&d, RangeBound::End))
                .transpose()?,
            ..Default::default()
        })
    }
}

/// Body of a manual log creation request.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    pub level: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1 and 2000 characters"))]
    pub message: String,
    #[validate(length(max = 100, message = "Module must be at most 100 characters"))]
    pub module: Option<String>,
    #[validate(length(max = 100, message = "Action must be at most 100 characters"))]
    pub action: Option<String>,
    #[validate(length(max = 100, message = "Entity must be at most 100 characters"))]
    pub entity: Option<String>,
    pub entity_id: Option<String>,
    #[serde(default)]
    pub changes: Changes,
    #[serde(default)]
    pub details: Details,
    pub source: Option<String>,
}

impl CreateLogRequest {
    /// Build the record input. Level defaults to `info`, source to `business_event`.
    pub fn to_new_record(&self) -> Result<NewLogRecord, String> {
        let level = non_empty(&self.level)
            .map(|l| l.parse::<LogLevel>())
            .transpose()?
            .unwrap_or(LogLevel::Info);
        let source = non_empty(&self.source)
            .map(|s| s.parse::<LogSource>())
            .transpose()?
            .unwrap_or(LogSource::BusinessEvent);

        let mut record = NewLogRecord::new(level, self.message.trim())
            .with_changes(self.changes.clone())
            .with_details(self.details.clone())
            .with_source(source);

        if let Some(module) = non_empty(&self.module) {
            record = record.with_module(module);
        }
        if let Some(action) = non_empty(&self.action) {
            record = record.with_action(action);
        }
        if let Some(entity) = non_empty(&self.entity) {
            record = record.on_entity(entity, non_empty(&self.entity_id));
        }
        Ok(record)
    }
}

/// Distinct values present in the store, for building filter UIs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub modules: Vec<String>,
    pub actions: Vec<String>,
    pub entities: Vec<String>,
    pub sources: Vec<String>,
}

/// One page of records.
#[derive(Debug, Clone, PartialEq)]
pub struct LogPage {
    pub records: Vec<LogRecord>,
    pub pagination: Pagination,
    pub filters: FilterOptions,
}

/// Human-readable projection of a record, computed at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub user_name: String,
    pub source: LogSource,
    pub module: String,
    pub action: String,
    pub entity: Option<String>,
}

/// A value with its number of occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: String,
    pub count: i64,
}

/// Records of one level on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyLevelCount {
    pub date: NaiveDate,
    pub level: LogLevel,
    pub count: i64,
}

/// Per-level counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub info: i64,
    pub warning: i64,
    pub error: i64,
    pub debug: i64,
}

impl LevelCounts {
    pub fn add(&mut self, level: LogLevel, count: i64) {
        match level {
            LogLevel::Info => self.info += count,
            LogLevel::Warning => self.warning += count,
            LogLevel::Error => self.error += count,
            LogLevel::Debug => self.debug += count,
        }
    }

    pub fn total(&self) -> i64 {
        self.info + self.warning + self.error + self.debug
    }
}

/// Per-level counters for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: LevelCounts,
}

/// Aggregated view over a trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub period_days: i64,
    pub since: DateTime<Utc>,
    pub level_counts: LevelCounts,
    pub daily: Vec<DailyStats>,
    pub top_modules: Vec<FacetCount>,
    pub top_actions: Vec<FacetCount>,
    pub top_errors: Vec<FacetCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: LogSource, level: LogLevel, message: &str) -> LogRecord {
        NewLogRecord::new(level, message)
            .with_source(source)
            .with_module("orders")
            .with_action("update")
            .on_entity("order", Some("o-1".to_string()))
            .into_record()
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("WARN").unwrap(), LogLevel::Warning);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warning);
        assert!(LogLevel::from_str("fatal").is_err());
    }

    #[test]
    fn test_only_debug_is_not_persisted() {
        assert!(!LogLevel::Debug.is_persisted());
        assert!(LogLevel::Info.is_persisted());
        assert!(LogLevel::Warning.is_persisted());
        assert!(LogLevel::Error.is_persisted());
    }

    #[test]
    fn test_log_source_roundtrip_names() {
        for source in [LogSource::ApiRequest, LogSource::AdminAction, LogSource::Payment] {
            assert_eq!(LogSource::from_str(source.as_str()).unwrap(), source);
        }
        assert!(LogSource::from_str("nonsense").is_err());
    }

    #[test]
    fn test_business_family_excludes_transport_sources() {
        assert!(LogSource::BusinessEvent.is_business_event());
        assert!(LogSource::SystemStartup.is_business_event());
        assert!(!LogSource::ApiRequest.is_business_event());
        assert!(!LogSource::ApiResponse.is_business_event());
    }

    #[test]
    fn test_new_log_record_defaults() {
        let input = NewLogRecord::new(LogLevel::Info, "Kunde angelegt");
        assert_eq!(input.user_id, SYSTEM_ACTOR);
        assert_eq!(input.user_name, SYSTEM_ACTOR);
        assert_eq!(input.module, GENERAL);
        assert_eq!(input.action, GENERAL);
        assert_eq!(input.source, LogSource::BusinessEvent);
        assert!(input.changes.is_empty());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let rec = record(LogSource::DataOperation, LogLevel::Info, "x");
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["userName"], "System");
        assert_eq!(json["entityId"], "o-1");
        assert_eq!(json["source"], "data_operation");
        assert_eq!(json["level"], "info");
    }

    #[test]
    fn test_default_list_filter_excludes_api_traffic() {
        let filter = ListLogsQuery::default().to_filter().unwrap();
        assert!(!filter.matches(&record(LogSource::ApiRequest, LogLevel::Info, "POST")));
        assert!(!filter.matches(&record(LogSource::ApiResponse, LogLevel::Error, "500")));
        assert!(filter.matches(&record(LogSource::BusinessEvent, LogLevel::Info, "ok")));
    }

    #[test]
    fn test_explicit_source_overrides_default() {
        let query = ListLogsQuery {
            source: Some("api_request".to_string()),
            ..Default::default()
        };
        let filter = query.to_filter().unwrap();
        assert!(filter.matches(&record(LogSource::ApiRequest, LogLevel::Info, "POST")));
        assert!(!filter.matches(&record(LogSource::BusinessEvent, LogLevel::Info, "ok")));

        let all = ListLogsQuery {
            source: Some("all".to_string()),
            ..Default::default()
        };
        assert_eq!(all.to_filter().unwrap().sources, None);
    }

    #[test]
    fn test_invalid_query_values_are_rejected() {
        let query = ListLogsQuery {
            level: Some("loud".to_string()),
            ..Default::default()
        };
        assert!(query.to_filter().is_err());

        let query = ListLogsQuery {
            start_date: Some("yesterday".to_string()),
            ..Default::default()
        };
        assert!(query.to_filter().is_err());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let filter = LogFilter {
            search: Some("RECHNUNG".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&record(LogSource::BusinessEvent, LogLevel::Info, "Rechnung erstellt")));
        assert!(!filter.matches(&record(LogSource::BusinessEvent, LogLevel::Info, "Auftrag erstellt")));
    }

    #[test]
    fn test_time_range_bounds_are_inclusive() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        let rec = NewLogRecord::new(LogLevel::Info, "x").at(ts).into_record();

        let filter = LogFilter {
            from: Some(ts),
            to: Some(ts),
            ..Default::default()
        };
        assert!(filter.matches(&rec));

        let only_from = LogFilter {
            from: Some(ts + chrono::Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!only_from.matches(&rec));
    }

    #[test]
    fn test_parse_date_bound() {
        let start = parse_date_bound("2026-03-10", RangeBound::Start).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());

        let end = parse_date_bound("2026-03-10", RangeBound::End).unwrap();
        assert_eq!(end.date_naive(), start.date_naive());
        assert!(end > start + chrono::Duration::hours(23));

        let exact = parse_date_bound("2026-03-10T08:30:00+01:00", RangeBound::End).unwrap();
        assert_eq!(exact, Utc.with_ymd_and_hms(2026, 3, 10, 7, 30, 0).unwrap());
    }

    #[test]
    fn test_delete_request_confirmation_requires_literal_string() {
        let mut request = DeleteLogsRequest::default();
        assert!(!request.is_confirmed());

        request.confirm = Some(JsonValue::Bool(true));
        assert!(!request.is_confirmed());

        request.confirm = Some(JsonValue::String("yes".to_string()));
        assert!(!request.is_confirmed());

        request.confirm = Some(JsonValue::String("true".to_string()));
        assert!(request.is_confirmed());
    }

    #[test]
    fn test_delete_filter_has_no_default_source() {
        let request = DeleteLogsRequest {
            start_date: Some("2026-01-01".to_string()),
            ..Default::default()
        };
        assert!(request.has_date_range());
        let filter = request.to_filter().unwrap();
        assert_eq!(filter.sources, None);
        assert!(filter.has_time_range());
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateLogRequest =
            serde_json::from_str(r#"{"message":"Kunde angelegt","entity":"customer","entityId":"42"}"#)
                .unwrap();
        let record = request.to_new_record().unwrap();

        assert_eq!(record.level, LogLevel::Info);
        assert_eq!(record.source, LogSource::BusinessEvent);
        assert_eq!(record.module, GENERAL);
        assert_eq!(record.entity.as_deref(), Some("customer"));
        assert_eq!(record.entity_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_create_request_rejects_unknown_level() {
        let request = CreateLogRequest {
            level: Some("fatal".into()),
            message: "x".into(),
            ..Default::default()
        };
        assert!(request.to_new_record().is_err());
    }

    #[test]
    fn test_create_request_requires_message() {
        let request = CreateLogRequest::default();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_level_counts() {
        let mut counts = LevelCounts::default();
        counts.add(LogLevel::Error, 2);
        counts.add(LogLevel::Info, 5);
        assert_eq!(counts.error, 2);
        assert_eq!(counts.total(), 7);
    }
}
