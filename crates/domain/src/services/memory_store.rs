//! In-memory log store for tests and local development.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{DailyLevelCount, FacetCount, LogField, LogFilter, LogRecord, NewLogRecord};
use crate::services::event_log::{LogStore, StoreError};

/// Log store backed by a vector. Not intended for production volumes.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    records: RwLock<Vec<LogRecord>>,
    fail: bool,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, for exercising error paths.
    pub fn failing() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("in-memory store configured to fail".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn insert(&self, input: NewLogRecord) -> Result<LogRecord, StoreError> {
        self.check()?;
        let record = input.into_record();
        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<LogRecord>, StoreError> {
        self.check()?;
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn count(&self, filter: &LogFilter) -> Result<i64, StoreError> {
        self.check()?;
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| filter.matches(r)).count() as i64)
    }

    async fn list(
        &self,
        filter: &LogFilter,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<LogRecord>, StoreError> {
        self.check()?;
        let records = self.records.read().await;
        let mut matching: Vec<LogRecord> =
            records.iter().filter(|r| filter.matches(r)).cloned().collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let offset = offset.max(0) as usize;
        let page = matching.into_iter().skip(offset);
        Ok(match limit {
            Some(limit) => page.take(limit.max(0) as usize).collect(),
            None => page.collect(),
        })
    }

    async fn delete(&self, filter: &LogFilter) -> Result<u64, StoreError> {
        self.check()?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !filter.matches(r));
        Ok((before - records.len()) as u64)
    }

    async fn distinct_values(&self, field: LogField) -> Result<Vec<String>, StoreError> {
        self.check()?;
        let records = self.records.read().await;
        let values: BTreeSet<String> = records
            .iter()
            .filter_map(|r| field.value_of(r).map(String::from))
            .collect();
        Ok(values.into_iter().collect())
    }

    async fn count_grouped(
        &self,
        filter: &LogFilter,
        field: LogField,
        limit: i64,
    ) -> Result<Vec<FacetCount>, StoreError> {
        self.check()?;
        let records = self.records.read().await;

        let mut counts: HashMap<String, i64> = HashMap::new();
        for record in records.iter().filter(|r| filter.matches(r)) {
            if let Some(value) = field.value_of(record) {
                *counts.entry(value.to_string()).or_default() += 1;
            }
        }

        let mut facets: Vec<FacetCount> = counts
            .into_iter()
            .map(|(value, count)| FacetCount { value, count })
            .collect();
        facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        facets.truncate(limit.max(0) as usize);
        Ok(facets)
    }

    async fn daily_level_counts(
        &self,
        filter: &LogFilter,
    ) -> Result<Vec<DailyLevelCount>, StoreError> {
        self.check()?;
        let records = self.records.read().await;

        let mut counts: HashMap<(chrono::NaiveDate, crate::models::LogLevel), i64> = HashMap::new();
        for record in records.iter().filter(|r| filter.matches(r)) {
            *counts
                .entry((record.timestamp.date_naive(), record.level))
                .or_default() += 1;
        }

        let mut result: Vec<DailyLevelCount> = counts
            .into_iter()
            .map(|((date, level), count)| DailyLevelCount { date, level, count })
            .collect();
        result.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.level.cmp(&b.level)));
        Ok(result)
    }
}
