//! CSV and JSON export of event log records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{LogFilter, LogRecord, GENERAL};

/// Column headers of the CSV export.
pub const CSV_HEADER: [&str; 10] = [
    "Zeitstempel",
    "Level",
    "Meldung",
    "Benutzer",
    "Modul",
    "Aktion",
    "Entität",
    "Entitäts-ID",
    "Quelle",
    "IP-Adresse",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(String),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::Csv(e.to_string())
    }
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Unknown export format: {}", s)),
        }
    }
}

/// Download name, e.g. `systemlogs_2026-03-10.csv`.
pub fn export_filename(format: ExportFormat, date: NaiveDate) -> String {
    format!("systemlogs_{}.{}", date.format("%Y-%m-%d"), format.extension())
}

/// German date/time layout used in exports.
pub fn localized_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%d.%m.%Y, %H:%M:%S").to_string()
}

/// Render records as CSV with a UTF-8 byte order mark for spreadsheet tools.
pub fn to_csv(records: &[LogRecord]) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;

    for record in records {
        let module = if record.module.is_empty() {
            GENERAL
        } else {
            record.module.as_str()
        };
        writer.write_record([
            localized_timestamp(&record.timestamp).as_str(),
            record.level.as_str(),
            record.message.as_str(),
            record.user_name.as_str(),
            module,
            record.action.as_str(),
            record.entity.as_deref().unwrap_or(""),
            record.entity_id.as_deref().unwrap_or(""),
            record.source.as_str(),
            record.ip_address.as_deref().unwrap_or(""),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    let body = String::from_utf8(bytes).map_err(|e| ExportError::Csv(e.to_string()))?;

    let mut csv = String::with_capacity(body.len() + 3);
    csv.push('\u{FEFF}');
    csv.push_str(&body);
    Ok(csv)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedRecord<'a> {
    #[serde(flatten)]
    record: &'a LogRecord,
    formatted_timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    exported_at: DateTime<Utc>,
    filters: &'a LogFilter,
    count: usize,
    logs: Vec<ExportedRecord<'a>>,
}

/// Render records as a JSON document with export metadata.
pub fn to_json(
    records: &[LogRecord],
    filter: &LogFilter,
    exported_at: DateTime<Utc>,
) -> Result<String, ExportError> {
    let export = JsonExport {
        exported_at,
        filters: filter,
        count: records.len(),
        logs: records
            .iter()
            .map(|record| ExportedRecord {
                record,
                formatted_timestamp: localized_timestamp(&record.timestamp),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LogLevel, LogSource, NewLogRecord};
    use chrono::TimeZone;

    fn sample() -> LogRecord {
        NewLogRecord::new(LogLevel::Warning, "Rechnung \"RE-7\" storniert")
            .with_actor("u-1", "Erika \"Eri\" Muster")
            .with_module("invoices")
            .with_action("cancel")
            .on_entity("invoice", Some("i-7".to_string()))
            .with_source(LogSource::StatusChange)
            .with_ip_address(Some("10.0.0.1".to_string()))
            .at(Utc.with_ymd_and_hms(2026, 3, 10, 8, 5, 9).unwrap())
            .into_record()
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("xml".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::default(), ExportFormat::Csv);
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(export_filename(ExportFormat::Csv, date), "systemlogs_2026-03-10.csv");
        assert_eq!(export_filename(ExportFormat::Json, date), "systemlogs_2026-03-10.json");
    }

    #[test]
    fn test_localized_timestamp() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 10, 8, 5, 9).unwrap();
        assert_eq!(localized_timestamp(&ts), "10.03.2026, 08:05:09");
    }

    #[test]
    fn test_csv_header_and_bom() {
        let csv = to_csv(&[]).unwrap();
        assert!(csv.starts_with('\u{FEFF}'));
        assert_eq!(
            csv.trim_start_matches('\u{FEFF}').trim_end(),
            "Zeitstempel,Level,Meldung,Benutzer,Modul,Aktion,Entität,Entitäts-ID,Quelle,IP-Adresse"
        );
    }

    #[test]
    fn test_csv_row_escapes_quotes() {
        let csv = to_csv(&[sample()]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "\"10.03.2026, 08:05:09\",warning,\"Rechnung \"\"RE-7\"\" storniert\",\"Erika \"\"Eri\"\" Muster\",invoices,cancel,invoice,i-7,status_change,10.0.0.1"
        );
    }

    #[test]
    fn test_csv_missing_optionals_are_empty() {
        let record = NewLogRecord::new(LogLevel::Info, "Start").into_record();
        let csv = to_csv(&[record]).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",general,general,,,business_event,"));
    }

    #[test]
    fn test_json_export_payload() {
        let filter = LogFilter {
            module: Some("invoices".to_string()),
            ..Default::default()
        };
        let exported_at = Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap();
        let json = to_json(&[sample()], &filter, exported_at).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["count"], 1);
        assert_eq!(value["filters"]["module"], "invoices");
        assert_eq!(value["logs"][0]["formattedTimestamp"], "10.03.2026, 08:05:09");
        assert_eq!(value["logs"][0]["entityId"], "i-7");
        assert!(value["exportedAt"].as_str().unwrap().starts_with("2026-03-11"));
    }
}
