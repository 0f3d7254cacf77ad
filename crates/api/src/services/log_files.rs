//! Read access to the rotated log files on disk.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

use crate::middleware::logging::LOG_FILE_SUFFIX;

/// Lines returned by a tail request when none are specified.
pub const DEFAULT_TAIL_LINES: usize = 1000;

/// Upper bound for a single tail request.
pub const MAX_TAIL_LINES: usize = 10_000;

#[derive(Debug, Error)]
pub enum LogFileError {
    #[error("Invalid log file name: {0}")]
    InvalidName(String),

    #[error("Log file not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFileInfo {
    pub name: String,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFileTail {
    pub name: String,
    pub total_lines: usize,
    pub lines: Vec<String>,
}

/// Accepts plain `*.log` names only: no separators, no parent segments.
pub fn validate_file_name(name: &str) -> Result<(), LogFileError> {
    let invalid = name.is_empty()
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || !name.ends_with(LOG_FILE_SUFFIX)
        || name.len() == LOG_FILE_SUFFIX.len();

    if invalid {
        return Err(LogFileError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Log files in `directory`, most recently modified first.
///
/// A missing directory yields an empty list.
pub async fn list_log_files(directory: &Path) -> Result<Vec<LogFileInfo>, LogFileError> {
    let mut entries = match fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !name.ends_with(LOG_FILE_SUFFIX) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        files.push(LogFileInfo {
            name,
            size: metadata.len(),
            created: metadata.created().ok().map(DateTime::<Utc>::from),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        });
    }

    files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
    Ok(files)
}

/// The last `lines` lines of one log file.
pub async fn tail_log_file(
    directory: &Path,
    name: &str,
    lines: Option<usize>,
) -> Result<LogFileTail, LogFileError> {
    validate_file_name(name)?;
    let limit = lines.unwrap_or(DEFAULT_TAIL_LINES).clamp(1, MAX_TAIL_LINES);

    let bytes = match fs::read(directory.join(name)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(LogFileError::NotFound(name.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let content = String::from_utf8_lossy(&bytes);
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(limit);

    Ok(LogFileTail {
        name: name.to_string(),
        total_lines: all.len(),
        lines: all[start..].iter().map(|l| l.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("application-2026-03-01.log").is_ok());
        assert!(validate_file_name("error-2026-03-01.2.log").is_ok());

        for bad in [
            "",
            ".log",
            "../secrets.log",
            "..log",
            "logs/application.log",
            "logs\\application.log",
            "application.txt",
            "application.log.bak",
        ] {
            assert!(
                matches!(validate_file_name(bad), Err(LogFileError::InvalidName(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_list_only_log_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("application-2026-03-01.log"), "a\n").unwrap();
        std::fs::write(dir.path().join("error-2026-03-01.log"), "bb\n").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("archive.log")).unwrap();

        let files = list_log_files(dir.path()).await.unwrap();
        let mut names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        names.sort();

        assert_eq!(names, vec!["application-2026-03-01.log", "error-2026-03-01.log"]);
        let error_file = files.iter().find(|f| f.name.starts_with("error")).unwrap();
        assert_eq!(error_file.size, 3);
        assert!(error_file.modified.is_some());
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = list_log_files(&dir.path().join("nope")).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_tail_returns_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let content: String = (1..=20).map(|i| format!("line {}\n", i)).collect();
        std::fs::write(dir.path().join("application-2026-03-01.log"), content).unwrap();

        let tail = tail_log_file(dir.path(), "application-2026-03-01.log", Some(3))
            .await
            .unwrap();

        assert_eq!(tail.total_lines, 20);
        assert_eq!(tail.lines, vec!["line 18", "line 19", "line 20"]);
    }

    #[tokio::test]
    async fn test_tail_default_returns_whole_small_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("error-2026-03-01.log"), "one\ntwo\n").unwrap();

        let tail = tail_log_file(dir.path(), "error-2026-03-01.log", None)
            .await
            .unwrap();
        assert_eq!(tail.lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_tail_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = tail_log_file(dir.path(), "application-2020-01-01.log", None).await;
        assert!(matches!(result, Err(LogFileError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_tail_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let result = tail_log_file(dir.path(), "../etc/passwd.log", None).await;
        assert!(matches!(result, Err(LogFileError::InvalidName(_))));
    }
}
