//! Logging initialization and configuration.
//!
//! Three sinks are installed: the console (everything from the configured
//! level), a general JSON file (`INFO` and above) and an error-only JSON file.
//! File sinks rotate daily and by size, and prune files past their retention.

use chrono::{Duration, NaiveDate, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// File prefix of the general log.
pub const GENERAL_LOG_PREFIX: &str = "application";

/// File prefix of the error-only log.
pub const ERROR_LOG_PREFIX: &str = "error";

/// Suffix shared by all log files.
pub const LOG_FILE_SUFFIX: &str = ".log";

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("Failed to prepare log directory: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to install subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Keeps the file sinks alive. Dropping it flushes them.
#[must_use = "dropping the guard flushes and detaches file logging"]
pub struct LoggingGuard {
    writers: Vec<RotatingFileWriter>,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        for writer in &self.writers {
            let _ = writer.flush();
        }
    }
}

/// Initializes the logging subsystem based on configuration.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingInitError> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console = match config.format.as_str() {
        "json" => fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_filter(console_filter)
            .boxed(),
        _ => fmt::layer()
            .pretty()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_filter(console_filter)
            .boxed(),
    };

    let mut writers = Vec::new();
    let (general, errors) = if config.file_enabled {
        let max_bytes = config.max_file_size_mb.saturating_mul(1024 * 1024);
        let general = RotatingFileWriter::new(
            &config.directory,
            GENERAL_LOG_PREFIX,
            max_bytes,
            config.general_retention_days,
        )?;
        let errors = RotatingFileWriter::new(
            &config.directory,
            ERROR_LOG_PREFIX,
            max_bytes,
            config.error_retention_days,
        )?;
        writers.push(general.clone());
        writers.push(errors.clone());

        (
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(general)
                    .with_filter(LevelFilter::INFO),
            ),
            Some(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(errors)
                    .with_filter(LevelFilter::ERROR),
            ),
        )
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console)
        .with(general)
        .with(errors)
        .try_init()?;

    Ok(LoggingGuard { writers })
}

/// Size- and date-rotated log file, shareable across threads.
///
/// Files are named `<prefix>-YYYY-MM-DD.log`; once a file would grow past the
/// size cap, writing continues in `<prefix>-YYYY-MM-DD.<n>.log`. Opening a new
/// file removes files of the same prefix older than the retention window.
#[derive(Clone)]
pub struct RotatingFileWriter {
    inner: Arc<Mutex<RotatingFile>>,
}

impl RotatingFileWriter {
    pub fn new(
        directory: impl AsRef<Path>,
        prefix: &str,
        max_bytes: u64,
        retention_days: u32,
    ) -> io::Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(RotatingFile {
                directory,
                prefix: prefix.to_string(),
                max_bytes: max_bytes.max(1),
                retention_days,
                current: None,
            })),
        })
    }

    /// Path of the file currently written to, if one is open.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.lock()
            .ok()
            .and_then(|file| file.current.as_ref().map(|c| c.path.clone()))
    }

    pub fn flush(&self) -> io::Result<()> {
        self.lock()?.flush()
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, RotatingFile>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("log writer lock poisoned"))
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = RotatingFileHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingFileHandle {
            writer: self.clone(),
        }
    }
}

/// Per-event handle handed out to the formatter.
pub struct RotatingFileHandle {
    writer: RotatingFileWriter,
}

impl Write for RotatingFileHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let today = Utc::now().date_naive();
        self.writer.lock()?.write_on(today, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

struct RotatingFile {
    directory: PathBuf,
    prefix: String,
    max_bytes: u64,
    retention_days: u32,
    current: Option<OpenLogFile>,
}

struct OpenLogFile {
    date: NaiveDate,
    index: u32,
    path: PathBuf,
    file: File,
    written: u64,
}

impl RotatingFile {
    fn write_on(&mut self, day: NaiveDate, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len() as u64;

        let next_index = match &self.current {
            None => Some(0),
            Some(open) if open.date != day => Some(0),
            Some(open) if open.written > 0 && open.written + len > self.max_bytes => {
                Some(open.index + 1)
            }
            Some(_) => None,
        };
        if let Some(index) = next_index {
            self.open(day, index)?;
        }

        let Some(open) = self.current.as_mut() else {
            return Err(io::Error::other("no log file open"));
        };
        open.file.write_all(buf)?;
        open.written += len;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.current.as_mut() {
            Some(open) => open.file.flush(),
            None => Ok(()),
        }
    }

    /// Opens the first file for `day` at or after `index` that still has room.
    fn open(&mut self, day: NaiveDate, mut index: u32) -> io::Result<()> {
        self.flush()?;

        let (path, size) = loop {
            let path = self.directory.join(log_file_name(&self.prefix, day, index));
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            if size < self.max_bytes {
                break (path, size);
            }
            index += 1;
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.current = Some(OpenLogFile {
            date: day,
            index,
            path,
            file,
            written: size,
        });

        self.prune(day);
        Ok(())
    }

    /// Removes files of this prefix dated before the retention window.
    fn prune(&self, today: NaiveDate) {
        let cutoff = today - Duration::days(i64::from(self.retention_days));
        let Ok(entries) = fs::read_dir(&self.directory) else {
            return;
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(date) = name.to_str().and_then(|n| file_date(&self.prefix, n)) else {
                continue;
            };
            if date < cutoff {
                if let Err(e) = fs::remove_file(entry.path()) {
                    eprintln!("failed to remove expired log file {:?}: {}", entry.path(), e);
                }
            }
        }
    }
}

/// `application-2026-03-01.log`, `application-2026-03-01.2.log`, ...
pub fn log_file_name(prefix: &str, day: NaiveDate, index: u32) -> String {
    if index == 0 {
        format!("{}-{}{}", prefix, day.format("%Y-%m-%d"), LOG_FILE_SUFFIX)
    } else {
        format!(
            "{}-{}.{}{}",
            prefix,
            day.format("%Y-%m-%d"),
            index,
            LOG_FILE_SUFFIX
        )
    }
}

/// Date encoded in a log file name of the given prefix.
fn file_date(prefix: &str, name: &str) -> Option<NaiveDate> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('-')?;
    if !rest.ends_with(LOG_FILE_SUFFIX) {
        return None;
    }
    NaiveDate::parse_from_str(rest.get(..10)?, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn writer(dir: &Path, max_bytes: u64, retention_days: u32) -> RotatingFileWriter {
        RotatingFileWriter::new(dir, "application", max_bytes, retention_days).unwrap()
    }

    fn write(writer: &RotatingFileWriter, on: NaiveDate, line: &str) {
        writer.lock().unwrap().write_on(on, line.as_bytes()).unwrap();
    }

    #[test]
    fn test_log_file_name() {
        assert_eq!(log_file_name("application", day(1), 0), "application-2026-03-01.log");
        assert_eq!(log_file_name("error", day(9), 2), "error-2026-03-09.2.log");
    }

    #[test]
    fn test_file_date() {
        assert_eq!(file_date("error", "error-2026-03-09.log"), Some(day(9)));
        assert_eq!(file_date("error", "error-2026-03-09.3.log"), Some(day(9)));
        assert_eq!(file_date("error", "application-2026-03-09.log"), None);
        assert_eq!(file_date("error", "error-2026-03-09.txt"), None);
        assert_eq!(file_date("error", "error-latest.log"), None);
    }

    #[test]
    fn test_writes_to_daily_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer(dir.path(), 1024, 14);

        write(&writer, day(1), "first\n");
        write(&writer, day(1), "second\n");
        writer.flush().unwrap();

        let content = fs::read_to_string(dir.path().join("application-2026-03-01.log")).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_rotates_on_new_day() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer(dir.path(), 1024, 14);

        write(&writer, day(1), "monday\n");
        write(&writer, day(2), "tuesday\n");
        writer.flush().unwrap();

        assert!(dir.path().join("application-2026-03-01.log").exists());
        assert_eq!(
            writer.current_path().unwrap(),
            dir.path().join("application-2026-03-02.log")
        );
    }

    #[test]
    fn test_rotates_when_size_cap_reached() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer(dir.path(), 10, 14);

        write(&writer, day(1), "0123456789");
        write(&writer, day(1), "abc");
        writer.flush().unwrap();

        let first = fs::read_to_string(dir.path().join("application-2026-03-01.log")).unwrap();
        let second = fs::read_to_string(dir.path().join("application-2026-03-01.1.log")).unwrap();
        assert_eq!(first, "0123456789");
        assert_eq!(second, "abc");
    }

    #[test]
    fn test_oversized_line_is_written_whole() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer(dir.path(), 4, 14);

        write(&writer, day(1), "longer than the cap");
        writer.flush().unwrap();

        let content = fs::read_to_string(dir.path().join("application-2026-03-01.log")).unwrap();
        assert_eq!(content, "longer than the cap");
    }

    #[test]
    fn test_reopen_skips_full_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("application-2026-03-01.log"), "0123456789").unwrap();

        let writer = writer(dir.path(), 10, 14);
        write(&writer, day(1), "next");

        assert_eq!(
            writer.current_path().unwrap(),
            dir.path().join("application-2026-03-01.1.log")
        );
    }

    #[test]
    fn test_prunes_expired_files_of_same_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("application-2026-02-01.log"), "old").unwrap();
        fs::write(dir.path().join("application-2026-02-20.log"), "recent").unwrap();
        fs::write(dir.path().join("error-2026-02-01.log"), "other prefix").unwrap();
        fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();

        let writer = writer(dir.path(), 1024, 14);
        write(&writer, day(1), "today\n");

        assert!(!dir.path().join("application-2026-02-01.log").exists());
        assert!(dir.path().join("application-2026-02-20.log").exists());
        assert!(dir.path().join("error-2026-02-01.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_make_writer_shares_state() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer(dir.path(), 1024, 14);

        let mut handle = writer.make_writer();
        handle.write_all(b"via handle\n").unwrap();
        handle.flush().unwrap();

        let path = writer.current_path().unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "via handle\n");
    }
}
