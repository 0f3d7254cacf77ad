//! Application services owned by the HTTP layer.

pub mod audit_dispatch;
pub mod log_files;

pub use audit_dispatch::{AuditDispatcher, AuditWorker, DispatchOutcome};
pub use log_files::{LogFileError, LogFileInfo, LogFileTail};
