//! Domain services for the ERP back end.
//!
//! Services contain business logic that operates on domain models.

pub mod change_diff;
pub mod event_log;
pub mod log_export;
pub mod memory_store;
pub mod readable_log;

pub use change_diff::{change_record, diff_snapshots, ChangeContext, Snapshot};
pub use event_log::{
    Actor, DeleteOutcome, EventLogService, ExportFile, LogServiceError, LogStore, StoreError,
};
pub use log_export::{ExportError, ExportFormat};
pub use memory_store::InMemoryLogStore;
pub use readable_log::render;
