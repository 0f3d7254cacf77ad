//! Fire-and-forget hand-off of audit records to the event log.
//!
//! Request handlers and the HTTP taps never wait for an audit write. Records are
//! queued on a bounded channel and persisted by a single background worker; a
//! full queue drops the record, a failed write is logged and counted.
//!
//! On shutdown the worker drains what is already queued once the last
//! dispatcher is gone; [`AuditWorker::wait_for_shutdown`] bounds that wait.

use domain::models::NewLogRecord;
use domain::services::EventLogService;
use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const DISPATCHED_METRIC: &str = "audit_records_dispatched_total";
pub const DROPPED_METRIC: &str = "audit_records_dropped_total";
pub const WRITE_FAILURES_METRIC: &str = "audit_write_failures_total";

/// What happened to a submitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Queued,
    /// Debug records are only written to the transport log.
    Skipped,
    Dropped,
}

#[derive(Clone)]
pub struct AuditDispatcher {
    sender: mpsc::Sender<NewLogRecord>,
}

impl AuditDispatcher {
    /// Starts the worker. The worker ends once every dispatcher clone is dropped
    /// and the queue is drained.
    pub fn spawn(events: EventLogService, capacity: usize) -> (Self, AuditWorker) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(events, receiver));
        (Self { sender }, AuditWorker { handle })
    }

    /// Records waiting for the worker.
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Queues a record without waiting.
    pub fn dispatch(&self, record: NewLogRecord) -> DispatchOutcome {
        if !record.level.is_persisted() {
            debug!(
                target: "audit",
                module = %record.module,
                action = %record.action,
                source = %record.source,
                "{}",
                record.message
            );
            return DispatchOutcome::Skipped;
        }

        match self.sender.try_send(record) {
            Ok(()) => {
                counter!(DISPATCHED_METRIC).increment(1);
                DispatchOutcome::Queued
            }
            Err(TrySendError::Full(record)) => {
                counter!(DROPPED_METRIC).increment(1);
                warn!(
                    target: "audit",
                    source = %record.source,
                    message = %record.message,
                    "Audit queue full, record dropped"
                );
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Closed(record)) => {
                counter!(DROPPED_METRIC).increment(1);
                warn!(
                    target: "audit",
                    source = %record.source,
                    message = %record.message,
                    "Audit worker stopped, record dropped"
                );
                DispatchOutcome::Dropped
            }
        }
    }
}

/// Handle on the background writer.
pub struct AuditWorker {
    handle: JoinHandle<()>,
}

impl AuditWorker {
    /// Waits for the queue to drain, up to `timeout`.
    ///
    /// Only finishes early once every [`AuditDispatcher`] clone is dropped.
    /// Returns whether the worker completed in time.
    pub async fn wait_for_shutdown(self, timeout: Duration) -> bool {
        info!(target: "audit", "Waiting for audit queue to drain (timeout: {:?})", timeout);

        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => {
                info!(target: "audit", "Audit queue drained");
                true
            }
            Ok(Err(e)) => {
                error!(target: "audit", error = %e, "Audit worker panicked");
                false
            }
            Err(_) => {
                warn!(target: "audit", "Audit queue drain timed out after {:?}, pending records lost", timeout);
                false
            }
        }
    }
}

async fn run_worker(events: EventLogService, mut receiver: mpsc::Receiver<NewLogRecord>) {
    while let Some(record) = receiver.recv().await {
        let source = record.source;
        if let Err(e) = events.record(record).await {
            counter!(WRITE_FAILURES_METRIC).increment(1);
            error!(target: "audit", source = %source, error = %e, "Failed to write audit record");
        }
    }
    debug!(target: "audit", "Audit worker stopped");
}
