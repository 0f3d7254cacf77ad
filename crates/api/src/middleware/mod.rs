//! HTTP middleware components.

pub mod logging;
pub mod metrics;
pub mod request_log;
pub mod trace_id;
pub mod user_auth;

pub use logging::{init_logging, LoggingGuard};
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use request_log::request_log;
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
pub use user_auth::{require_admin, require_user_auth, UserAuth};
