//! Govline Core - Common infrastructure for bulk-ingestion clients
//!
//! HTTP transport, retry policy, atomic file output, logging, progress
//! and shutdown handling shared by the source crates and the CLI.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod shutdown;
pub mod sink;
pub mod work_queue;

// Re-exports for convenience
pub use error::FetchError;
pub use http::{HttpTransport, Response, SHARED_RUNTIME, Transport, http_client};
pub use logging::{ProgressLogger, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use retry::{RecordingSleeper, RetryPolicy, Sleeper, ThreadSleeper};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown, shutdown_flag};
pub use sink::{FileSink, cleanup_tmp_files};
pub use work_queue::WorkQueue;
