//! Govline GovInfo - bulk ingestion from the GovInfo API
//!
//! Discovers packages through the Published service, enriches each one with
//! its summary, and downloads the requested renditions into
//! `<output>/<collection>/<year>/<packageId>.<kind>`.
//!
//! # Example
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use govline_core::{HttpTransport, ProgressContext, ThreadSleeper};
//! use govline_govinfo::{Config, RunArgs, run};
//!
//! let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
//! let config = Config::try_from(RunArgs {
//!     api_key: Some("DEMO_KEY".into()),
//!     collections: vec!["BILLS".into()],
//!     last_years: Some(1),
//!     dry_run: true,
//!     ..RunArgs::new(today)
//! })
//! .expect("invalid config");
//!
//! let summary = run(&config, &HttpTransport::new(), &ThreadSleeper, &ProgressContext::hidden())
//!     .expect("run failed");
//! println!("Planned {} downloads", summary.planned);
//! ```

pub mod api;
pub mod collections;
pub mod config;
pub mod downloader;
pub mod enricher;
pub mod index;
pub mod layout;
pub mod paginator;
pub mod runner;
pub mod state;

// Re-exports for convenience
pub use api::GovInfoClient;
pub use collections::{CollectionInfo, list_collections};
pub use config::{ApiConfig, Config, DateRange, RunArgs};
pub use downloader::{DownloadResult, Downloader};
pub use enricher::{AssetManifest, enrich};
pub use index::{IndexSummary, build_index};
pub use paginator::{Discovery, DiscoveryQuery, StopReason, discover};
pub use runner::{RunSummary, run};
pub use state::{AssetKind, DownloadTarget, KindOutcome, Record, RecordOutcome, RecordReport};
