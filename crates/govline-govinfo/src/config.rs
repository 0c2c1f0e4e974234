//! GovInfo ingestion configuration
//!
//! Everything is resolved once at the boundary into [`Config`]; no component
//! below reads the environment or the clock.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::{Datelike, Days, NaiveDate};
use govline_core::RetryPolicy;
use govline_core::retry::{MAX_BACKOFF_BASE, MAX_RETRIES_LIMIT};

use crate::paginator::DiscoveryQuery;
use crate::state::AssetKind;

pub const DEFAULT_API_BASE: &str = "https://api.govinfo.gov";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 1000;
pub const DEFAULT_FORMATS: &[&str] = &["pdf", "xml"];
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONTENT_TIMEOUT: Duration = Duration::from_secs(120);

/// Where and how to reach the API
#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Timeout for pages, summaries and collection listings
    pub timeout: Duration,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }

    /// Absolute URL for an API path such as `/collections`
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Whether `url` points at this API (and may therefore carry the key)
    pub fn owns(&self, url: &str) -> bool {
        let base = self.base_url.trim_end_matches('/');
        url.strip_prefix(base)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }
}

/// Inclusive publication date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Explicit range; a missing end means `today`
    pub fn explicit(start: NaiveDate, end: Option<NaiveDate>, today: NaiveDate) -> anyhow::Result<Self> {
        let end = end.unwrap_or(today);
        anyhow::ensure!(start <= end, "Start date {start} is after end date {end}");
        Ok(Self { start, end })
    }

    /// `[today - years, today]`.
    ///
    /// Falls back to `365 * years` days when the same month/day does not
    /// exist that many years back (29 February).
    pub fn last_years(years: u32, today: NaiveDate) -> anyhow::Result<Self> {
        anyhow::ensure!(years > 0, "--last-years must be a positive integer");
        let target_year = i32::try_from(years)
            .ok()
            .and_then(|y| today.year().checked_sub(y))
            .context("--last-years reaches before year 0")?;
        let start = match today.with_year(target_year) {
            Some(start) => start,
            None => today
                .checked_sub_days(Days::new(365 * u64::from(years)))
                .context("--last-years out of range")?,
        };
        Ok(Self { start, end: today })
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start_str(), self.end_str())
    }
}

/// Parse a `YYYY-MM-DD` argument
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{s}'. Expected YYYY-MM-DD."))
}

/// Trim, upper-case, drop empties, sort and de-duplicate collection codes
pub fn normalize_collections<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut codes: Vec<String> = raw
        .iter()
        .flat_map(|s| s.as_ref().split(','))
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    codes.sort();
    codes.dedup();
    codes
}

/// Trim, lower-case and drop empty format names, keeping request order
pub fn normalize_formats<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut formats: Vec<String> = Vec::new();
    for name in raw.iter().flat_map(|s| s.as_ref().split(',')) {
        let name = name.trim().to_lowercase();
        if !name.is_empty() && !formats.contains(&name) {
            formats.push(name);
        }
    }
    formats
}

/// Caller-facing arguments (plain struct, no clap derive).
///
/// `today` is supplied by the caller so date handling stays deterministic.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub api_base: String,
    pub api_key: Option<String>,
    pub collections: Vec<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub last_years: Option<u32>,
    pub page_size: u32,
    pub output_dir: PathBuf,
    pub formats: Vec<String>,
    pub max_packages: Option<usize>,
    pub dry_run: bool,
    pub workers: usize,
    pub max_retries: u32,
    pub backoff: Duration,
    pub metadata_timeout: Duration,
    pub content_timeout: Duration,
    pub today: NaiveDate,
}

impl RunArgs {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            collections: Vec::new(),
            start_date: None,
            end_date: None,
            last_years: None,
            page_size: DEFAULT_PAGE_SIZE,
            output_dir: PathBuf::from("govinfo_data"),
            formats: DEFAULT_FORMATS.iter().map(|s| s.to_string()).collect(),
            max_packages: None,
            dry_run: false,
            workers: 1,
            max_retries: govline_core::retry::DEFAULT_MAX_RETRIES,
            backoff: govline_core::retry::DEFAULT_BACKOFF_BASE,
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            content_timeout: DEFAULT_CONTENT_TIMEOUT,
            today,
        }
    }
}

/// Validated runtime configuration for an ingestion run
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    /// Normalized collection codes (sorted, unique, upper-case)
    pub collections: Vec<String>,
    pub date_range: DateRange,
    pub page_size: u32,
    pub output_dir: PathBuf,
    /// Requested asset kind names; unknown names are skipped at run time
    pub formats: Vec<String>,
    pub max_packages: Option<usize>,
    pub dry_run: bool,
    pub workers: usize,
    pub retry: RetryPolicy,
    /// Timeout for asset response heads and body stalls
    pub content_timeout: Duration,
}

impl TryFrom<RunArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: RunArgs) -> Result<Self, Self::Error> {
        let api_key = args
            .api_key
            .filter(|k| !k.trim().is_empty())
            .context("GovInfo API key is required. Use --api-key or set GOVINFO_API_KEY.")?;

        let date_range = if let Some(years) = args.last_years {
            let range = DateRange::last_years(years, args.today)?;
            log::info!("Using last {years} years: {range}");
            range
        } else {
            let start = args
                .start_date
                .as_deref()
                .context("--start-date is required when --last-years is not used")?;
            let start = parse_date(start)?;
            let end = args.end_date.as_deref().map(parse_date).transpose()?;
            let range = DateRange::explicit(start, end, args.today)?;
            log::info!("Using explicit date range: {range}");
            range
        };

        let config = Self {
            api: ApiConfig {
                base_url: args.api_base,
                api_key,
                timeout: args.metadata_timeout,
            },
            collections: normalize_collections(&args.collections),
            date_range,
            page_size: args.page_size,
            output_dir: args.output_dir,
            formats: normalize_formats(&args.formats),
            max_packages: args.max_packages,
            dry_run: args.dry_run,
            workers: args.workers,
            retry: RetryPolicy {
                max_retries: args.max_retries,
                backoff_base: args.backoff,
                ..RetryPolicy::default()
            },
            content_timeout: args.content_timeout,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.api.api_key.is_empty(), "GovInfo API key is required");
        anyhow::ensure!(
            !self.api.base_url.is_empty(),
            "API base URL must not be empty"
        );
        anyhow::ensure!(
            !self.collections.is_empty(),
            "At least one collection code must be provided in --collections"
        );
        anyhow::ensure!(
            (1..=MAX_PAGE_SIZE).contains(&self.page_size),
            "page size must be between 1 and {MAX_PAGE_SIZE}, got {}",
            self.page_size
        );
        anyhow::ensure!(
            !self.formats.is_empty(),
            "At least one format must be specified via --formats"
        );
        anyhow::ensure!(
            self.formats.iter().any(|f| AssetKind::from_name(f).is_some()),
            "No valid formats requested ({}). Known formats: {}",
            self.formats.join(", "),
            AssetKind::ALL.map(AssetKind::name).join(", ")
        );
        anyhow::ensure!(
            self.max_packages != Some(0),
            "--max-packages must be a positive integer"
        );
        anyhow::ensure!(self.workers >= 1, "--workers must be at least 1");
        anyhow::ensure!(
            self.retry.max_retries <= MAX_RETRIES_LIMIT,
            "--max-retries must be at most {MAX_RETRIES_LIMIT}, got {}",
            self.retry.max_retries
        );
        anyhow::ensure!(
            self.retry.backoff_base <= MAX_BACKOFF_BASE,
            "backoff must be at most {}s, got {}s",
            MAX_BACKOFF_BASE.as_secs(),
            self.retry.backoff_base.as_secs()
        );
        anyhow::ensure!(
            self.date_range.start <= self.date_range.end,
            "Start date {} is after end date {}",
            self.date_range.start,
            self.date_range.end
        );
        Ok(())
    }

    pub fn discovery_query(&self) -> DiscoveryQuery {
        DiscoveryQuery {
            collections: self.collections.clone(),
            date_range: self.date_range,
            page_size: self.page_size,
            max_records: self.max_packages,
        }
    }
}
