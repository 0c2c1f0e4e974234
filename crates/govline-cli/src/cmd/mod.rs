pub mod collections;
pub mod download;
pub mod index;

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use govline_core::fmt_num;
use govline_govinfo::{RunArgs, StopReason};

use crate::config::Config;

/// Package selection shared by `download` and `index`
#[derive(Args, Debug)]
pub struct SelectionArgs {
    /// Comma-separated collection codes (e.g. BILLS,BILLSTATUS,CREC)
    #[arg(long, required = true, value_delimiter = ',')]
    pub collections: Vec<String>,

    /// Start date (YYYY-MM-DD). Required unless --last-years is used
    #[arg(long)]
    pub start_date: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today
    #[arg(long)]
    pub end_date: Option<String>,

    /// Ignore --start-date/--end-date and take the last N years up to today
    #[arg(long)]
    pub last_years: Option<u32>,

    /// Records per API call (1-1000)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop discovery after this many packages
    #[arg(long)]
    pub max_packages: Option<usize>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,
}

impl SelectionArgs {
    /// Layer CLI values over the config file into library arguments
    pub fn into_run_args(self, api_key: Option<String>, config: &Config) -> RunArgs {
        let today = chrono::Local::now().date_naive();
        RunArgs {
            api_base: config.govinfo.api_base.clone(),
            api_key: config.resolve_api_key(api_key),
            collections: self.collections,
            start_date: self.start_date,
            end_date: self.end_date,
            last_years: self.last_years,
            page_size: self.page_size.unwrap_or(config.govinfo.page_size),
            output_dir: self
                .output
                .unwrap_or_else(|| config.output.default_dir.clone()),
            formats: config.govinfo.formats.clone(),
            max_packages: self.max_packages,
            workers: self.workers.unwrap_or(config.workers.default),
            max_retries: config.http.max_retries,
            backoff: Duration::from_secs(config.http.backoff_secs),
            metadata_timeout: Duration::from_secs(config.http.metadata_timeout),
            content_timeout: Duration::from_secs(config.http.content_timeout),
            ..RunArgs::new(today)
        }
    }
}

/// Print a key-value summary table on stderr
pub fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Discovery row shared by the run summaries
pub fn discovery_row(discovered: usize, pages: usize, stop: &StopReason) -> (&'static str, String) {
    (
        "Discovered",
        format!("{} packages, {pages} page(s) ({stop})", fmt_num(discovered)),
    )
}

pub fn print_config(config: &Config) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec![
        "Output directory",
        &config.output.default_dir.display().to_string(),
    ]);
    table.add_row(vec!["API base URL", &config.govinfo.api_base]);
    table.add_row(vec![
        "API key",
        if config.resolve_api_key(None).is_some() {
            "configured"
        } else {
            "not set"
        },
    ]);
    table.add_row(vec!["Page size", &config.govinfo.page_size.to_string()]);
    table.add_row(vec!["Formats", &config.govinfo.formats.join(",")]);
    table.add_row(vec!["Workers", &config.workers.default.to_string()]);
    table.add_row(vec![
        "Metadata timeout",
        &format!("{}s", config.http.metadata_timeout),
    ]);
    table.add_row(vec![
        "Content timeout",
        &format!("{}s", config.http.content_timeout),
    ]);
    table.add_row(vec!["Max retries", &config.http.max_retries.to_string()]);
    table.add_row(vec!["Backoff", &format!("{}s", config.http.backoff_secs)]);

    eprintln!("\n{table}");
}
