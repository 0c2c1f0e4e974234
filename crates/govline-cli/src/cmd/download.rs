//! Download subcommand - discover packages and fetch their renditions

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use govline_core::{HttpTransport, SharedProgress, ThreadSleeper, fmt_num};

use super::{SelectionArgs, discovery_row, print_summary};
use crate::ConfigError;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Comma-separated formats per package (txt,htm,html,xml,pdf,mods,premis,zip)
    #[arg(long, value_delimiter = ',')]
    pub formats: Option<Vec<String>>,

    /// Enumerate what would be downloaded without downloading
    #[arg(long)]
    pub dry_run: bool,

    /// Retries per asset after the first attempt
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Response and read-stall timeout for asset downloads, in seconds
    #[arg(long)]
    pub content_timeout: Option<u64>,
}

pub fn run(
    args: DownloadArgs,
    api_key: Option<String>,
    config: &Config,
    progress: &SharedProgress,
) -> Result<ExitCode> {
    let mut run_args = args.selection.into_run_args(api_key, config);
    if let Some(formats) = args.formats {
        run_args.formats = formats;
    }
    if let Some(max_retries) = args.max_retries {
        run_args.max_retries = max_retries;
    }
    if let Some(secs) = args.content_timeout {
        run_args.content_timeout = std::time::Duration::from_secs(secs);
    }
    run_args.dry_run = args.dry_run;

    let run_config = govline_govinfo::Config::try_from(run_args).context(ConfigError)?;

    log::info!("Downloading GovInfo packages");
    log::info!("  Collections: {}", run_config.collections.join(","));
    log::info!("  Range: {}", run_config.date_range);
    log::info!("  Formats: {}", run_config.formats.join(","));
    log::info!("  Output: {}", run_config.output_dir.display());

    let summary = govline_govinfo::run(&run_config, &HttpTransport::new(), &ThreadSleeper, progress)?;

    if progress.is_tty() {
        let mut rows = vec![
            discovery_row(summary.discovered, summary.pages, &summary.stop),
            (
                "Enriched",
                format!(
                    "{}/{} ({} failed)",
                    fmt_num(summary.enriched),
                    fmt_num(summary.processed),
                    summary.enrich_failed
                ),
            ),
        ];
        if run_config.dry_run {
            rows.push(("Planned", fmt_num(summary.planned)));
        } else {
            rows.push((
                "Downloads",
                format!(
                    "{} ok, {} failed ({} bytes)",
                    fmt_num(summary.downloaded),
                    summary.download_failed,
                    summary.bytes_downloaded
                ),
            ));
        }
        rows.push(("Skipped (no link)", fmt_num(summary.skipped)));
        rows.push(("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())));
        print_summary("GovInfo download", &rows);
    }

    if summary.has_failures() {
        log::error!(
            "{} enrichment failure(s), {} download failure(s)",
            summary.enrich_failed,
            summary.download_failed
        );
    }
    Ok(crate::exit_code(summary.interrupted, summary.has_failures()))
}
