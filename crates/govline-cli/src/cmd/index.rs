//! Index subcommand - write packages.jsonl without downloading content

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use govline_core::{HttpTransport, SharedProgress, fmt_num};

use super::{SelectionArgs, discovery_row, print_summary};
use crate::ConfigError;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct IndexArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

pub fn run(
    args: IndexArgs,
    api_key: Option<String>,
    config: &Config,
    progress: &SharedProgress,
) -> Result<ExitCode> {
    let run_args = args.selection.into_run_args(api_key, config);
    let run_config = govline_govinfo::Config::try_from(run_args).context(ConfigError)?;

    log::info!("Indexing GovInfo packages");
    log::info!("  Collections: {}", run_config.collections.join(","));
    log::info!("  Range: {}", run_config.date_range);
    log::info!("  Output: {}", run_config.output_dir.display());

    let summary = govline_govinfo::build_index(&run_config, &HttpTransport::new(), progress)?;

    if progress.is_tty() {
        print_summary(
            "GovInfo index",
            &[
                discovery_row(summary.discovered, summary.pages, &summary.stop),
                (
                    "Written",
                    format!(
                        "{} entries ({} enrich failures)",
                        fmt_num(summary.written),
                        summary.enrich_failed
                    ),
                ),
                (
                    "File",
                    if summary.replaced {
                        summary.path.display().to_string()
                    } else {
                        format!("{} (kept previous)", summary.path.display())
                    },
                ),
                ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
            ],
        );
    }

    Ok(crate::exit_code(summary.interrupted, summary.has_failures()))
}
