//! Ingestion driver: discover → enrich → resolve kinds → download

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context;
use indicatif::ProgressBar;

use govline_core::{
    ProgressContext, Sleeper, Transport, WorkQueue, cleanup_tmp_files, fmt_num,
    is_shutdown_requested,
};

use crate::api::GovInfoClient;
use crate::config::Config;
use crate::downloader::{DownloadResult, Downloader};
use crate::enricher::enrich;
use crate::layout::destination_path;
use crate::paginator::{Discovery, StopReason, discover};
use crate::state::{
    AssetKind, DownloadTarget, KindOutcome, KindReport, Record, RecordOutcome, RecordReport,
    resolve_kinds,
};

/// Discover records for `config`, showing a spinner while paging
pub(crate) fn run_discovery(
    client: &GovInfoClient<'_>,
    config: &Config,
    progress: &ProgressContext,
) -> Discovery {
    log::info!(
        "Discovering packages for collections [{}] from {}",
        config.collections.join(", "),
        config.date_range
    );
    let stage = progress.stage_line("discover");
    let discovery = discover(client, &config.discovery_query(), &stage);
    stage.finish_and_clear();
    discovery
}

/// Apply `f` to every record on a pool of `workers` threads.
///
/// Workers stop claiming records once shutdown is requested, so the result
/// may be shorter than `records`. Results come back in discovery order.
pub(crate) fn process_records<R, F>(
    records: Vec<Record>,
    workers: usize,
    pb: &ProgressBar,
    f: F,
) -> anyhow::Result<(Vec<Record>, Vec<R>)>
where
    R: Send,
    F: Fn(&Record) -> R + Sync,
{
    let queue = WorkQueue::new(records);
    let results: Mutex<Vec<(usize, R)>> = Mutex::new(Vec::with_capacity(queue.total()));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("govline-worker-{i}"))
        .build()
        .context("Failed to build worker pool")?;

    pool.scope(|s| {
        for _ in 0..workers {
            s.spawn(|_| {
                while !is_shutdown_requested() {
                    let Some((idx, record)) = queue.next() else {
                        break;
                    };
                    log::debug!("[{}/{}] {}", idx + 1, queue.total(), record.id);
                    let result = f(record);
                    pb.inc(1);
                    if let Ok(mut results) = results.lock() {
                        results.push((idx, result));
                    }
                }
            });
        }
    });

    let mut results = results
        .into_inner()
        .map_err(|_| anyhow::anyhow!("a worker panicked while recording results"))?;
    results.sort_by_key(|(idx, _)| *idx);
    Ok((
        queue.into_items(),
        results.into_iter().map(|(_, r)| r).collect(),
    ))
}

/// Everything a worker needs to take one record to its terminal states
struct RecordContext<'a> {
    client: GovInfoClient<'a>,
    downloader: Downloader<'a>,
    kinds: &'a [AssetKind],
    output_dir: &'a Path,
    dry_run: bool,
    progress: &'a ProgressContext,
}

impl RecordContext<'_> {
    fn process(&self, record: &Record) -> RecordReport {
        let manifest = match enrich(&self.client, &record.id) {
            Ok(manifest) => manifest,
            Err(e) => {
                log::error!("Failed to fetch summary for {}: {e}", record.id);
                return RecordReport {
                    record_id: record.id.clone(),
                    outcome: RecordOutcome::EnrichFailed {
                        reason: e.to_string(),
                    },
                };
            }
        };

        let kinds = self
            .kinds
            .iter()
            .map(|&kind| {
                let Some(url) = manifest.url_for(kind) else {
                    log::info!("No {} link for {}; skipping.", kind.link_key(), record.id);
                    return KindReport {
                        kind,
                        target: None,
                        outcome: KindOutcome::Skipped,
                    };
                };
                let target = DownloadTarget {
                    record_id: record.id.clone(),
                    kind,
                    source_url: url.to_string(),
                    destination: destination_path(self.output_dir, record, kind),
                };
                let outcome = self.dispatch(&target);
                KindReport {
                    kind,
                    target: Some(target),
                    outcome,
                }
            })
            .collect();

        RecordReport {
            record_id: record.id.clone(),
            outcome: RecordOutcome::Enriched { kinds },
        }
    }

    fn dispatch(&self, target: &DownloadTarget) -> KindOutcome {
        if self.dry_run {
            log::info!(
                "[DRY-RUN] Would download {} -> {}",
                target.source_url,
                target.destination.display()
            );
            return KindOutcome::Planned;
        }

        let query = self.client.asset_query(&target.source_url);
        let pb = self
            .progress
            .download_bar(&format!("{}.{}", target.record_id, target.kind));
        let result = self
            .downloader
            .download(&target.source_url, &query, &target.destination, &pb);
        pb.finish_and_clear();

        match result {
            DownloadResult::Downloaded { bytes, attempts } => {
                KindOutcome::Downloaded { bytes, attempts }
            }
            DownloadResult::Failed { attempts, reason } => {
                KindOutcome::DownloadFailed { attempts, reason }
            }
        }
    }
}

/// Run one ingestion: discovery, then per-record enrichment and downloads.
///
/// Only configuration problems and local setup failures are errors; every
/// network failure ends up in the returned [`RunSummary`].
pub fn run(
    config: &Config,
    transport: &dyn Transport,
    sleeper: &dyn Sleeper,
    progress: &ProgressContext,
) -> anyhow::Result<RunSummary> {
    let start = Instant::now();
    // Rejects a config without any known format before the first request
    config.validate()?;
    let kinds = resolve_kinds(&config.formats);

    if config.dry_run {
        log::info!("Dry run: nothing will be downloaded");
    } else {
        fs::create_dir_all(&config.output_dir).with_context(|| {
            format!("Failed to create output dir {}", config.output_dir.display())
        })?;
        let removed = cleanup_tmp_files(&config.output_dir).with_context(|| {
            format!("Failed to clean up {}", config.output_dir.display())
        })?;
        if removed > 0 {
            log::info!("Removed {removed} stale .tmp file(s)");
        }
    }

    let client = GovInfoClient::new(transport, &config.api);
    let discovery = run_discovery(&client, config, progress);
    let Discovery {
        records,
        pages,
        stop,
        ..
    } = discovery;

    if records.is_empty() {
        log::warn!("No packages found for the given filters.");
    } else {
        log::info!(
            "Processing {} packages ({}) with {} worker(s)",
            fmt_num(records.len()),
            kinds.iter().map(|k| k.name()).collect::<Vec<_>>().join(", "),
            config.workers
        );
    }

    let ctx = RecordContext {
        client,
        downloader: Downloader::new(transport, sleeper, config.retry, config.content_timeout),
        kinds: &kinds,
        output_dir: &config.output_dir,
        dry_run: config.dry_run,
        progress,
    };

    let records_pb = progress.records_bar(records.len());
    let (records, reports) =
        process_records(records, config.workers, &records_pb, |record| ctx.process(record))?;
    records_pb.finish_and_clear();

    let interrupted = is_shutdown_requested() || stop == StopReason::Shutdown;
    let summary = RunSummary::from_reports(records.len(), pages, stop, reports, interrupted, start.elapsed());
    summary.log();
    Ok(summary)
}

/// Summary of one ingestion run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub discovered: usize,
    pub pages: usize,
    pub stop: StopReason,
    /// Records that reached a terminal state (less than `discovered` after an interrupt)
    pub processed: usize,
    pub enriched: usize,
    pub enrich_failed: usize,
    pub downloaded: usize,
    pub download_failed: usize,
    pub skipped: usize,
    pub planned: usize,
    pub bytes_downloaded: u64,
    /// Dry-run plan, in discovery order
    pub planned_targets: Vec<DownloadTarget>,
    pub reports: Vec<RecordReport>,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_reports(
        discovered: usize,
        pages: usize,
        stop: StopReason,
        reports: Vec<RecordReport>,
        interrupted: bool,
        elapsed: Duration,
    ) -> Self {
        let mut summary = Self {
            discovered,
            pages,
            stop,
            processed: reports.len(),
            enriched: 0,
            enrich_failed: 0,
            downloaded: 0,
            download_failed: 0,
            skipped: 0,
            planned: 0,
            bytes_downloaded: 0,
            planned_targets: Vec::new(),
            reports: Vec::new(),
            interrupted,
            elapsed,
        };

        for report in &reports {
            match &report.outcome {
                RecordOutcome::EnrichFailed { .. } => summary.enrich_failed += 1,
                RecordOutcome::Enriched { kinds } => {
                    summary.enriched += 1;
                    for kind in kinds {
                        match &kind.outcome {
                            KindOutcome::Downloaded { bytes, .. } => {
                                summary.downloaded += 1;
                                summary.bytes_downloaded += bytes;
                            }
                            KindOutcome::DownloadFailed { .. } => summary.download_failed += 1,
                            KindOutcome::Skipped => summary.skipped += 1,
                            KindOutcome::Planned => {
                                summary.planned += 1;
                                if let Some(target) = &kind.target {
                                    summary.planned_targets.push(target.clone());
                                }
                            }
                        }
                    }
                }
            }
        }
        summary.reports = reports;
        summary
    }

    /// Any enrichment or download failure
    pub fn has_failures(&self) -> bool {
        self.enrich_failed > 0 || self.download_failed > 0
    }

    pub fn log(&self) {
        log::info!("=== Run Summary ===");
        log::info!(
            "Discovered: {} packages in {} page(s) ({})",
            fmt_num(self.discovered),
            self.pages,
            self.stop
        );
        log::info!(
            "Enriched: {}/{} ({} failed)",
            fmt_num(self.enriched),
            fmt_num(self.processed),
            self.enrich_failed
        );
        if self.planned > 0 {
            log::info!("Planned: {} downloads (dry run)", fmt_num(self.planned));
        }
        log::info!(
            "Downloads: {} ok, {} failed, {} skipped ({} bytes)",
            fmt_num(self.downloaded),
            self.download_failed,
            self.skipped,
            self.bytes_downloaded
        );
        if self.interrupted {
            log::warn!(
                "Interrupted: {} of {} packages not processed",
                self.discovered - self.processed,
                self.discovered
            );
        }
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn target(id: &str, kind: AssetKind) -> DownloadTarget {
        DownloadTarget {
            record_id: id.into(),
            kind,
            source_url: format!("https://api.govinfo.gov/packages/{id}/{kind}"),
            destination: PathBuf::from(format!("out/X/2020/{id}.{kind}")),
        }
    }

    fn kind_report(kind: AssetKind, outcome: KindOutcome) -> KindReport {
        KindReport {
            kind,
            target: Some(target("X-1", kind)),
            outcome,
        }
    }

    #[test]
    fn summary_counts_every_terminal_state() {
        let reports = vec![
            RecordReport {
                record_id: "X-1".into(),
                outcome: RecordOutcome::Enriched {
                    kinds: vec![
                        kind_report(AssetKind::Pdf, KindOutcome::Downloaded { bytes: 100, attempts: 1 }),
                        kind_report(
                            AssetKind::Xml,
                            KindOutcome::DownloadFailed {
                                attempts: 4,
                                reason: "HTTP 500: Internal Server Error".into(),
                            },
                        ),
                        KindReport {
                            kind: AssetKind::Zip,
                            target: None,
                            outcome: KindOutcome::Skipped,
                        },
                    ],
                },
            },
            RecordReport {
                record_id: "X-2".into(),
                outcome: RecordOutcome::EnrichFailed {
                    reason: "HTTP 404: Not Found".into(),
                },
            },
        ];

        let summary = RunSummary::from_reports(3, 1, StopReason::NoNextPage, reports, false, Duration::ZERO);
        assert_eq!(summary.discovered, 3);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.enriched, 1);
        assert_eq!(summary.enrich_failed, 1);
        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.download_failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.bytes_downloaded, 100);
        assert!(summary.has_failures());
        summary.log();
    }

    #[test]
    fn summary_collects_plan() {
        let reports = vec![RecordReport {
            record_id: "X-1".into(),
            outcome: RecordOutcome::Enriched {
                kinds: vec![
                    kind_report(AssetKind::Pdf, KindOutcome::Planned),
                    kind_report(AssetKind::Xml, KindOutcome::Planned),
                ],
            },
        }];
        let summary = RunSummary::from_reports(1, 1, StopReason::EmptyPage, reports, false, Duration::ZERO);
        assert_eq!(summary.planned, 2);
        assert_eq!(
            summary.planned_targets,
            vec![target("X-1", AssetKind::Pdf), target("X-1", AssetKind::Xml)]
        );
        assert!(!summary.has_failures());
    }

    #[test]
    fn process_records_keeps_discovery_order() {
        let records: Vec<Record> = (0..20)
            .map(|i| Record::new(format!("X-{i}"), None))
            .collect();
        let (records, ids) =
            process_records(records, 4, &ProgressBar::hidden(), |r| r.id.clone()).unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(ids, records.iter().map(|r| r.id.clone()).collect::<Vec<_>>());
    }
}
