//! Package index export: one JSON line per enriched package
//!
//! Runs discovery and enrichment without downloading and writes
//! `<output>/packages.jsonl` through a [`FileSink`]. The file is only
//! replaced when discovery ran to completion and no shutdown was requested,
//! so a partial index never replaces a complete one.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use serde::Serialize;

use govline_core::{FileSink, ProgressContext, Transport, fmt_num, is_shutdown_requested};

use crate::api::GovInfoClient;
use crate::config::Config;
use crate::enricher::{AssetManifest, enrich};
use crate::paginator::{Discovery, StopReason};
use crate::runner::{process_records, run_discovery};
use crate::state::Record;

pub const INDEX_FILE_NAME: &str = "packages.jsonl";

/// One line of the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub package_id: String,
    pub collection_code: String,
    pub date_issued: Option<String>,
    pub last_modified: Option<String>,
    /// Link name → URL
    pub downloads: BTreeMap<String, String>,
}

impl IndexEntry {
    pub fn new(record: &Record, manifest: &AssetManifest) -> Self {
        // The summary's lastModified is fresher than the published listing's
        let last_modified = manifest
            .summary
            .get("lastModified")
            .and_then(|v| v.as_str())
            .or_else(|| record.last_modified())
            .map(str::to_string);

        Self {
            package_id: record.id.clone(),
            collection_code: record.collection_code().to_string(),
            date_issued: record.issued_date.clone(),
            last_modified,
            downloads: manifest.links().clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub path: PathBuf,
    pub discovered: usize,
    pub pages: usize,
    pub stop: StopReason,
    pub written: usize,
    pub enrich_failed: usize,
    pub interrupted: bool,
    /// Whether `path` was replaced by this run
    pub replaced: bool,
    pub elapsed: Duration,
}

impl IndexSummary {
    /// Enrichment failures, or a discovery that failed part way
    pub fn has_failures(&self) -> bool {
        self.enrich_failed > 0 || matches!(self.stop, StopReason::RequestFailed(_))
    }

    pub fn log(&self) {
        log::info!("=== Index Summary ===");
        log::info!(
            "Discovered: {} packages in {} page(s) ({})",
            fmt_num(self.discovered),
            self.pages,
            self.stop
        );
        if self.replaced {
            log::info!(
                "Wrote {} entries to {} ({} enrich failures)",
                fmt_num(self.written),
                self.path.display(),
                self.enrich_failed
            );
        } else {
            log::warn!(
                "Index incomplete ({}); left {} untouched",
                self.stop,
                self.path.display()
            );
        }
        if self.interrupted {
            log::warn!("Interrupted before the index was complete");
        }
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
    }
}

/// Discover, enrich and write the index for `config`.
///
/// `config.dry_run` has no effect: nothing but the index file is written.
pub fn build_index(
    config: &Config,
    transport: &dyn Transport,
    progress: &ProgressContext,
) -> anyhow::Result<IndexSummary> {
    let start = Instant::now();
    config.validate()?;

    let path = config.output_dir.join(INDEX_FILE_NAME);
    // Open the sink before any network call so an unwritable output fails fast
    let mut sink = FileSink::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let client = GovInfoClient::new(transport, &config.api);
    let Discovery {
        records, pages, stop, ..
    } = run_discovery(&client, config, progress);

    let records_pb = progress.records_bar(records.len());
    let (records, manifests) = process_records(records, config.workers, &records_pb, |record| {
        enrich(&client, &record.id)
            .inspect_err(|e| log::error!("Failed to fetch summary for {}: {e}", record.id))
            .ok()
    })?;
    records_pb.finish_and_clear();

    let interrupted = is_shutdown_requested() || stop == StopReason::Shutdown;
    let replaced = !interrupted && !matches!(stop, StopReason::RequestFailed(_));

    let mut written = 0;
    let mut enrich_failed = 0;
    for (record, manifest) in records.iter().zip(&manifests) {
        let Some(manifest) = manifest else {
            enrich_failed += 1;
            continue;
        };
        if !replaced {
            continue;
        }
        let mut line = serde_json::to_vec(&IndexEntry::new(record, manifest))
            .context("Failed to serialize index entry")?;
        line.push(b'\n');
        sink.write_all(&line)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }
    if replaced {
        sink.finalize()
            .with_context(|| format!("Failed to finalize {}", path.display()))?;
    } else {
        // Dropping the unfinalized sink removes its tmp file
        drop(sink);
    }

    let summary = IndexSummary {
        path,
        discovered: records.len(),
        pages,
        interrupted,
        replaced,
        stop,
        written,
        enrich_failed,
        elapsed: start.elapsed(),
    };
    summary.log();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enricher::manifest_from_summary;
    use serde_json::json;

    #[test]
    fn entry_serializes_camel_case() {
        let mut record = Record::new("BILLS-116hr34enr", Some("2019-05-01".into()));
        record.raw = json!({"lastModified": "2019-05-02T00:00:00Z"});
        let manifest = manifest_from_summary(json!({
            "download": {"pdfLink": "https://api.govinfo.gov/packages/BILLS-116hr34enr/pdf"}
        }))
        .unwrap();

        let value = serde_json::to_value(IndexEntry::new(&record, &manifest)).unwrap();
        assert_eq!(
            value,
            json!({
                "packageId": "BILLS-116hr34enr",
                "collectionCode": "BILLS",
                "dateIssued": "2019-05-01",
                "lastModified": "2019-05-02T00:00:00Z",
                "downloads": {"pdfLink": "https://api.govinfo.gov/packages/BILLS-116hr34enr/pdf"}
            })
        );
    }

    #[test]
    fn summary_last_modified_wins() {
        let mut record = Record::new("FR-2020-01-02", None);
        record.raw = json!({"lastModified": "2020-01-02T00:00:00Z"});
        let manifest = manifest_from_summary(json!({"lastModified": "2021-06-01T00:00:00Z"})).unwrap();

        let entry = IndexEntry::new(&record, &manifest);
        assert_eq!(entry.last_modified.as_deref(), Some("2021-06-01T00:00:00Z"));
        assert_eq!(entry.date_issued, None);
        assert!(entry.downloads.is_empty());
    }
}
