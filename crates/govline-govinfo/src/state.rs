//! Records, asset kinds and per-record processing outcomes
//!
//! A record moves `Discovered → Enriching → {EnrichedOk, EnrichFailed}`; from
//! `EnrichedOk` every requested kind ends in exactly one [`KindOutcome`].
//! Nothing transitions back.

use std::path::PathBuf;

use crate::layout;

/// One discovered package
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// GovInfo packageId, never empty
    pub id: String,
    pub issued_date: Option<String>,
    /// Item as returned by the Published service
    pub raw: serde_json::Value,
}

impl Record {
    pub fn new(id: impl Into<String>, issued_date: Option<String>) -> Self {
        Self {
            id: id.into(),
            issued_date,
            raw: serde_json::Value::Null,
        }
    }

    /// Collection code, e.g. `BILLS` for `BILLS-116hr34enr`
    pub fn collection_code(&self) -> &str {
        layout::collection_code(&self.id)
    }

    pub fn year(&self) -> String {
        layout::year_from_date(self.issued_date.as_deref())
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.raw.get("lastModified").and_then(|v| v.as_str())
    }
}

/// Downloadable representation of a package
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Txt,
    Htm,
    Html,
    Xml,
    Pdf,
    Mods,
    Premis,
    Zip,
}

impl AssetKind {
    pub const ALL: [AssetKind; 8] = [
        Self::Txt,
        Self::Htm,
        Self::Html,
        Self::Xml,
        Self::Pdf,
        Self::Mods,
        Self::Premis,
        Self::Zip,
    ];

    /// Parse a requested format name
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "txt" => Some(Self::Txt),
            "htm" => Some(Self::Htm),
            "html" => Some(Self::Html),
            "xml" => Some(Self::Xml),
            "pdf" => Some(Self::Pdf),
            "mods" => Some(Self::Mods),
            "premis" => Some(Self::Premis),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    /// Format name, also used as the file extension
    pub fn name(self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Htm => "htm",
            Self::Html => "html",
            Self::Xml => "xml",
            Self::Pdf => "pdf",
            Self::Mods => "mods",
            Self::Premis => "premis",
            Self::Zip => "zip",
        }
    }

    /// Field of the summary's `download` object holding this kind's URL
    pub fn link_key(self) -> &'static str {
        match self {
            Self::Txt => "txtLink",
            Self::Htm | Self::Html => "htmLink",
            Self::Xml => "xmlLink",
            Self::Pdf => "pdfLink",
            Self::Mods => "modsLink",
            Self::Premis => "premisLink",
            Self::Zip => "zipLink",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Map requested names to kinds, warning about and dropping unknown ones
pub fn resolve_kinds<S: AsRef<str>>(names: &[S]) -> Vec<AssetKind> {
    let mut kinds = Vec::new();
    for name in names {
        let name = name.as_ref();
        match AssetKind::from_name(name) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => log::warn!("Unknown format '{name}' requested; skipping."),
        }
    }
    kinds
}

/// One (record, kind) download, built at dispatch time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub record_id: String,
    pub kind: AssetKind,
    pub source_url: String,
    pub destination: PathBuf,
}

/// Terminal state of one requested kind of an enriched record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindOutcome {
    Downloaded { bytes: u64, attempts: u32 },
    DownloadFailed { attempts: u32, reason: String },
    /// The summary has no link for this kind
    Skipped,
    /// Dry run: resolved but not fetched
    Planned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindReport {
    pub kind: AssetKind,
    pub target: Option<DownloadTarget>,
    pub outcome: KindOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    EnrichFailed { reason: String },
    Enriched { kinds: Vec<KindReport> },
}

/// Everything that happened to one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    pub record_id: String,
    pub outcome: RecordOutcome,
}

impl RecordReport {
    pub fn kinds(&self) -> &[KindReport] {
        match &self.outcome {
            RecordOutcome::Enriched { kinds } => kinds,
            RecordOutcome::EnrichFailed { .. } => &[],
        }
    }

    pub fn enrich_failed(&self) -> bool {
        matches!(self.outcome, RecordOutcome::EnrichFailed { .. })
    }
}
