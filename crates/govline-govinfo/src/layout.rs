//! Destination layout: `<root>/<collection>/<year>/<packageId>.<kind>`

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::state::{AssetKind, Record};

pub const UNKNOWN_YEAR: &str = "unknown_year";
pub const UNKNOWN_COLLECTION: &str = "UNKNOWN";

/// Prefix of a packageId before its first `-`
pub fn collection_code(package_id: &str) -> &str {
    match package_id.split_once('-') {
        Some((code, _)) if !code.is_empty() => code,
        _ => UNKNOWN_COLLECTION,
    }
}

/// Year directory for an issued date.
///
/// Tries a few date/datetime formats on the first 19 characters, then the
/// first four characters if they are digits, else [`UNKNOWN_YEAR`].
pub fn year_from_date(date_issued: Option<&str>) -> String {
    let Some(date) = date_issued.map(str::trim).filter(|d| !d.is_empty()) else {
        return UNKNOWN_YEAR.to_string();
    };
    let head = date.get(..19).unwrap_or(date);

    if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
        return d.year().to_string();
    }
    for fmt in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(head, fmt) {
            return dt.year().to_string();
        }
    }

    match date.get(..4) {
        Some(year) if year.chars().all(|c| c.is_ascii_digit()) => year.to_string(),
        _ => UNKNOWN_YEAR.to_string(),
    }
}

/// Keep a path component inside its parent directory
fn sanitize_component(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    if cleaned == "." || cleaned == ".." {
        cleaned.replace('.', "_")
    } else {
        cleaned
    }
}

/// Where `kind` of `record` lands under `root`
pub fn destination_path(root: &Path, record: &Record, kind: AssetKind) -> PathBuf {
    root.join(sanitize_component(record.collection_code()))
        .join(record.year())
        .join(format!("{}.{}", sanitize_component(&record.id), kind.name()))
}
