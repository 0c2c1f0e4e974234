//! Cursor pagination over the Published service
//!
//! Walks `/published/{start}/{end}` with `offsetMark` until the server runs
//! out of items, stops handing out cursors, or repeats one. Failures end
//! discovery with whatever was collected; they are never raised.

use indicatif::ProgressBar;
use rustc_hash::FxHashSet;
use serde_json::Value;

use govline_core::{fmt_num, is_shutdown_requested};

use crate::api::GovInfoClient;
use crate::config::DateRange;
use crate::state::Record;

/// Cursor for the first page
pub const INITIAL_CURSOR: &str = "*";

/// Keys that have held the item list across API versions, tried in order
pub const ITEM_LIST_KEYS: &[&str] = &["packages", "results", "records"];

const ID_KEYS: &[&str] = &["packageId", "package_id"];
const DATE_KEYS: &[&str] = &["dateIssued", "date_issued"];

/// Filter and limits for one discovery walk
#[derive(Debug, Clone)]
pub struct DiscoveryQuery {
    pub collections: Vec<String>,
    pub date_range: DateRange,
    pub page_size: u32,
    pub max_records: Option<usize>,
}

/// Why discovery ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Page carried no items under any known key
    EmptyPage,
    /// Page carried no `nextPage`
    NoNextPage,
    /// `nextPage` pointed at a cursor already visited
    CursorCycle(String),
    /// `max_records` reached
    MaxRecords,
    /// Page request or decode failed; partial results kept
    RequestFailed(String),
    Shutdown,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPage => f.write_str("no more results"),
            Self::NoNextPage => f.write_str("no next page"),
            Self::CursorCycle(c) => write!(f, "repeated offsetMark '{c}'"),
            Self::MaxRecords => f.write_str("max-packages limit reached"),
            Self::RequestFailed(e) => write!(f, "page request failed: {e}"),
            Self::Shutdown => f.write_str("shutdown requested"),
        }
    }
}

/// Result of one discovery walk
#[derive(Debug, Clone)]
pub struct Discovery {
    pub records: Vec<Record>,
    /// Page requests issued
    pub pages: usize,
    /// Items dropped for lacking an identifier
    pub skipped_items: usize,
    /// Items dropped because their id was already emitted
    pub duplicates: usize,
    pub stop: StopReason,
}

/// `collection` parameter: sorted, de-duplicated, comma-joined codes
pub fn collection_param(collections: &[String]) -> String {
    crate::config::normalize_collections(collections).join(",")
}

/// Item list of a page: the first candidate key holding an array.
///
/// `None` (no key matched) and an empty array both mean "no more results".
pub fn extract_items(page: &Value) -> Option<&[Value]> {
    ITEM_LIST_KEYS
        .iter()
        .find_map(|key| page.get(*key).and_then(Value::as_array))
        .map(Vec::as_slice)
}

/// Normalize `nextPage` to a cursor.
///
/// Accepts either a bare offset mark or a URL with an `offsetMark` query
/// parameter. Empty values mean there is no next page.
pub fn next_cursor(next_page: Option<&str>) -> Option<String> {
    let next_page = next_page.map(str::trim).filter(|s| !s.is_empty())?;

    if next_page.contains("offsetMark=") {
        // Relative links resolve against a placeholder host
        let url = reqwest::Url::parse(next_page)
            .or_else(|_| reqwest::Url::parse(RELATIVE_BASE).and_then(|base| base.join(next_page)));
        if let Ok(url) = url {
            if let Some((_, mark)) = url.query_pairs().find(|(k, _)| k == "offsetMark") {
                return Some(mark.into_owned()).filter(|m| !m.is_empty());
            }
        }
        // No query component: take the text after the parameter name
        if let Some((_, rest)) = next_page.split_once("offsetMark=") {
            let mark = rest.split('&').next().unwrap_or_default();
            return Some(decode_query_value(mark)).filter(|m| !m.is_empty());
        }
    }

    Some(next_page.to_string())
}

const RELATIVE_BASE: &str = "http://relative.invalid/";

/// Percent-decode one query value the way `query_pairs` does
fn decode_query_value(raw: &str) -> String {
    let Ok(mut url) = reqwest::Url::parse(RELATIVE_BASE) else {
        return raw.to_string();
    };
    url.set_query(Some(&format!("v={raw}")));
    url.query_pairs()
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| raw.to_string())
}

fn first_str<'v>(item: &'v Value, keys: &[&str]) -> Option<&'v str> {
    keys.iter()
        .find_map(|k| item.get(*k).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
}

/// Build a record from one page item; `None` if it has no identifier
pub fn record_from_item(item: &Value) -> Option<Record> {
    let id = first_str(item, ID_KEYS)?;
    Some(Record {
        id: id.to_string(),
        issued_date: first_str(item, DATE_KEYS).map(str::to_string),
        raw: item.clone(),
    })
}

/// Walk the Published service for `query`.
///
/// Never fails: request and decode errors end the walk and are reported
/// through [`Discovery::stop`].
pub fn discover(client: &GovInfoClient<'_>, query: &DiscoveryQuery, pb: &ProgressBar) -> Discovery {
    let path = format!(
        "/published/{}/{}",
        query.date_range.start_str(),
        query.date_range.end_str()
    );
    let collection = collection_param(&query.collections);
    let page_size = query.page_size.to_string();

    let mut records: Vec<Record> = Vec::new();
    let mut seen_ids: FxHashSet<String> = FxHashSet::default();
    let mut seen_cursors: FxHashSet<String> = FxHashSet::default();
    let mut cursor = INITIAL_CURSOR.to_string();
    seen_cursors.insert(cursor.clone());

    let mut pages = 0;
    let mut skipped_items = 0;
    let mut duplicates = 0;

    let stop = loop {
        if is_shutdown_requested() {
            log::warn!("Shutdown requested; stopping discovery");
            break StopReason::Shutdown;
        }

        pages += 1;
        pb.set_message(format!("page {pages}, {} packages", fmt_num(records.len())));
        log::debug!("Requesting published page {pages} (offsetMark={cursor})");

        let params = [
            ("offsetMark", cursor.as_str()),
            ("pageSize", page_size.as_str()),
            ("collection", collection.as_str()),
        ];
        let page = match client.get_json(&path, &params) {
            Ok(page) => page,
            Err(e) => {
                log::error!("Error fetching published data: {e}");
                break StopReason::RequestFailed(e.to_string());
            }
        };

        let items = match extract_items(&page) {
            Some(items) if !items.is_empty() => items,
            _ => {
                log::info!("No more results (empty page).");
                break StopReason::EmptyPage;
            }
        };

        let mut capped = false;
        for item in items {
            let Some(record) = record_from_item(item) else {
                skipped_items += 1;
                log::debug!("Skipping item without packageId: {item}");
                continue;
            };
            if !seen_ids.insert(record.id.clone()) {
                duplicates += 1;
                log::debug!("Skipping duplicate packageId {}", record.id);
                continue;
            }
            records.push(record);

            if query.max_records.is_some_and(|max| records.len() >= max) {
                capped = true;
                break;
            }
        }
        if capped {
            log::warn!(
                "Reached max-packages limit ({}); stopping discovery.",
                records.len()
            );
            break StopReason::MaxRecords;
        }

        let next_page = page.get("nextPage").and_then(Value::as_str);
        let Some(next) = next_cursor(next_page) else {
            log::info!("No nextPage value; finished traversal.");
            break StopReason::NoNextPage;
        };

        if !seen_cursors.insert(next.clone()) {
            log::warn!("Detected repeated offsetMark '{next}'; breaking to avoid loop.");
            break StopReason::CursorCycle(next);
        }
        cursor = next;
    };

    log::info!(
        "Discovery finished after {pages} page(s): {} packages ({stop})",
        fmt_num(records.len())
    );
    if skipped_items > 0 || duplicates > 0 {
        log::warn!("Dropped {skipped_items} item(s) without packageId and {duplicates} duplicate(s)");
    }

    Discovery {
        records,
        pages,
        skipped_items,
        duplicates,
        stop,
    }
}
