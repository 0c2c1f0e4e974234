//! An interrupted index run leaves the previous index in place.
//!
//! The flag is process-wide, so this binary holds a single test.

mod common;

use std::fs;

use tempfile::TempDir;

use common::{ScriptedTransport, page_of};
use govline_core::{ProgressContext, request_shutdown};
use govline_govinfo::build_index;
use govline_govinfo::index::INDEX_FILE_NAME;

#[test]
fn interrupted_index_keeps_previous_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(INDEX_FILE_NAME);
    let previous = "{\"packageId\":\"BILLS-1\"}\n{\"packageId\":\"BILLS-2\"}\n";
    fs::write(&path, previous).unwrap();

    let transport = ScriptedTransport::new();
    transport.page("*", page_of(&["BILLS-3"], None));

    request_shutdown();
    let summary = build_index(
        &common::config(dir.path()),
        &transport,
        &ProgressContext::hidden(),
    )
    .unwrap();

    assert!(summary.interrupted);
    assert!(!summary.replaced);
    assert_eq!(summary.written, 0);
    assert_eq!(fs::read_to_string(&path).unwrap(), previous);
    assert!(!dir.path().join(format!("{INDEX_FILE_NAME}.tmp")).exists());
}
