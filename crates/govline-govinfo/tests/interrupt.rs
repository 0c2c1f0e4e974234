//! Shutdown requested while records are being processed.
//!
//! The flag is process-wide, so this binary holds a single test.

mod common;

use serde_json::json;
use tempfile::TempDir;

use common::{BASE, Reply, ScriptedTransport, page_of, summary_url};
use govline_core::{ProgressContext, RecordingSleeper};
use govline_govinfo::{StopReason, run};

const IDS: [&str; 5] = ["BILLS-1", "BILLS-2", "BILLS-3", "BILLS-4", "BILLS-5"];

#[test]
fn workers_stop_before_the_next_record() {
    let dir = TempDir::new().unwrap();
    let transport = ScriptedTransport::new();
    transport.page("*", page_of(&IDS, None));
    for id in IDS {
        let pdf = format!("{BASE}/packages/{id}/pdf");
        transport
            .summary(id, json!({"pdfLink": pdf}))
            .on(pdf, [Reply::ok(format!("pdf of {id}"))]);
    }
    let summary_of_2 = json!({"packageId": "BILLS-2", "download": {"pdfLink": format!("{BASE}/packages/BILLS-2/pdf")}});
    transport.replace(
        summary_url("BILLS-2"),
        [Reply::shutdown_then(Reply::json(summary_of_2))],
    );

    let summary = run(
        &common::config(dir.path()),
        &transport,
        &RecordingSleeper::new(),
        &ProgressContext::hidden(),
    )
    .unwrap();

    assert_eq!(summary.stop, StopReason::NoNextPage);
    assert_eq!(summary.discovered, 5);
    assert_eq!(summary.processed, 2);
    assert!(summary.processed < summary.discovered);
    assert!(summary.interrupted);
    for id in ["BILLS-3", "BILLS-4", "BILLS-5"] {
        assert!(transport.requests_to(&summary_url(id)).is_empty(), "{id} was fetched");
    }
    assert!(dir.path().join("BILLS/2019/BILLS-1.pdf").exists());
    assert!(!dir.path().join("BILLS/2019/BILLS-3.pdf").exists());
}
