//! Tests against the live GovInfo API
//!
//! These need network access and a key in GOVINFO_API_KEY, so they are
//! marked #[ignore]. Run with:
//! GOVINFO_API_KEY=... cargo test -p govline-govinfo --test live -- --ignored

use chrono::NaiveDate;
use tempfile::TempDir;

use govline_core::{HttpTransport, ProgressContext, ThreadSleeper};
use govline_govinfo::{Config, GovInfoClient, RunArgs, list_collections, run};

fn api_key() -> String {
    std::env::var("GOVINFO_API_KEY").expect("GOVINFO_API_KEY must be set for live tests")
}

#[test]
#[ignore]
fn list_live_collections() {
    let config = live_config(&TempDir::new().unwrap());
    let transport = HttpTransport::new();
    let collections = list_collections(&GovInfoClient::new(&transport, &config.api))
        .expect("collections listing should succeed");

    assert!(
        collections.iter().any(|c| c.code == "BILLS"),
        "BILLS should be among {} collections",
        collections.len()
    );
}

/// Dry run over a week of bills: discovery and enrichment only
#[test]
#[ignore]
fn dry_run_one_week_of_bills() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = live_config(&dir);

    let summary = run(&config, &HttpTransport::new(), &ThreadSleeper, &ProgressContext::hidden())
        .expect("run should succeed");

    assert!(summary.discovered > 0, "expected packages for the week");
    assert!(summary.discovered <= 5);
    assert_eq!(summary.enrich_failed, 0);
    assert!(summary.planned > 0);
    assert_eq!(summary.downloaded, 0);
}

fn live_config(dir: &TempDir) -> Config {
    Config::try_from(RunArgs {
        api_key: Some(api_key()),
        collections: vec!["BILLS".into()],
        start_date: Some("2019-05-01".into()),
        end_date: Some("2019-05-07".into()),
        output_dir: dir.path().to_path_buf(),
        max_packages: Some(5),
        dry_run: true,
        ..RunArgs::new(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    })
    .expect("valid config")
}
