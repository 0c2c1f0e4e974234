//! Collections subcommand - list what the API can serve

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use govline_core::{HttpTransport, fmt_num};
use govline_govinfo::{ApiConfig, GovInfoClient, list_collections};

use crate::ConfigError;
use crate::config::{API_KEY_ENV, Config};

pub fn run(api_key: Option<String>, config: &Config) -> Result<ExitCode> {
    let Some(api_key) = config.resolve_api_key(api_key) else {
        return Err(anyhow::anyhow!(
            "GovInfo API key is required. Use --api-key or set {API_KEY_ENV}."
        )
        .context(ConfigError));
    };
    let api = ApiConfig {
        base_url: config.govinfo.api_base.clone(),
        api_key,
        timeout: Duration::from_secs(config.http.metadata_timeout),
    };

    let transport = HttpTransport::new();
    let collections = list_collections(&GovInfoClient::new(&transport, &api))?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Code").fg(Color::Cyan),
            Cell::new("Name").fg(Color::Cyan),
            Cell::new("Packages").fg(Color::Cyan),
            Cell::new("Granules").fg(Color::Cyan),
        ]);

    let count = |n: Option<u64>| {
        let text = n.map_or_else(|| "-".to_string(), |n| fmt_num(n as usize));
        Cell::new(text).set_alignment(CellAlignment::Right)
    };
    for c in &collections {
        table.add_row(vec![
            Cell::new(&c.code),
            Cell::new(&c.name),
            count(c.package_count),
            count(c.granule_count),
        ]);
    }

    println!("{table}");
    log::info!("{} collections", collections.len());
    Ok(ExitCode::SUCCESS)
}
