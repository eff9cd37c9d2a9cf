//! Shared utilities for CLI commands.

use std::io::BufRead;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use hv_core::SecretStore;

use crate::Config;

/// Parse a `--day` value relative to `today`.
///
/// Supports:
/// - ISO 8601 dates: "2026-03-14"
/// - "today" and "yesterday"
pub fn parse_day(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    match s.trim().to_ascii_lowercase().as_str() {
        "today" => Ok(today),
        "yesterday" => today
            .checked_sub_days(Days::new(1))
            .context("no day before the earliest representable date"),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").with_context(|| {
            format!("Invalid day: {s}. Use YYYY-MM-DD (e.g., 2026-03-14), 'today' or 'yesterday'")
        }),
    }
}

/// Runtime for driving the async API client from synchronous commands.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")
}

/// Opens the secret store selected in `config`.
pub fn open_store(config: &Config) -> Result<Box<dyn SecretStore>> {
    hv_store::open_secret_store(&config.store_options()).context("failed to open secret store")
}

/// Reads one line from `reader`, without the trailing newline.
pub fn read_secret_line<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let secret = line.trim_end_matches(['\r', '\n']).to_string();
    if secret.is_empty() {
        anyhow::bail!("no password on stdin");
    }
    Ok(secret)
}
