//! Add command: submit hours for a day.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use hv_api::{Client, DailyEntry};
use hv_core::SecretStore;

use super::util;
use crate::{AddArgs, Config};

/// Builds the entry from flags, falling back to configured defaults.
pub fn build_entry(config: &Config, args: &AddArgs, today: NaiveDate) -> Result<DailyEntry> {
    let spent_at = match args.day.as_deref() {
        Some(day) => util::parse_day(day, today)?,
        None => today,
    };
    let project = args
        .project
        .as_deref()
        .or(config.default_project_id.as_deref());
    let task = args.task.as_deref().or(config.default_task_id.as_deref());

    Ok(DailyEntry::new(
        &args.hours,
        args.message.as_deref(),
        project,
        task,
        spent_at,
    )?)
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    store: &dyn SecretStore,
    args: &AddArgs,
    today: NaiveDate,
) -> Result<()> {
    // Bad input is reported before the credential is looked up.
    let entry = build_entry(config, args, today)?;

    let org = config.configured_org()?;
    let client = Client::new(config.client_options()?)?;
    let authorized = client.authorize(store, org.as_ref())?;
    tracing::debug!(org = %authorized.org(), user = authorized.username(), "submitting entry");

    util::runtime()?.block_on(authorized.add_daily(&entry))?;

    writeln!(writer, "Added hours successfully!")?;
    Ok(())
}
