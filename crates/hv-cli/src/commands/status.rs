//! Status command for showing the configured organization and credential.

use std::io::Write;

use anyhow::Result;
use hv_core::{SecretStore, StoreError};
use hv_store::SecretStoreKind;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config, store: &dyn SecretStore) -> Result<()> {
    let backend = match config.secret_store {
        SecretStoreKind::Keychain => "keychain".to_string(),
        SecretStoreKind::File => format!("file ({})", config.secrets_path.display()),
    };

    writeln!(writer, "Harvest status")?;
    writeln!(writer, "Secret store: {backend}")?;

    let Some(org) = config.configured_org()? else {
        writeln!(writer, "Not logged in. Run `harvest login` to get started.")?;
        return Ok(());
    };
    let service_url = config.endpoint()?.service_url(&org);

    writeln!(writer, "Organization: {org} ({service_url})")?;
    writeln!(
        writer,
        "User id: {}",
        config.user_id.as_deref().unwrap_or("unknown")
    )?;
    match store.get(&service_url) {
        Ok(record) => writeln!(writer, "Credential: stored for {}", record.username)?,
        Err(StoreError::NotFound { .. }) => {
            writeln!(writer, "Credential: missing, run `harvest login` again")?;
        }
        Err(err) => writeln!(writer, "Credential: unavailable ({err})")?,
    }

    Ok(())
}
