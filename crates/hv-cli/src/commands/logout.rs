//! Logout command: forget the stored credential and login state.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use hv_core::SecretStore;

use crate::{Config, clear_session};

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    store: &dyn SecretStore,
    state_path: &Path,
) -> Result<()> {
    let Some(org) = config.configured_org()? else {
        writeln!(writer, "Not logged in.")?;
        return Ok(());
    };

    let service_url = config.endpoint()?.service_url(&org);
    store
        .delete(&service_url)
        .with_context(|| format!("failed to remove credential for {service_url}"))?;
    clear_session(state_path)?;
    tracing::info!(%org, %service_url, "logged out");

    writeln!(writer, "Logged out of {org}.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use hv_core::{Credential, MemoryStore, OrgSlug, SecretRecord, SessionState};

    use crate::persist_session;

    #[test]
    fn test_logout_removes_credential_and_state() {
        let temp = tempfile::tempdir().unwrap();
        let state_path = temp.path().join("config.toml");
        persist_session(
            &state_path,
            &SessionState {
                org: OrgSlug::parse("acme").unwrap(),
                user_id: "42".to_string(),
            },
        )
        .unwrap();
        let config = Config::load_from(Some(&state_path)).unwrap();
        let store = MemoryStore::new();
        let credential = Credential::new("a@b.com", "pw").unwrap();
        store
            .put(&SecretRecord::new("https://acme.harvestapp.com", &credential))
            .unwrap();

        let mut output = Vec::new();
        run(&mut output, &config, &store, &state_path).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), "Logged out of acme.\n");
        assert!(store.is_empty());
        let after = Config::load_from(Some(&state_path)).unwrap();
        assert!(after.org.is_none());
        assert!(after.user_id.is_none());
    }

    #[test]
    fn test_logout_when_not_logged_in() {
        let temp = tempfile::tempdir().unwrap();
        let mut output = Vec::new();
        run(
            &mut output,
            &Config::default(),
            &MemoryStore::new(),
            &temp.path().join("config.toml"),
        )
        .unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Not logged in.\n");
    }

    #[test]
    fn test_logout_with_missing_record_still_clears_state() {
        let temp = tempfile::tempdir().unwrap();
        let state_path = temp.path().join("config.toml");
        std::fs::write(&state_path, "org = \"acme\"\nuser_id = \"42\"\n").unwrap();
        let config = Config::load_from(Some(&state_path)).unwrap();

        run(&mut Vec::new(), &config, &MemoryStore::new(), &state_path).unwrap();

        assert!(Config::load_from(Some(&state_path)).unwrap().org.is_none());
    }
}
