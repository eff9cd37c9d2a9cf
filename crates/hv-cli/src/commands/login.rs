//! Login command: verify a credential with Harvest and store it.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use hv_api::Client;
use hv_core::{Credential, LoginNotice, Materialized, OrgSlug, SecretStore};

use super::util;
use crate::{Config, LoginArgs, persist_session};

const PASSWORD_PROMPT: &str = "Please enter the password for your Harvest account: ";

/// Verifies `email`/`password` against `org` and writes the credential.
///
/// Nothing is stored unless the service accepts the credential.
pub async fn login(
    client: &Client,
    store: &dyn SecretStore,
    email: &str,
    password: &str,
    org: &OrgSlug,
    force: bool,
) -> Result<Materialized> {
    let credential = Credential::new(email, password).context("invalid login details")?;

    let user_id = client.verify(&credential, org).await?.into_user_id(org)?;
    tracing::debug!(%org, %user_id, "credential accepted");

    let endpoint = client.endpoint();
    let materialized = if force {
        hv_core::materialize_replacing(store, credential, org, user_id, endpoint)
    } else {
        hv_core::materialize(store, credential, org, user_id, endpoint)
    }
    .context("failed to store credential")?;
    Ok(materialized)
}

/// Reads the password from a masked prompt, or from stdin with
/// `--password-stdin`.
pub fn read_password(args: &LoginArgs) -> Result<String> {
    if args.password_stdin {
        return util::read_secret_line(&mut std::io::stdin().lock());
    }
    let password = rpassword::prompt_password(PASSWORD_PROMPT).context("failed to read password")?;
    if password.is_empty() {
        anyhow::bail!("no password entered");
    }
    Ok(password)
}

pub fn run<W: Write>(
    writer: &mut W,
    config: &Config,
    store: &dyn SecretStore,
    state_path: &Path,
    args: &LoginArgs,
    password: &str,
) -> Result<()> {
    let org = Client::parse_org(&args.org)?;
    let client = Client::new(config.client_options()?)?;

    let materialized = util::runtime()?.block_on(login(
        &client,
        store,
        &args.email,
        password,
        &org,
        args.force,
    ))?;
    if let Some(state) = &materialized.state {
        persist_session(state_path, state)?;
    }

    let host = client.endpoint().organization_host(&org);
    match (materialized.notice, &materialized.state) {
        (LoginNotice::Created, _) => writeln!(writer, "Login successful, welcome to Harvest!")?,
        (LoginNotice::AlreadyLoggedIn, Some(_)) => writeln!(writer, "You're already logged in!")?,
        (LoginNotice::AlreadyLoggedIn, None) => writeln!(
            writer,
            "Another account is already logged in to {host}. \
             Run `harvest login --force` to replace it."
        )?,
        (LoginNotice::Replaced, _) => writeln!(
            writer,
            "Login successful, replaced the stored credential for {host}."
        )?,
    }
    Ok(())
}

/// Validates `--org` before the password prompt is shown.
pub fn check_org(args: &LoginArgs) -> Result<()> {
    Client::parse_org(&args.org)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use hv_core::{MemoryStore, SecretRecord};
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;

    const SERVICE_URL: &str = "https://acme.harvestapp.com";

    fn config_for(server: &MockServer) -> Config {
        Config {
            api_origin: Some(server.base_url()),
            ..Config::default()
        }
    }

    fn args(org: &str) -> LoginArgs {
        LoginArgs {
            email: "a@b.com".to_string(),
            org: org.to_string(),
            force: false,
            password_stdin: true,
        }
    }

    fn read_state(path: &Path) -> Config {
        Config::load_from(Some(path)).unwrap()
    }

    #[test]
    fn test_login_stores_credential_and_state() {
        let server = MockServer::start();
        let who_am_i = server.mock(|when, then| {
            when.method(GET)
                .path("/account/who_am_i")
                .header("authorization", "Basic YUBiLmNvbTpwdw==");
            then.status(200).json_body(json!({"user": {"id": 42}}));
        });
        let temp = tempfile::tempdir().unwrap();
        let state_path = temp.path().join("config.toml");
        let store = MemoryStore::new();

        let mut output = Vec::new();
        run(
            &mut output,
            &config_for(&server),
            &store,
            &state_path,
            &args("acme"),
            "pw",
        )
        .unwrap();

        who_am_i.assert_calls(1);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Login successful, welcome to Harvest!\n"
        );
        assert_eq!(store.len(), 1);
        let record = store.get(SERVICE_URL).unwrap();
        assert_eq!(record.username, "a@b.com");
        assert_eq!(record.secret, "YUBiLmNvbTpwdw==");

        let state = read_state(&state_path);
        assert_eq!(state.org.as_deref(), Some("acme"));
        assert_eq!(state.user_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_login_rejected_writes_nothing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/account/who_am_i");
            then.status(401);
        });
        let temp = tempfile::tempdir().unwrap();
        let state_path = temp.path().join("config.toml");
        let store = MemoryStore::new();

        let mut output = Vec::new();
        let err = run(
            &mut output,
            &config_for(&server),
            &store,
            &state_path,
            &args("acme"),
            "wrong",
        )
        .unwrap_err();

        assert!(err.to_string().contains("incorrect email or password"));
        assert!(output.is_empty());
        assert!(store.is_empty());
        assert!(!state_path.exists());
    }

    #[test]
    fn test_login_unknown_org_writes_nothing() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/account/who_am_i");
            then.status(404);
        });
        let temp = tempfile::tempdir().unwrap();
        let state_path = temp.path().join("config.toml");
        let store = MemoryStore::new();

        let err = run(
            &mut Vec::new(),
            &config_for(&server),
            &store,
            &state_path,
            &args("nosuchorg"),
            "pw",
        )
        .unwrap_err();

        assert!(err.to_string().contains("could not be found"));
        assert!(store.is_empty());
        assert!(!state_path.exists());
    }

    #[test]
    fn test_login_invalid_org_makes_no_request() {
        let server = MockServer::start();
        let who_am_i = server.mock(|when, then| {
            when.method(GET).path("/account/who_am_i");
            then.status(200).json_body(json!({"user": {"id": "42"}}));
        });
        let temp = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();

        assert!(check_org(&args("acme/../evil")).is_err());
        let result = run(
            &mut Vec::new(),
            &config_for(&server),
            &store,
            &temp.path().join("config.toml"),
            &args("acme/../evil"),
            "pw",
        );

        assert!(result.is_err());
        who_am_i.assert_calls(0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_login_twice_reports_already_logged_in() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/account/who_am_i");
            then.status(200).json_body(json!({"user": {"id": "42"}}));
        });
        let temp = tempfile::tempdir().unwrap();
        let state_path = temp.path().join("config.toml");
        let store = MemoryStore::new();
        let previous = Credential::new("a@b.com", "old").unwrap();
        store.put(&SecretRecord::new(SERVICE_URL, &previous)).unwrap();

        let mut output = Vec::new();
        run(
            &mut output,
            &config_for(&server),
            &store,
            &state_path,
            &args("acme"),
            "pw",
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "You're already logged in!\n"
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(SERVICE_URL).unwrap().secret, previous.token());
        assert_eq!(read_state(&state_path).user_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_login_as_other_account_leaves_state_unchanged() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/account/who_am_i");
            then.status(200).json_body(json!({"user": {"id": 999}}));
        });
        let temp = tempfile::tempdir().unwrap();
        let state_path = temp.path().join("config.toml");
        std::fs::write(&state_path, "org = \"acme\"\nuser_id = \"42\"\n").unwrap();
        let store = MemoryStore::new();
        let alice = Credential::new("alice@b.com", "pw").unwrap();
        store.put(&SecretRecord::new(SERVICE_URL, &alice)).unwrap();

        let mut bob = args("acme");
        bob.email = "bob@b.com".to_string();
        let mut output = Vec::new();
        run(
            &mut output,
            &config_for(&server),
            &store,
            &state_path,
            &bob,
            "pw",
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Another account is already logged in to acme.harvestapp.com. \
             Run `harvest login --force` to replace it.\n"
        );
        assert_eq!(store.get(SERVICE_URL).unwrap().username, "alice@b.com");
        assert_eq!(read_state(&state_path).user_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_login_force_replaces_credential() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/account/who_am_i");
            then.status(200).json_body(json!({"user": {"id": "42"}}));
        });
        let temp = tempfile::tempdir().unwrap();
        let state_path = temp.path().join("config.toml");
        let store = MemoryStore::new();
        let previous = Credential::new("a@b.com", "old").unwrap();
        store.put(&SecretRecord::new(SERVICE_URL, &previous)).unwrap();

        let mut output = Vec::new();
        let mut forced = args("acme");
        forced.force = true;
        run(
            &mut output,
            &config_for(&server),
            &store,
            &state_path,
            &forced,
            "pw",
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Login successful, replaced the stored credential for acme.harvestapp.com.\n"
        );
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(SERVICE_URL).unwrap().secret, "YUBiLmNvbTpwdw==");
    }
}
