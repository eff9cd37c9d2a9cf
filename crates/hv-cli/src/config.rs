//! Configuration loading and management.
//!
//! Settings are layered: built-in defaults, then `config.toml` in the
//! platform config directory, then an explicit `--config` file, then
//! `HARVEST_*` environment variables.
//!
//! Only the login state (`org`, `user_id`) is ever written back, and only by
//! `login` and `logout`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use hv_api::{ClientOptions, Url};
use hv_core::{DEFAULT_SERVICE_DOMAIN, Endpoint, OrgSlug, SessionState};
use hv_store::{SecretStoreKind, StoreOptions};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.toml";
const SECRETS_FILE: &str = "secrets.json";

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Organization slug written by `login`.
    pub org: Option<String>,
    /// Harvest user id written by `login`.
    pub user_id: Option<String>,
    /// Domain organizations are hosted under.
    pub service_domain: String,
    /// Send API requests to this origin (scheme, host and port only) instead
    /// of the organization host.
    pub api_origin: Option<String>,
    /// Where credentials are kept.
    pub secret_store: SecretStoreKind,
    /// Encrypted secrets file, used when `secret_store = "file"`.
    pub secrets_path: PathBuf,
    /// Passphrase for the encrypted secrets file.
    pub store_passphrase: Option<String>,
    /// Request timeout. Unset means no timeout.
    pub request_timeout_secs: Option<u64>,
    /// Project id used by `add` when `--project` is not given.
    pub default_project_id: Option<String>,
    /// Task id used by `add` when `--task` is not given.
    pub default_task_id: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("org", &self.org)
            .field("user_id", &self.user_id)
            .field("service_domain", &self.service_domain)
            .field("api_origin", &self.api_origin)
            .field("secret_store", &self.secret_store)
            .field("secrets_path", &self.secrets_path)
            .field(
                "store_passphrase",
                &self.store_passphrase.as_ref().map(|_| "[REDACTED]"),
            )
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("default_project_id", &self.default_project_id)
            .field("default_task_id", &self.default_task_id)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            org: None,
            user_id: None,
            service_domain: DEFAULT_SERVICE_DOMAIN.to_string(),
            api_origin: None,
            secret_store: SecretStoreKind::default(),
            secrets_path: data_dir.join(SECRETS_FILE),
            store_passphrase: None,
            request_timeout_secs: None,
            default_project_id: None,
            default_task_id: None,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join(CONFIG_FILE)));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (HARVEST_*)
        figment = figment.merge(Env::prefixed("HARVEST_"));

        figment.extract()
    }

    pub fn endpoint(&self) -> Result<Endpoint> {
        Endpoint::new(&self.service_domain)
            .with_context(|| format!("invalid service_domain {:?}", self.service_domain))
    }

    pub fn client_options(&self) -> Result<ClientOptions> {
        let api_origin = self
            .api_origin
            .as_deref()
            .map(|origin| {
                Url::parse(origin).with_context(|| format!("invalid api_origin {origin:?}"))
            })
            .transpose()?;
        Ok(ClientOptions {
            endpoint: self.endpoint()?,
            api_origin,
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            kind: self.secret_store,
            path: self.secrets_path.clone(),
            passphrase: self.store_passphrase.clone(),
        }
    }

    /// The logged-in organization, if any.
    pub fn configured_org(&self) -> Result<Option<OrgSlug>> {
        self.org
            .as_deref()
            .map(|org| {
                OrgSlug::parse(org).with_context(|| format!("invalid org {org:?} in configuration"))
            })
            .transpose()
    }
}

/// The file login state is written to: `--config` if given, else the
/// default `config.toml`.
pub fn state_file(config_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = config_path {
        return Ok(path.to_path_buf());
    }
    let dir = dirs_config_path().context("could not determine config directory")?;
    Ok(dir.join(CONFIG_FILE))
}

/// Replaces `org` and `user_id` in `path`, keeping every other key.
pub fn persist_session(path: &Path, state: &SessionState) -> Result<()> {
    let mut table = read_table(path)?;
    table.insert(
        "org".to_string(),
        toml::Value::String(state.org.to_string()),
    );
    table.insert(
        "user_id".to_string(),
        toml::Value::String(state.user_id.clone()),
    );
    write_table(path, &table)?;
    tracing::debug!(path = %path.display(), org = %state.org, "persisted login state");
    Ok(())
}

/// Removes `org` and `user_id` from `path`. A missing file is left missing.
pub fn clear_session(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let mut table = read_table(path)?;
    let had_org = table.remove("org").is_some();
    let had_user = table.remove("user_id").is_some();
    if had_org || had_user {
        write_table(path, &table)?;
    }
    Ok(())
}

fn read_table(path: &Path) -> Result<toml::Table> {
    match std::fs::read_to_string(path) {
        Ok(content) => content
            .parse::<toml::Table>()
            .with_context(|| format!("failed to parse {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(toml::Table::new()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn write_table(path: &Path, table: &toml::Table) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    let content = toml::to_string(table).context("failed to serialize configuration")?;
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Returns the platform-specific config directory for harvest.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("harvest"))
}

/// Returns the platform-specific data directory for harvest.
///
/// On Linux: `~/.local/share/harvest`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("harvest"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn state(org: &str, user_id: &str) -> SessionState {
        SessionState {
            org: OrgSlug::parse(org).unwrap(),
            user_id: user_id.to_string(),
        }
    }

    #[test]
    fn test_dirs_data_path_ends_with_harvest() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "harvest");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_domain, "harvestapp.com");
        assert_eq!(config.secret_store, SecretStoreKind::Keychain);
        assert_eq!(
            config.secrets_path,
            dirs_data_path().unwrap().join("secrets.json")
        );
        assert!(config.org.is_none());
        assert!(config.configured_org().unwrap().is_none());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
org = "acme"
user_id = "42"
service_domain = "harvest.test"
secret_store = "file"
request_timeout_secs = 5
default_project_id = "101"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.org.as_deref(), Some("acme"));
        assert_eq!(config.user_id.as_deref(), Some("42"));
        assert_eq!(config.secret_store, SecretStoreKind::File);
        assert_eq!(config.default_project_id.as_deref(), Some("101"));

        let options = config.client_options().unwrap();
        assert_eq!(options.endpoint.domain(), "harvest.test");
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert!(options.api_origin.is_none());
    }

    #[test]
    fn test_invalid_api_origin_is_reported() {
        let config = Config {
            api_origin: Some("not a url".to_string()),
            ..Config::default()
        };
        let err = config.client_options().unwrap_err();
        assert!(err.to_string().contains("api_origin"));
    }

    #[test]
    fn test_invalid_configured_org_is_reported() {
        let config = Config {
            org: Some("acme/evil".to_string()),
            ..Config::default()
        };
        assert!(config.configured_org().is_err());
    }

    #[test]
    fn test_debug_redacts_passphrase() {
        let config = Config {
            store_passphrase: Some("hunter2".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_state_file_prefers_explicit_path() {
        let path = Path::new("/tmp/custom.toml");
        assert_eq!(state_file(Some(path)).unwrap(), path);
    }

    #[test]
    fn test_persist_session_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        persist_session(&path, &state("acme", "42")).unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.org.as_deref(), Some("acme"));
        assert_eq!(config.user_id.as_deref(), Some("42"));
    }

    #[test]
    fn test_persist_session_overwrites_state_and_keeps_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "org = \"old\"\nuser_id = \"1\"\nsecret_store = \"file\"\n",
        )
        .unwrap();

        persist_session(&path, &state("acme", "42")).unwrap();

        let table: toml::Table = std::fs::read_to_string(&path).unwrap().parse().unwrap();
        assert_eq!(table["org"].as_str(), Some("acme"));
        assert_eq!(table["user_id"].as_str(), Some("42"));
        assert_eq!(table["secret_store"].as_str(), Some("file"));
    }

    #[test]
    fn test_clear_session_removes_only_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "org = \"acme\"\nuser_id = \"42\"\ndefault_task_id = \"7\"\n")
            .unwrap();

        clear_session(&path).unwrap();

        let table: toml::Table = std::fs::read_to_string(&path).unwrap().parse().unwrap();
        assert!(!table.contains_key("org"));
        assert!(!table.contains_key("user_id"));
        assert_eq!(table["default_task_id"].as_str(), Some("7"));
    }

    #[test]
    fn test_clear_session_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        clear_session(&path).unwrap();
        assert!(!path.exists());
    }
}
