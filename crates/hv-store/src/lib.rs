//! Secret store backends for the Harvest CLI.
//!
//! Provides [`hv_core::SecretStore`] implementations for:
//! - the OS keychain (macOS Keychain, Windows Credential Manager, Linux
//!   Secret Service) via `keyring`
//! - a passphrase-encrypted file, for machines without a usable keychain
//!
//! [`open_secret_store`] picks one from configuration.

mod file;
mod keychain;

use std::path::PathBuf;

use hv_core::SecretStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::{EncryptedFileStore, KdfParams};
pub use keychain::KeychainStore;

/// Which backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretStoreKind {
    #[default]
    Keychain,
    File,
}

/// Settings needed to open a backend.
#[derive(Clone)]
pub struct StoreOptions {
    pub kind: SecretStoreKind,
    /// Location of the encrypted file (file backend only).
    pub path: PathBuf,
    /// Passphrase for the encrypted file (file backend only).
    pub passphrase: Option<String>,
}

/// Errors from opening a backend.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("the file secret store needs a passphrase (set HARVEST_STORE_PASSPHRASE)")]
    MissingPassphrase,
}

/// Opens the configured backend.
pub fn open_secret_store(options: &StoreOptions) -> Result<Box<dyn SecretStore>, OpenError> {
    match options.kind {
        SecretStoreKind::Keychain => {
            tracing::debug!("using keychain secret store");
            Ok(Box::new(KeychainStore::new()))
        }
        SecretStoreKind::File => {
            let passphrase = options
                .passphrase
                .as_deref()
                .filter(|value| !value.is_empty())
                .ok_or(OpenError::MissingPassphrase)?;
            tracing::debug!(path = %options.path.display(), "using encrypted file secret store");
            Ok(Box::new(EncryptedFileStore::new(
                options.path.clone(),
                passphrase,
            )))
        }
    }
}
