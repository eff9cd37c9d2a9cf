//! Secret store capability.
//!
//! The CLI never talks to a platform keychain directly; it goes through
//! [`SecretStore`], which has one record per service URL. Platform backends
//! live in `hv-store`; [`MemoryStore`] is here so tests and embedders can run
//! without one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::credential::Credential;

/// Errors reported by a secret store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the key.
    #[error("no credential stored for {service_url}")]
    NotFound { service_url: String },
    /// A record already exists for the key and the backend will not replace it.
    #[error("a credential is already stored for {service_url}")]
    AlreadyExists { service_url: String },
    /// The backing store could not be reached or refused the operation.
    #[error("secret store unavailable for {service_url}: {source}")]
    Unavailable {
        service_url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The stored payload could not be read back.
    #[error("stored credential for {service_url} is corrupt: {message}")]
    Corrupt {
        service_url: String,
        message: String,
    },
}

impl StoreError {
    pub fn unavailable(
        service_url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Unavailable {
            service_url: service_url.into(),
            source: source.into(),
        }
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A stored credential keyed by service URL.
///
/// `secret` holds the encoded Basic token, never the plaintext password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub service_url: String,
    pub username: String,
    pub secret: String,
}

impl SecretRecord {
    pub fn new(service_url: impl Into<String>, credential: &Credential) -> Self {
        Self {
            service_url: service_url.into(),
            username: credential.identifier().to_string(),
            secret: credential.token().to_string(),
        }
    }

    /// The credential this record was written from.
    pub fn credential(&self) -> Credential {
        Credential::from_parts(self.username.clone(), self.secret.clone())
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("service_url", &self.service_url)
            .field("username", &self.username)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Get/put/delete over one record per service URL.
///
/// Implementations are not expected to coordinate between processes; they
/// rely on whatever atomicity the underlying store provides.
pub trait SecretStore: Send + Sync {
    /// Exact-key lookup.
    fn get(&self, service_url: &str) -> Result<SecretRecord, StoreError>;

    /// Inserts a record. A duplicate key is reported as
    /// [`StoreError::AlreadyExists`] and the existing record is kept.
    fn put(&self, record: &SecretRecord) -> Result<(), StoreError>;

    /// Removes a record. A missing key is not an error.
    fn delete(&self, service_url: &str) -> Result<(), StoreError>;

    fn exists(&self, service_url: &str) -> Result<bool, StoreError> {
        match self.get(service_url) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Process-local store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, SecretRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SecretRecord>> {
        // A panic while holding the lock cannot leave a half-written record.
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SecretStore for MemoryStore {
    fn get(&self, service_url: &str) -> Result<SecretRecord, StoreError> {
        self.lock()
            .get(service_url)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                service_url: service_url.to_string(),
            })
    }

    fn put(&self, record: &SecretRecord) -> Result<(), StoreError> {
        let mut records = self.lock();
        if records.contains_key(&record.service_url) {
            return Err(StoreError::AlreadyExists {
                service_url: record.service_url.clone(),
            });
        }
        records.insert(record.service_url.clone(), record.clone());
        Ok(())
    }

    fn delete(&self, service_url: &str) -> Result<(), StoreError> {
        self.lock().remove(service_url);
        Ok(())
    }
}
