//! OS keychain backend via the `keyring` crate.
//!
//! Each service URL maps to one keychain entry under a fixed account name.
//! The entry's password is a small JSON document holding the username and
//! the encoded token, so a lookup by service URL alone is enough to rebuild
//! the record.

use hv_core::{SecretRecord, SecretStore, StoreError};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Account name every entry is stored under.
const ACCOUNT: &str = "harvest-cli";

#[derive(Serialize, Deserialize)]
struct Payload {
    username: String,
    secret: String,
}

/// Secret store backed by the platform keychain.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeychainStore;

impl KeychainStore {
    pub const fn new() -> Self {
        Self
    }

    fn entry(service_url: &str) -> Result<Entry, StoreError> {
        Entry::new(service_url, ACCOUNT).map_err(|err| map_error(service_url, err))
    }
}

fn map_error(service_url: &str, err: keyring::Error) -> StoreError {
    match err {
        keyring::Error::NoEntry => StoreError::NotFound {
            service_url: service_url.to_string(),
        },
        keyring::Error::BadEncoding(_) => StoreError::Corrupt {
            service_url: service_url.to_string(),
            message: "keychain entry is not valid UTF-8".to_string(),
        },
        other => StoreError::unavailable(service_url, other),
    }
}

fn encode_payload(record: &SecretRecord) -> Result<String, StoreError> {
    serde_json::to_string(&Payload {
        username: record.username.clone(),
        secret: record.secret.clone(),
    })
    .map_err(|err| StoreError::Corrupt {
        service_url: record.service_url.clone(),
        message: err.to_string(),
    })
}

fn decode_payload(service_url: &str, raw: &str) -> Result<SecretRecord, StoreError> {
    let payload: Payload = serde_json::from_str(raw).map_err(|err| StoreError::Corrupt {
        service_url: service_url.to_string(),
        message: err.to_string(),
    })?;
    Ok(SecretRecord {
        service_url: service_url.to_string(),
        username: payload.username,
        secret: payload.secret,
    })
}

impl SecretStore for KeychainStore {
    fn get(&self, service_url: &str) -> Result<SecretRecord, StoreError> {
        let raw = Self::entry(service_url)?
            .get_password()
            .map_err(|err| map_error(service_url, err))?;
        decode_payload(service_url, &raw)
    }

    fn put(&self, record: &SecretRecord) -> Result<(), StoreError> {
        let entry = Self::entry(&record.service_url)?;
        match entry.get_password() {
            Ok(_) => {
                return Err(StoreError::AlreadyExists {
                    service_url: record.service_url.clone(),
                });
            }
            Err(keyring::Error::NoEntry) => {}
            Err(err) => return Err(map_error(&record.service_url, err)),
        }

        let payload = encode_payload(record)?;
        entry
            .set_password(&payload)
            .map_err(|err| map_error(&record.service_url, err))?;
        debug!(service_url = %record.service_url, "wrote keychain entry");
        Ok(())
    }

    fn delete(&self, service_url: &str) -> Result<(), StoreError> {
        match Self::entry(service_url)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(map_error(service_url, err)),
        }
    }
}
