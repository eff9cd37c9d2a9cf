//! Passphrase-encrypted file backend.
//!
//! All records live in one JSON envelope:
//!
//! ```json
//! {"version":1,"kdf":{"m_cost":19456,"t_cost":2,"p_cost":1},
//!  "salt":"...","nonce":"...","ciphertext":"..."}
//! ```
//!
//! The key is derived from the passphrase with Argon2id and the record map is
//! sealed with ChaCha20-Poly1305. Every write draws a fresh salt and nonce and
//! replaces the file through a rename, so a reader sees either the old or
//! the new envelope.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hv_core::{SecretRecord, SecretStore, StoreError};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ENVELOPE_VERSION: u32 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Argon2 cost parameters, recorded in the envelope so files stay readable
/// when the defaults change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    kdf: KdfParams,
    salt: String,
    nonce: String,
    ciphertext: String,
}

type Records = BTreeMap<String, SecretRecord>;

/// Secret store kept in a single encrypted file.
pub struct EncryptedFileStore {
    path: PathBuf,
    passphrase: String,
    kdf: KdfParams,
}

impl fmt::Debug for EncryptedFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedFileStore")
            .field("path", &self.path)
            .field("passphrase", &"[REDACTED]")
            .field("kdf", &self.kdf)
            .finish()
    }
}

impl EncryptedFileStore {
    pub fn new(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self::with_params(path, passphrase, KdfParams::default())
    }

    pub fn with_params(
        path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
        kdf: KdfParams,
    ) -> Self {
        Self {
            path: path.into(),
            passphrase: passphrase.into(),
            kdf,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn derive_key(
        &self,
        service_url: &str,
        kdf: KdfParams,
        salt: &[u8],
    ) -> Result<[u8; KEY_LEN], StoreError> {
        let params = Params::new(kdf.m_cost, kdf.t_cost, kdf.p_cost, Some(KEY_LEN))
            .map_err(|err| StoreError::unavailable(service_url, err.to_string()))?;
        let mut key = [0u8; KEY_LEN];
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(self.passphrase.as_bytes(), salt, &mut key)
            .map_err(|err| StoreError::unavailable(service_url, err.to_string()))?;
        Ok(key)
    }

    fn load(&self, service_url: &str) -> Result<Records, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Records::new()),
            Err(err) => return Err(StoreError::unavailable(service_url, err)),
        };

        let corrupt = |message: String| StoreError::Corrupt {
            service_url: service_url.to_string(),
            message,
        };

        let envelope: Envelope =
            serde_json::from_str(&raw).map_err(|err| corrupt(err.to_string()))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(corrupt(format!(
                "unsupported envelope version {}",
                envelope.version
            )));
        }
        let salt = STANDARD
            .decode(&envelope.salt)
            .map_err(|err| corrupt(format!("salt: {err}")))?;
        let nonce = STANDARD
            .decode(&envelope.nonce)
            .map_err(|err| corrupt(format!("nonce: {err}")))?;
        if nonce.len() != NONCE_LEN {
            return Err(corrupt(format!("nonce must be {NONCE_LEN} bytes")));
        }
        let ciphertext = STANDARD
            .decode(&envelope.ciphertext)
            .map_err(|err| corrupt(format!("ciphertext: {err}")))?;

        let key = self.derive_key(service_url, envelope.kdf, &salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| {
                StoreError::unavailable(
                    service_url,
                    format!(
                        "could not decrypt {} (wrong passphrase or modified file)",
                        self.path.display()
                    ),
                )
            })?;

        serde_json::from_slice(&plaintext).map_err(|err| corrupt(err.to_string()))
    }

    fn save(&self, service_url: &str, records: &Records) -> Result<(), StoreError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut salt);
        rng.fill_bytes(&mut nonce);

        let plaintext = serde_json::to_vec(records).map_err(|err| StoreError::Corrupt {
            service_url: service_url.to_string(),
            message: err.to_string(),
        })?;
        let key = self.derive_key(service_url, self.kdf, &salt)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|err| StoreError::unavailable(service_url, err.to_string()))?;

        let envelope = Envelope {
            version: ENVELOPE_VERSION,
            kdf: self.kdf,
            salt: STANDARD.encode(salt),
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
        };
        let json = serde_json::to_string_pretty(&envelope).map_err(|err| StoreError::Corrupt {
            service_url: service_url.to_string(),
            message: err.to_string(),
        })?;

        self.write_atomic(json.as_bytes())
            .map_err(|err| StoreError::unavailable(service_url, err))?;
        debug!(path = %self.path.display(), records = records.len(), "wrote secret file");
        Ok(())
    }

    fn write_atomic(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp, &self.path)
    }
}

impl SecretStore for EncryptedFileStore {
    fn get(&self, service_url: &str) -> Result<SecretRecord, StoreError> {
        self.load(service_url)?
            .remove(service_url)
            .ok_or_else(|| StoreError::NotFound {
                service_url: service_url.to_string(),
            })
    }

    fn put(&self, record: &SecretRecord) -> Result<(), StoreError> {
        let mut records = self.load(&record.service_url)?;
        if records.contains_key(&record.service_url) {
            return Err(StoreError::AlreadyExists {
                service_url: record.service_url.clone(),
            });
        }
        records.insert(record.service_url.clone(), record.clone());
        self.save(&record.service_url, &records)
    }

    fn delete(&self, service_url: &str) -> Result<(), StoreError> {
        let mut records = self.load(service_url)?;
        if records.remove(service_url).is_none() {
            return Ok(());
        }
        self.save(service_url, &records)
    }
}
