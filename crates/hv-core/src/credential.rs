//! Basic-auth credential encoding.
//!
//! A [`Credential`] is built once from an identifier (the account email) and a
//! secret (the password). The secret is folded into the encoded token at
//! construction time and never kept on its own, so the only copies that
//! survive are the identifier and the token the remote service expects in its
//! `Authorization: Basic` header.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Errors from building a credential.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// Identifier or secret is unusable for Basic auth.
    #[error("invalid credential input: {field} {reason}")]
    InvalidInput {
        field: &'static str,
        reason: &'static str,
    },
}

/// Encodes `identifier:secret` with the standard base64 alphabet.
///
/// Deterministic and free of side effects. Both parts must be non-empty and
/// free of NUL bytes. The identifier must not contain `:`, which Basic auth
/// uses as the separator; the secret may.
pub fn encode(identifier: &str, secret: &str) -> Result<String, CredentialError> {
    check_part("identifier", identifier)?;
    if identifier.contains(':') {
        return Err(CredentialError::InvalidInput {
            field: "identifier",
            reason: "must not contain ':'",
        });
    }
    check_part("secret", secret)?;
    Ok(STANDARD.encode(format!("{identifier}:{secret}")))
}

fn check_part(field: &'static str, value: &str) -> Result<(), CredentialError> {
    if value.is_empty() {
        return Err(CredentialError::InvalidInput {
            field,
            reason: "must not be empty",
        });
    }
    if value.contains('\0') {
        return Err(CredentialError::InvalidInput {
            field,
            reason: "must not contain NUL",
        });
    }
    Ok(())
}

/// A verified-or-candidate account credential.
///
/// Holds the identifier and the derived token only. Changing either input
/// means building a new `Credential`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    identifier: String,
    token: String,
}

impl Credential {
    /// Builds a credential, consuming the plaintext secret.
    pub fn new(identifier: impl Into<String>, secret: &str) -> Result<Self, CredentialError> {
        let identifier = identifier.into();
        let token = encode(&identifier, secret)?;
        Ok(Self { identifier, token })
    }

    /// Rebuilds a credential from a previously stored identifier and token.
    pub(crate) fn from_parts(identifier: String, token: String) -> Self {
        Self { identifier, token }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The base64 token, ready for `Authorization: Basic {token}`.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Full header value.
    pub fn authorization_header(&self) -> String {
        format!("Basic {}", self.token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn decode_for_test(token: &str) -> (String, String) {
    let bytes = STANDARD.decode(token).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let (identifier, secret) = text.split_once(':').unwrap();
    (identifier.to_string(), secret.to_string())
}
