//! Organization identity and the hosts derived from it.
//!
//! Each Harvest account lives on its own subdomain: organization `acme` on
//! domain `harvestapp.com` is served from `https://acme.harvestapp.com`, and
//! that URL is also the key its credential is stored under.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default service domain.
pub const DEFAULT_SERVICE_DOMAIN: &str = "harvestapp.com";

/// Maximum length of a single DNS label.
const MAX_LABEL_LEN: usize = 63;

/// Errors from validating an organization or service domain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrgError {
    #[error("organization must not be empty")]
    Empty,
    #[error("organization {0:?} is longer than {MAX_LABEL_LEN} characters")]
    TooLong(String),
    #[error("organization {org:?} contains invalid character {ch:?}")]
    InvalidChar { org: String, ch: char },
    #[error("organization {0:?} must not start or end with '-'")]
    EdgeHyphen(String),
    #[error("invalid service domain {0:?}")]
    InvalidDomain(String),
}

/// A validated organization slug: one lowercase DNS label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrgSlug(String);

impl OrgSlug {
    pub fn parse(raw: &str) -> Result<Self, OrgError> {
        let org = raw.trim().to_ascii_lowercase();
        if org.is_empty() {
            return Err(OrgError::Empty);
        }
        if org.len() > MAX_LABEL_LEN {
            return Err(OrgError::TooLong(org));
        }
        if let Some(ch) = org
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '-'))
        {
            return Err(OrgError::InvalidChar { org, ch });
        }
        if org.starts_with('-') || org.ends_with('-') {
            return Err(OrgError::EdgeHyphen(org));
        }
        Ok(Self(org))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrgSlug {
    type Err = OrgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrgSlug {
    type Error = OrgError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OrgSlug> for String {
    fn from(value: OrgSlug) -> Self {
        value.0
    }
}

/// The service domain organizations are hosted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    domain: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            domain: DEFAULT_SERVICE_DOMAIN.to_string(),
        }
    }
}

impl Endpoint {
    pub fn new(domain: &str) -> Result<Self, OrgError> {
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
        let valid = !domain.is_empty()
            && !domain.starts_with('.')
            && domain
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '.');
        if !valid {
            return Err(OrgError::InvalidDomain(domain));
        }
        Ok(Self { domain })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// `{org}.{domain}`
    pub fn organization_host(&self, org: &OrgSlug) -> String {
        format!("{org}.{}", self.domain)
    }

    /// `https://{org}.{domain}`, the canonical account URL and secret store key.
    pub fn service_url(&self, org: &OrgSlug) -> String {
        format!("https://{}", self.organization_host(org))
    }
}
