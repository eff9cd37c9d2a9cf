//! Turning a verified credential into durable login state.
//!
//! After the remote service confirms who a credential belongs to, the
//! materializer writes exactly one [`SecretRecord`] for the organization and
//! hands back the [`SessionState`] the caller should persist as
//! configuration. Nothing here touches configuration files itself.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::credential::Credential;
use crate::org::{Endpoint, OrgSlug};
use crate::store::{SecretRecord, SecretStore, StoreError};

/// A logged-in session. Replaced wholesale on re-login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    organization_host: String,
    user_id: String,
    token: Credential,
}

impl Session {
    pub fn new(organization_host: String, user_id: String, token: Credential) -> Self {
        Self {
            organization_host,
            user_id,
            token,
        }
    }

    pub fn organization_host(&self) -> &str {
        &self.organization_host
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub const fn credential(&self) -> &Credential {
        &self.token
    }
}

/// Configuration written after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub org: OrgSlug,
    pub user_id: String,
}

/// How the store write went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginNotice {
    /// A new record was written.
    Created,
    /// A record already existed for this organization and was left as is.
    AlreadyLoggedIn,
    /// An existing record was removed and rewritten.
    Replaced,
}

/// Result of a successful materialization.
///
/// `session` and `state` describe the credential that is now stored. They are
/// `None` when an existing record belongs to a different account, in which
/// case nothing should be persisted.
#[derive(Debug, Clone)]
pub struct Materialized {
    pub session: Option<Session>,
    pub state: Option<SessionState>,
    pub notice: LoginNotice,
}

/// Writes the credential for `org` and returns the state to persist.
///
/// An existing record is kept and reported as
/// [`LoginNotice::AlreadyLoggedIn`]. State is only returned for it when the
/// stored record belongs to the same account as `credential`, since
/// `user_id` was verified for that account. Any other store failure is
/// returned.
pub fn materialize(
    store: &dyn SecretStore,
    credential: Credential,
    org: &OrgSlug,
    user_id: String,
    endpoint: &Endpoint,
) -> Result<Materialized, StoreError> {
    let service_url = endpoint.service_url(org);
    let record = SecretRecord::new(&service_url, &credential);

    match store.put(&record) {
        Ok(()) => {
            info!(org = %org, %service_url, "stored credential");
            Ok(stored(credential, org, user_id, endpoint, LoginNotice::Created))
        }
        Err(StoreError::AlreadyExists { .. }) => {
            let existing = store.get(&service_url)?;
            if existing.username == credential.identifier() {
                info!(org = %org, %service_url, "credential already stored, leaving it in place");
                Ok(stored(
                    existing.credential(),
                    org,
                    user_id,
                    endpoint,
                    LoginNotice::AlreadyLoggedIn,
                ))
            } else {
                warn!(
                    org = %org,
                    %service_url,
                    "credential for another account already stored, leaving login state unchanged"
                );
                Ok(Materialized {
                    session: None,
                    state: None,
                    notice: LoginNotice::AlreadyLoggedIn,
                })
            }
        }
        Err(err) => Err(err),
    }
}

/// Like [`materialize`], but replaces any existing record.
///
/// The previous record is restored if the new one cannot be written, so a
/// failed replacement leaves the old login in place.
pub fn materialize_replacing(
    store: &dyn SecretStore,
    credential: Credential,
    org: &OrgSlug,
    user_id: String,
    endpoint: &Endpoint,
) -> Result<Materialized, StoreError> {
    let service_url = endpoint.service_url(org);
    let previous = match store.get(&service_url) {
        Ok(record) => Some(record),
        Err(StoreError::NotFound { .. }) => None,
        Err(err) => return Err(err),
    };
    if previous.is_some() {
        debug!(%service_url, "removing previous credential");
        store.delete(&service_url)?;
    }

    if let Err(err) = store.put(&SecretRecord::new(&service_url, &credential)) {
        if let Some(previous) = &previous {
            match store.put(previous) {
                Ok(()) => debug!(%service_url, "restored previous credential"),
                Err(restore) => {
                    warn!(%service_url, error = %restore, "failed to restore previous credential");
                }
            }
        }
        return Err(err);
    }
    let replaced = previous.is_some();
    info!(org = %org, %service_url, replaced, "stored credential");

    let notice = if replaced {
        LoginNotice::Replaced
    } else {
        LoginNotice::Created
    };
    Ok(stored(credential, org, user_id, endpoint, notice))
}

fn stored(
    credential: Credential,
    org: &OrgSlug,
    user_id: String,
    endpoint: &Endpoint,
    notice: LoginNotice,
) -> Materialized {
    let state = SessionState {
        org: org.clone(),
        user_id: user_id.clone(),
    };
    let session = Session::new(endpoint.organization_host(org), user_id, credential);
    Materialized {
        session: Some(session),
        state: Some(state),
        notice,
    }
}
