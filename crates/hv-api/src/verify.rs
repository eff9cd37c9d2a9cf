//! The "who am I" handshake used to check a credential before storing it.

use hv_core::{Credential, OrgSlug};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::ApiError;
use crate::client::{Client, JSON};

pub const WHO_AM_I_PATH: &str = "/account/who_am_i";

/// What the service said about a candidate credential.
#[derive(Debug)]
pub enum VerificationOutcome {
    /// Credential accepted; carries the account's user id.
    Authorized(String),
    Unauthorized,
    OrganizationNotFound,
    /// The request never produced a status (DNS, TLS, connect, timeout).
    TransportError(reqwest::Error),
    UnexpectedStatus(u16),
}

impl VerificationOutcome {
    /// Returns the user id, or the error matching any other outcome.
    pub fn into_user_id(self, org: &OrgSlug) -> Result<String, ApiError> {
        let org = org.to_string();
        match self {
            Self::Authorized(user_id) => Ok(user_id),
            Self::Unauthorized => Err(ApiError::Unauthorized { org }),
            Self::OrganizationNotFound => Err(ApiError::OrganizationNotFound { org }),
            Self::TransportError(source) => Err(ApiError::Transport { org, source }),
            Self::UnexpectedStatus(status) => Err(ApiError::UnexpectedStatus { org, status }),
        }
    }
}

#[derive(Deserialize)]
struct WhoAmI {
    user: WhoAmIUser,
}

#[derive(Deserialize)]
struct WhoAmIUser {
    id: UserId,
}

/// Harvest has returned ids both as numbers and strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserId {
    Text(String),
    Number(serde_json::Number),
}

impl Client {
    /// Performs one `GET /account/who_am_i` with the candidate credential.
    ///
    /// There is no retry. `Err` is reserved for failures that are not an
    /// answer from the service: a URL that cannot be built, or a 200 whose
    /// body does not carry a user id.
    pub async fn verify(
        &self,
        credential: &Credential,
        org: &OrgSlug,
    ) -> Result<VerificationOutcome, ApiError> {
        let url = self.url(org, WHO_AM_I_PATH)?;
        debug!(%org, %url, user = credential.identifier(), "verifying credential");

        let response = match self
            .http
            .get(url)
            .header(AUTHORIZATION, credential.authorization_header())
            .header(ACCEPT, JSON)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(%org, error = %err, "who_am_i request failed");
                return Ok(VerificationOutcome::TransportError(err));
            }
        };

        let status = response.status();
        // Read the whole body so the connection is released whatever the status.
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) => {
                warn!(%org, %status, error = %err, "failed to read who_am_i body");
                return Ok(VerificationOutcome::TransportError(err));
            }
        };
        debug!(%org, %status, bytes = body.len(), "who_am_i response");

        classify(org, status, &body)
    }
}

fn classify(
    org: &OrgSlug,
    status: StatusCode,
    body: &[u8],
) -> Result<VerificationOutcome, ApiError> {
    match status {
        StatusCode::OK => parse_user_id(org, body).map(VerificationOutcome::Authorized),
        StatusCode::UNAUTHORIZED => Ok(VerificationOutcome::Unauthorized),
        StatusCode::NOT_FOUND => Ok(VerificationOutcome::OrganizationNotFound),
        other => Ok(VerificationOutcome::UnexpectedStatus(other.as_u16())),
    }
}

fn parse_user_id(org: &OrgSlug, body: &[u8]) -> Result<String, ApiError> {
    let invalid = |message: String| ApiError::InvalidResponse {
        org: org.to_string(),
        message,
    };

    let payload: WhoAmI = serde_json::from_slice(body)
        .map_err(|err| invalid(format!("failed to decode who_am_i body: {err}")))?;
    let id = match payload.user.id {
        UserId::Text(id) => id,
        UserId::Number(id) => id.to_string(),
    };
    if id.trim().is_empty() {
        return Err(invalid("who_am_i returned an empty user id".to_string()));
    }
    Ok(id)
}
