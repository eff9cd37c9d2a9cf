use hv_core::{OrgError, StoreError};
use thiserror::Error;

/// Errors from talking to the Harvest API.
///
/// Every variant names the organization involved so the message can be shown
/// to the user as is.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The organization or path cannot form a request URL.
    #[error("cannot build a request for organization {org:?}: {reason}")]
    RequestConstruction { org: String, reason: String },
    /// The configured API origin carries more than scheme, host and port.
    #[error("api_origin {origin:?} must be a bare origin such as http://127.0.0.1:8080")]
    InvalidOrigin { origin: String },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// DNS, TLS, connection, or timeout failure.
    #[error("request to organization {org} failed: {source}")]
    Transport {
        org: String,
        #[source]
        source: reqwest::Error,
    },
    /// The service rejected the credential.
    #[error("incorrect email or password for organization {org}, please try again")]
    Unauthorized { org: String },
    /// The organization subdomain does not exist.
    #[error("organization {org:?} could not be found, please check the value of --org")]
    OrganizationNotFound { org: String },
    /// Any status the client does not handle.
    #[error("unexpected status {status} from organization {org}")]
    UnexpectedStatus { org: String, status: u16 },
    /// A successful response had a body that could not be decoded.
    #[error("invalid response from organization {org}: {message}")]
    InvalidResponse { org: String, message: String },
    /// No stored credential for the organization.
    #[error(
        "you haven't logged in to {} yet, run `harvest login` first",
        .org.as_deref().unwrap_or("an organization")
    )]
    NotAuthenticated { org: Option<String> },
    /// The secret store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub(crate) fn invalid_org(raw: &str, err: &OrgError) -> Self {
        Self::RequestConstruction {
            org: raw.to_string(),
            reason: err.to_string(),
        }
    }
}
