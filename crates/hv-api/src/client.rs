//! HTTP client and authorized request construction.

use std::fmt;
use std::time::Duration;

use hv_core::{Credential, Endpoint, OrgSlug, SecretStore, StoreError};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Url};
use tracing::debug;

use crate::ApiError;

pub(crate) const JSON: &str = "application/json";

/// Settings for [`Client`].
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Domain organizations are hosted under.
    pub endpoint: Endpoint,
    /// Send every request to this origin instead of `https://{org}.{domain}`.
    ///
    /// Must be a bare origin (no path, query or fragment); request paths are
    /// absolute. Credentials are still stored under the canonical service URL.
    pub api_origin: Option<Url>,
    /// Overall request timeout. `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
}

/// Harvest API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    pub(crate) http: reqwest::Client,
    endpoint: Endpoint,
    api_origin: Option<Url>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint)
            .field("api_origin", &self.api_origin.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(options: ClientOptions) -> Result<Self, ApiError> {
        if let Some(origin) = &options.api_origin {
            let bare = origin.path() == "/"
                && origin.query().is_none()
                && origin.fragment().is_none();
            if !bare || origin.cannot_be_a_base() {
                return Err(ApiError::InvalidOrigin {
                    origin: origin.to_string(),
                });
            }
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::ClientBuild)?;

        Ok(Self {
            http,
            endpoint: options.endpoint,
            api_origin: options.api_origin,
        })
    }

    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Validates a raw `--org` value, failing before any request is made.
    pub fn parse_org(raw: &str) -> Result<OrgSlug, ApiError> {
        OrgSlug::parse(raw).map_err(|err| ApiError::invalid_org(raw, &err))
    }

    /// Absolute URL for `path` on the organization's host.
    pub fn url(&self, org: &OrgSlug, path: &str) -> Result<Url, ApiError> {
        let construction = |reason: String| ApiError::RequestConstruction {
            org: org.to_string(),
            reason,
        };

        if !path.starts_with('/') {
            return Err(construction(format!("path {path:?} must start with '/'")));
        }
        let origin = match &self.api_origin {
            Some(origin) => origin.clone(),
            None => Url::parse(&self.endpoint.service_url(org))
                .map_err(|err| construction(err.to_string()))?,
        };
        origin
            .join(path)
            .map_err(|err| construction(err.to_string()))
    }

    /// Looks up the stored credential for `org` and returns a client that
    /// signs requests with it.
    ///
    /// Fails with [`ApiError::NotAuthenticated`] when no organization is
    /// configured or no credential is stored for it.
    pub fn authorize(
        &self,
        store: &dyn SecretStore,
        org: Option<&OrgSlug>,
    ) -> Result<AuthorizedClient<'_>, ApiError> {
        let org = org.ok_or(ApiError::NotAuthenticated { org: None })?;
        let service_url = self.endpoint.service_url(org);
        let record = match store.get(&service_url) {
            Ok(record) => record,
            Err(StoreError::NotFound { .. }) => {
                return Err(ApiError::NotAuthenticated {
                    org: Some(org.to_string()),
                });
            }
            Err(err) => return Err(err.into()),
        };
        debug!(%org, %service_url, "loaded stored credential");

        Ok(AuthorizedClient {
            client: self,
            org: org.clone(),
            credential: record.credential(),
        })
    }
}

/// A client bound to one organization's stored credential.
#[derive(Debug, Clone)]
pub struct AuthorizedClient<'a> {
    pub(crate) client: &'a Client,
    org: OrgSlug,
    credential: Credential,
}

impl AuthorizedClient<'_> {
    pub const fn org(&self) -> &OrgSlug {
        &self.org
    }

    pub fn username(&self) -> &str {
        self.credential.identifier()
    }

    /// Starts a request to `path` carrying Basic auth and JSON headers.
    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.client.url(&self.org, path)?;
        Ok(self
            .client
            .http
            .request(method, url)
            .header(AUTHORIZATION, self.credential.authorization_header())
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON))
    }
}
