//! Daily timesheet submission.

use chrono::NaiveDate;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::ApiError;
use crate::client::AuthorizedClient;

pub const DAILY_ADD_PATH: &str = "/daily/add";

/// Hours above this are rejected as a typo.
const MAX_HOURS_PER_DAY: f64 = 24.0;

/// Errors from building a timesheet entry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("invalid hours {0:?}: expected a positive number up to 24, e.g. 7.5")]
    InvalidHours(String),
    #[error("missing {0} id: pass --{0} or set default_{0}_id in the config file")]
    MissingId(&'static str),
}

/// One line of a day's timesheet, as sent to `POST /daily/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyEntry {
    pub notes: String,
    pub hours: String,
    pub project_id: String,
    pub task_id: String,
    pub spent_at: String,
}

impl DailyEntry {
    /// Validates the inputs and builds an entry.
    ///
    /// Project and task ids must be present; the service files entries
    /// against them.
    pub fn new(
        hours: &str,
        notes: Option<&str>,
        project_id: Option<&str>,
        task_id: Option<&str>,
        spent_at: NaiveDate,
    ) -> Result<Self, EntryError> {
        let hours = parse_hours(hours)?;
        let project_id = require_id("project", project_id)?;
        let task_id = require_id("task", task_id)?;
        Ok(Self {
            notes: notes.unwrap_or_default().to_string(),
            hours,
            project_id,
            task_id,
            spent_at: spent_at.format("%Y-%m-%d").to_string(),
        })
    }
}

fn parse_hours(raw: &str) -> Result<String, EntryError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 && value <= MAX_HOURS_PER_DAY => {
            Ok(trimmed.to_string())
        }
        _ => Err(EntryError::InvalidHours(raw.to_string())),
    }
}

fn require_id(kind: &'static str, value: Option<&str>) -> Result<String, EntryError> {
    value
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .ok_or(EntryError::MissingId(kind))
}

impl AuthorizedClient<'_> {
    /// Submits a timesheet entry with a single `POST /daily/add`.
    pub async fn add_daily(&self, entry: &DailyEntry) -> Result<(), ApiError> {
        let org = self.org().to_string();
        let response = self
            .request(Method::POST, DAILY_ADD_PATH)?
            .json(entry)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                org: org.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport {
                org: org.clone(),
                source,
            })?;
        debug!(%org, %status, bytes = body.len(), "daily/add response");

        match status {
            StatusCode::OK | StatusCode::CREATED => {
                info!(%org, hours = %entry.hours, spent_at = %entry.spent_at, "added timesheet entry");
                Ok(())
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized { org }),
            StatusCode::NOT_FOUND => Err(ApiError::OrganizationNotFound { org }),
            other => Err(ApiError::UnexpectedStatus {
                org,
                status: other.as_u16(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use hv_core::{Credential, MemoryStore, OrgSlug, SecretRecord, SecretStore};
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use reqwest::Url;
    use serde_json::json;

    use crate::{Client, ClientOptions};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    fn entry() -> DailyEntry {
        DailyEntry::new("7.5", Some("Reviewed PRs"), Some("101"), Some("202"), day()).unwrap()
    }

    fn logged_in_store() -> MemoryStore {
        let store = MemoryStore::new();
        let credential = Credential::new("a@b.com", "pw").unwrap();
        store
            .put(&SecretRecord::new("https://acme.harvestapp.com", &credential))
            .unwrap();
        store
    }

    fn client_for(server: &MockServer) -> Client {
        Client::new(ClientOptions {
            api_origin: Some(Url::parse(&server.base_url()).unwrap()),
            ..ClientOptions::default()
        })
        .unwrap()
    }

    #[test]
    fn entry_serializes_wire_field_names() {
        let value = serde_json::to_value(entry()).unwrap();
        assert_eq!(
            value,
            json!({
                "notes": "Reviewed PRs",
                "hours": "7.5",
                "project_id": "101",
                "task_id": "202",
                "spent_at": "2026-03-14",
            })
        );
    }

    #[test]
    fn entry_defaults_notes_to_empty() {
        let entry = DailyEntry::new("8", None, Some("1"), Some("2"), day()).unwrap();
        assert_eq!(entry.notes, "");
        assert_eq!(entry.hours, "8");
    }

    #[test]
    fn entry_rejects_bad_hours() {
        for hours in ["", "abc", "0", "-1", "25", "NaN", "inf"] {
            assert_eq!(
                DailyEntry::new(hours, None, Some("1"), Some("2"), day()),
                Err(EntryError::InvalidHours(hours.to_string())),
                "{hours} should be rejected"
            );
        }
    }

    #[test]
    fn entry_requires_project_and_task() {
        assert_eq!(
            DailyEntry::new("1", None, None, Some("2"), day()),
            Err(EntryError::MissingId("project"))
        );
        assert_eq!(
            DailyEntry::new("1", None, Some("1"), Some("  "), day()),
            Err(EntryError::MissingId("task"))
        );
    }

    #[tokio::test]
    async fn add_daily_posts_entry_with_auth() {
        let server = MockServer::start_async().await;
        let add = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/daily/add")
                    .header("authorization", "Basic YUBiLmNvbTpwdw==")
                    .header("content-type", "application/json")
                    .header("accept", "application/json")
                    .json_body(json!({
                        "notes": "Reviewed PRs",
                        "hours": "7.5",
                        "project_id": "101",
                        "task_id": "202",
                        "spent_at": "2026-03-14",
                    }));
                then.status(201).json_body(json!({"id": 1}));
            })
            .await;

        let client = client_for(&server);
        let store = logged_in_store();
        let org = OrgSlug::parse("acme").unwrap();
        let authorized = client.authorize(&store, Some(&org)).unwrap();

        authorized.add_daily(&entry()).await.unwrap();
        add.assert_async().await;
    }

    #[tokio::test]
    async fn add_daily_maps_error_statuses() {
        let server = MockServer::start_async().await;
        let rejected = server
            .mock_async(|when, then| {
                when.method(POST).path("/daily/add");
                then.status(401);
            })
            .await;

        let client = client_for(&server);
        let store = logged_in_store();
        let org = OrgSlug::parse("acme").unwrap();
        let authorized = client.authorize(&store, Some(&org)).unwrap();

        assert!(matches!(
            authorized.add_daily(&entry()).await,
            Err(ApiError::Unauthorized { .. })
        ));
        rejected.delete_async().await;

        let _broken = server
            .mock_async(|when, then| {
                when.method(POST).path("/daily/add");
                then.status(422);
            })
            .await;
        assert!(matches!(
            authorized.add_daily(&entry()).await,
            Err(ApiError::UnexpectedStatus { status: 422, .. })
        ));
    }

    #[tokio::test]
    async fn add_daily_without_login_sends_nothing() {
        let server = MockServer::start_async().await;
        let add = server
            .mock_async(|when, then| {
                when.method(POST).path("/daily/add");
                then.status(200);
            })
            .await;

        let client = client_for(&server);
        let org = OrgSlug::parse("acme").unwrap();
        let err = client.authorize(&MemoryStore::new(), Some(&org)).unwrap_err();

        assert!(matches!(err, ApiError::NotAuthenticated { .. }));
        add.assert_calls_async(0).await;
    }
}
