//! Harvest HTTP API client.
//!
//! Provides:
//! - [`Client::verify`]: the `who_am_i` handshake that checks a credential
//! - [`Client::authorize`]: builds an [`AuthorizedClient`] from a stored
//!   credential, which signs every request it makes
//! - [`AuthorizedClient::add_daily`]: timesheet submission
//!
//! The client is async; the CLI drives it from a short-lived runtime.

mod client;
mod error;
pub mod timesheet;
pub mod verify;

pub use client::{AuthorizedClient, Client, ClientOptions};
pub use error::ApiError;
pub use timesheet::{DailyEntry, EntryError};
pub use verify::VerificationOutcome;

pub use reqwest::Url;
