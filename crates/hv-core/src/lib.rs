//! Core domain logic for the Harvest CLI.
//!
//! This crate contains:
//! - Credential encoding for Basic auth
//! - Organization and endpoint identity
//! - The secret store capability and an in-memory backend
//! - Session materialization after a successful login

pub mod credential;
pub mod org;
pub mod session;
pub mod store;

pub use credential::{Credential, CredentialError, encode};
pub use org::{DEFAULT_SERVICE_DOMAIN, Endpoint, OrgError, OrgSlug};
pub use session::{
    LoginNotice, Materialized, Session, SessionState, materialize, materialize_replacing,
};
pub use store::{MemoryStore, SecretRecord, SecretStore, StoreError};
