//! OAuth 2.0 authorization server for the Halseth API.
//!
//! A minimal Authorization Code flow with PKCE, dynamic client registration,
//! one-time codes, and bearer-token gating of the protected surface. A single
//! operator passphrase stands in for user login and consent.
//!
//! ## Supported Standards
//! - RFC 9728: OAuth Protected Resource Metadata
//! - RFC 8414: OAuth Authorization Server Metadata
//! - RFC 7591: Dynamic Client Registration
//! - RFC 7636: PKCE (S256, plain)
//! - RFC 6749: Authorization Code Grant

pub mod gate;
pub mod handlers;
pub mod login;
pub mod pkce;
pub mod service;
pub mod store;
pub mod types;

pub use service::{GateDecision, OAuthService};
pub use store::{CredentialStore, MemoryStore, SqliteStore};
pub use types::Principal;
