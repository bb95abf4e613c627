//! Authentication module for managing the user session and credentials.
//!
//! This module provides:
//! - `SessionStore`: the logged-in user and access token, with coalesced
//!   (single-flight) token refresh and session-expiry signalling
//! - `CredentialStore`: OS-keychain storage for the refresh credential

pub mod credentials;
pub mod session;

pub use credentials::CredentialStore;
pub use session::{RefreshError, SessionData, SessionState, SessionStore};
