//! Core library for vidtrends - a client for the vidtrends video-trends
//! backend.
//!
//! The crate provides:
//!
//! - [`api::ApiClient`]: session-aware HTTP client that attaches bearer
//!   tokens and transparently performs one guarded token refresh and
//!   retry per call
//! - [`auth::SessionStore`]: the logged-in user and access token, with
//!   single-flight refresh and keychain-backed refresh credentials
//! - [`models`]: typed payloads for users, favorites, trends, and
//!   recommendations
//! - [`config::Config`]: backend origin and persisted client settings
//!
//! Wiring order matters: build the transport, then the session store,
//! then the client.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidtrends_core::{ApiClient, Config, HttpTransport, SessionStore};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let session = Arc::new(
//!     SessionStore::new(transport.clone())
//!         .with_cache_dir(config.cache_dir()?)
//!         .with_keychain(),
//! );
//! let client = ApiClient::new(transport, session);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, HttpTransport, RequestOptions, Transport, TransportError};
pub use auth::{CredentialStore, RefreshError, SessionState, SessionStore};
pub use config::Config;
