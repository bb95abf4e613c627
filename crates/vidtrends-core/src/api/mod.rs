//! HTTP client module for the vidtrends backend.
//!
//! `ApiClient` performs request/response exchanges against the backend
//! and transparently handles bearer-token authentication: a 401 on a
//! fresh request triggers one token refresh and one retry before any
//! failure reaches the caller.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, RequestOptions};
pub use error::ApiError;
pub use transport::{HttpTransport, OutboundRequest, Transport, TransportError, TransportResponse};
