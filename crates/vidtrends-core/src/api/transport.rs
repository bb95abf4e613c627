//! Transport layer between the API client and the backend.
//!
//! [`ApiClient`](super::ApiClient) and the session store are written
//! against the [`Transport`] trait rather than a concrete HTTP client,
//! so tests can substitute a scripted transport. Production code uses
//! [`HttpTransport`], a thin reqwest wrapper that resolves paths against
//! the configured base URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

/// HTTP request timeout in seconds.
/// Applies per attempt; a retried request gets its own timeout.
const REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// A single outgoing exchange. Constructed per call and not retained
/// after the response arrives.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// Response as the client sees it: the status plus the raw body text.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: String,
}

/// One request/response exchange against the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: OutboundRequest) -> Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}
