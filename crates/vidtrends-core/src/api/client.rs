//! Session-aware HTTP client for the vidtrends backend.
//!
//! `ApiClient` wraps a [`Transport`] and injects bearer-token
//! authentication from a shared [`SessionStore`]. A request rejected with
//! 401 triggers one guarded token refresh and one transparent retry; a
//! failed refresh tears the session down and surfaces
//! [`ApiError::SessionExpired`]. Everything else is passed through to the
//! caller untouched.

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::SessionStore;
use crate::models::{
    Ack, FavoriteVideo, LoginResponse, NewFavorite, RecommendedVideo, RegisterResponse,
    TrendAnalysis, TrendQuery, TrendingVideo, User, UserPreferences, ViewRecord,
};

use super::transport::{OutboundRequest, Transport, TransportResponse};
use super::ApiError;

/// Extra parameters for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Query string parameters, appended in order
    pub query: Vec<(String, String)>,
    /// Header overrides, applied after the defaults
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Where a logical call stands in its retry lifecycle. A logical call is
/// the original attempt plus at most one retry; the `Retry` arm carries
/// the refreshed token and is terminal whatever the response says.
enum CallPhase {
    First,
    Retry(String),
}

/// API client for the vidtrends backend.
/// Clone is cheap - the transport and session store are shared via Arc.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Create a client over an injected transport and session store.
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    // ===== Generic operations =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, RequestOptions::default()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, options).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, path, Some(Self::encode_body(body)?), RequestOptions::default())
            .await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, path, Some(Self::encode_body(body)?), RequestOptions::default())
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PATCH, path, Some(Self::encode_body(body)?), RequestOptions::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::DELETE, path, None, RequestOptions::default()).await
    }

    /// Perform one logical call and decode the response body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.exchange(method, path, body, &options).await?;
        Self::decode(path, &response.body)
    }

    /// The request/refresh/retry state machine. Structurally limited to
    /// one refresh and one retry per logical call: the `Retry` arm
    /// returns whatever it gets.
    async fn exchange(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: &RequestOptions,
    ) -> Result<TransportResponse, ApiError> {
        let mut phase = CallPhase::First;
        loop {
            let token = match phase {
                CallPhase::First => self.session.current_token(),
                CallPhase::Retry(ref token) => Some(token.clone()),
            };
            let request =
                Self::build_request(method.clone(), path, body.clone(), options, token.as_deref())?;
            debug!(method = %request.method, path = %request.path, "sending request");
            let response = self.transport.execute(request).await?;

            if response.status.is_success() {
                return Ok(response);
            }

            // Retried already, or a non-auth failure: surface as-is.
            if response.status != StatusCode::UNAUTHORIZED
                || matches!(phase, CallPhase::Retry(_))
            {
                return Err(ApiError::from_status(response.status, &response.body));
            }

            // Another call may have refreshed while this attempt was in
            // flight; if the committed token differs from the one we
            // sent, retry with it instead of refreshing again.
            if let Some(current) = self.session.current_token() {
                if token.as_deref() != Some(current.as_str()) {
                    phase = CallPhase::Retry(current);
                    continue;
                }
            }

            debug!(path, "401 on first attempt, refreshing access token");
            match self.session.refresh_access_token().await {
                Ok(token) => phase = CallPhase::Retry(token),
                Err(err) => {
                    warn!(path, error = %err, "token refresh failed, ending session");
                    self.session.logout().await;
                    return Err(ApiError::SessionExpired);
                }
            }
        }
    }

    fn build_request(
        method: Method,
        path: &str,
        body: Option<Value>,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<OutboundRequest, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidRequest(format!("invalid bearer token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ApiError::InvalidRequest(format!("invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ApiError::InvalidRequest(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let mut request = OutboundRequest::new(method, path);
        request.query = options.query.clone();
        request.headers = headers;
        request.body = body;
        Ok(request)
    }

    fn encode_body<B: Serialize>(body: &B) -> Result<Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("failed to encode request body: {}", e)))
    }

    fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| {
            ApiError::InvalidResponse(format!("failed to parse response from {}: {}", path, e))
        })
    }

    // ===== Auth =====

    /// Log in and establish the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let body = json!({ "email": email, "password": password });
        let response: LoginResponse = self.post("/api/auth/login", &body).await?;
        self.session.establish(
            response.user.clone(),
            response.access_token,
            response.refresh_token,
        );
        Ok(response.user)
    }

    /// Create an account. The new user still has to log in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
        let body = json!({ "name": name, "email": email, "password": password });
        let response: RegisterResponse = self.post("/api/auth/register", &body).await?;
        Ok(response.user)
    }

    /// End the session; local state clears even if the backend is down.
    pub async fn logout(&self) {
        self.session.logout().await;
    }

    // ===== Users =====

    pub async fn fetch_user(&self, user_id: i64) -> Result<User, ApiError> {
        self.get(&format!("/api/users/{}", user_id)).await
    }

    pub async fn fetch_users(&self) -> Result<Vec<User>, ApiError> {
        self.get("/api/users").await
    }

    pub async fn search_users(&self, name: &str) -> Result<Vec<User>, ApiError> {
        self.get_with("/api/users/search", RequestOptions::default().query("name", name))
            .await
    }

    // ===== Favorites =====

    pub async fn fetch_favorites(&self, user_id: i64) -> Result<Vec<FavoriteVideo>, ApiError> {
        self.get(&format!("/api/favorites/{}", user_id)).await
    }

    pub async fn add_favorite(&self, favorite: &NewFavorite) -> Result<FavoriteVideo, ApiError> {
        self.post("/api/favorites", favorite).await
    }

    pub async fn remove_favorite(&self, user_id: i64, video_id: &str) -> Result<(), ApiError> {
        let _: Ack = self
            .delete(&format!("/api/favorites/{}/{}", user_id, video_id))
            .await?;
        Ok(())
    }

    // ===== Trends =====

    pub async fn fetch_trends(&self, query: &TrendQuery) -> Result<Vec<TrendingVideo>, ApiError> {
        let options = RequestOptions { query: query.to_query(), headers: Vec::new() };
        self.get_with("/api/trends", options).await
    }

    pub async fn fetch_trend_analysis(&self, query: &TrendQuery) -> Result<TrendAnalysis, ApiError> {
        let options = RequestOptions { query: query.to_query(), headers: Vec::new() };
        self.get_with("/api/trends/analysis", options).await
    }

    // ===== Recommendations =====

    pub async fn fetch_recommendations(
        &self,
        user_id: i64,
        limit: Option<u32>,
    ) -> Result<Vec<RecommendedVideo>, ApiError> {
        let mut options = RequestOptions::default();
        if let Some(limit) = limit {
            options = options.query("limit", limit.to_string());
        }
        self.get_with(&format!("/api/recommendations/{}", user_id), options)
            .await
    }

    pub async fn update_preferences(&self, preferences: &UserPreferences) -> Result<(), ApiError> {
        let _: Ack = self.post("/api/recommendations/preferences", preferences).await?;
        Ok(())
    }

    pub async fn record_view(&self, view: &ViewRecord) -> Result<(), ApiError> {
        let _: Ack = self.post("/api/recommendations/view", view).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::api::transport::mock::{bearer, MockReply, MockTransport};
    use crate::auth::{SessionState, SessionStore};

    use super::*;

    const USER_BODY: &str = r#"{"id":1,"name":"Ada Lovelace","email":"ada@example.com"}"#;
    const EXPIRED_BODY: &str = r#"{"success":false,"error":"Invalid or expired token"}"#;

    fn test_user() -> User {
        User {
            id: 1,
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            created_at: None,
            active: true,
        }
    }

    fn wire(transport: &Arc<MockTransport>) -> (ApiClient, Arc<SessionStore>) {
        let session = Arc::new(SessionStore::new(transport.clone()));
        (ApiClient::new(transport.clone(), session.clone()), session)
    }

    #[tokio::test]
    async fn test_attaches_current_token() {
        let transport = Arc::new(MockTransport::new(|_| MockReply::json(200, USER_BODY)));
        let (client, session) = wire(&transport);
        session.set_user(test_user(), "tok-1".to_string());

        let user = client.fetch_user(1).await.unwrap();
        assert_eq!(user.name, "Ada Lovelace");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].authorization(), Some("Bearer tok-1"));
    }

    #[tokio::test]
    async fn test_anonymous_requests_carry_no_auth_header() {
        let transport = Arc::new(MockTransport::new(|_| MockReply::json(200, "[]")));
        let (client, _session) = wire(&transport);

        let users = client.fetch_users().await.unwrap();
        assert!(users.is_empty());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].authorization(), None);
    }

    #[tokio::test]
    async fn test_retries_once_with_refreshed_token() {
        let transport = Arc::new(MockTransport::new(|request| {
            if request.path == "/api/auth/refresh" {
                return MockReply::json(200, r#"{"access_token":"tok-2"}"#);
            }
            if bearer(request) == Some("Bearer tok-2") {
                MockReply::json(200, USER_BODY)
            } else {
                MockReply::json(401, EXPIRED_BODY)
            }
        }));
        let (client, session) = wire(&transport);
        session.establish(test_user(), "tok-1".to_string(), "refresh-1".to_string());

        let user = client.fetch_user(1).await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(session.current_token().as_deref(), Some("tok-2"));

        let requests = transport.requests();
        let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/api/users/1", "/api/auth/refresh", "/api/users/1"]);
        assert_eq!(requests[2].authorization(), Some("Bearer tok-2"));
    }

    #[tokio::test]
    async fn test_failed_refresh_ends_session() {
        let transport = Arc::new(MockTransport::new(|request| {
            if request.path == "/api/auth/refresh" {
                MockReply::json(401, r#"{"success":false,"error":"refresh token revoked"}"#)
            } else {
                MockReply::json(401, EXPIRED_BODY)
            }
        }));
        let (client, session) = wire(&transport);
        session.establish(test_user(), "tok-1".to_string(), "refresh-1".to_string());
        let mut state = session.subscribe();
        state.borrow_and_update();

        let result: Result<User, ApiError> = client.fetch_user(1).await;
        assert!(matches!(result, Err(ApiError::SessionExpired)));
        assert_eq!(session.current_token(), None);

        // the rejected request is never re-sent
        assert_eq!(transport.count_path("/api/users/1"), 1);

        // the expiry signal fired, exactly once
        assert!(state.has_changed().unwrap());
        assert_eq!(*state.borrow_and_update(), SessionState::Expired);
        assert!(!state.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_retried_401_surfaces_without_second_refresh() {
        let transport = Arc::new(MockTransport::new(|request| {
            if request.path == "/api/auth/refresh" {
                MockReply::json(200, r#"{"access_token":"tok-2"}"#)
            } else {
                MockReply::json(401, EXPIRED_BODY)
            }
        }));
        let (client, session) = wire(&transport);
        session.establish(test_user(), "tok-1".to_string(), "refresh-1".to_string());

        let result: Result<User, ApiError> = client.fetch_user(1).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));

        assert_eq!(transport.count_path("/api/auth/refresh"), 1);
        assert_eq!(transport.count_path("/api/users/1"), 2);
    }

    #[tokio::test]
    async fn test_non_auth_errors_pass_through() {
        let transport = Arc::new(MockTransport::new(|_| {
            MockReply::json(404, r#"{"success":false,"error":"user not found"}"#)
        }));
        let (client, session) = wire(&transport);
        session.set_user(test_user(), "tok-1".to_string());

        let result: Result<User, ApiError> = client.fetch_user(42).await;
        match result {
            Err(ApiError::Status { status, message }) => {
                assert_eq!(status, 404);
                assert!(message.contains("user not found"));
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }

        // no refresh was attempted and the session is intact
        assert_eq!(transport.count_path("/api/auth/refresh"), 0);
        assert_eq!(session.current_token().as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_transport_failures_surface_unchanged() {
        let transport = Arc::new(MockTransport::new(|_| MockReply::error("connection refused")));
        let (client, session) = wire(&transport);
        session.set_user(test_user(), "tok-1".to_string());

        let result: Result<User, ApiError> = client.fetch_user(1).await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let transport = Arc::new(MockTransport::new(|_| MockReply::json(200, "not json")));
        let (client, _session) = wire(&transport);

        let result: Result<User, ApiError> = client.fetch_user(1).await;
        assert!(matches!(result, Err(ApiError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_header_and_query_options() {
        let transport = Arc::new(MockTransport::new(|_| MockReply::json(200, "[]")));
        let (client, _session) = wire(&transport);

        let options = RequestOptions::default()
            .query("name", "ada")
            .header("x-client", "tui");
        let _: Vec<User> = client.get_with("/api/users/search", options).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].path, "/api/users/search");
        assert_eq!(
            requests[0].headers.get("x-client").and_then(|v| v.to_str().ok()),
            Some("tui")
        );
    }

    #[tokio::test]
    async fn test_login_establishes_session() {
        let transport = Arc::new(MockTransport::new(|request| {
            if request.path == "/api/auth/login" {
                MockReply::json(
                    200,
                    r#"{
                        "success": true,
                        "user": {"id": 1, "name": "Ada Lovelace", "email": "ada@example.com"},
                        "access_token": "tok-1",
                        "refresh_token": "refresh-1"
                    }"#,
                )
            } else {
                MockReply::json(200, USER_BODY)
            }
        }));
        let (client, session) = wire(&transport);

        let user = client.login("ada@example.com", "hunter2").await.unwrap();
        assert_eq!(user.id, 1);
        assert!(session.is_authenticated());
        assert_eq!(session.current_token().as_deref(), Some("tok-1"));

        // the login request itself goes out unauthenticated
        assert_eq!(transport.requests()[0].authorization(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_401s_share_one_refresh() {
        let transport = Arc::new(MockTransport::new(|request| {
            if request.path == "/api/auth/refresh" {
                return MockReply::json(200, r#"{"access_token":"tok-2"}"#)
                    .delayed(Duration::from_millis(50));
            }
            if bearer(request) == Some("Bearer tok-2") {
                MockReply::json(200, "[]")
            } else {
                MockReply::json(401, EXPIRED_BODY)
            }
        }));
        let (client, session) = wire(&transport);
        session.establish(test_user(), "tok-1".to_string(), "refresh-1".to_string());

        let calls = (0..8).map(|_| {
            let client = client.clone();
            async move { client.fetch_users().await }
        });
        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(|r| r.is_ok()));

        assert_eq!(transport.count_path("/api/auth/refresh"), 1);
        assert_eq!(session.current_token().as_deref(), Some("tok-2"));
    }
}
