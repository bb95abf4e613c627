use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Successful login: the account plus both credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful registration. The account still has to log in.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub user: User,
}

/// Envelope the backend answers mutations with when there is no
/// resource payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let json = r#"{
            "success": true,
            "user": {"id": 7, "name": "Ada Lovelace", "email": "ada@example.com"},
            "access_token": "header.payload.signature",
            "refresh_token": "opaque-refresh"
        }"#;

        let response: LoginResponse =
            serde_json::from_str(json).expect("failed to parse login response");
        assert_eq!(response.user.id, 7);
        assert_eq!(response.user.email, "ada@example.com");
        assert!(response.user.active);
        assert!(response.user.created_at.is_none());
        assert_eq!(response.access_token, "header.payload.signature");
    }
}
