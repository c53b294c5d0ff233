//! Identity API wire types
//!
//! Request and response bodies exchanged with `/api/v1/identity`.

use serde::{Deserialize, Serialize};

/// Default role assigned to self-registered users
pub const DEFAULT_ROLE: &str = "user";

/// Authenticated user profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Body of `GET /me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub user: Option<UserInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Generic `{"message": ...}` acknowledgement
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_me_response_deserialization() {
        let json = r#"{"user":{"id":"6650f1","email":"ana@example.com","name":"Ana"}}"#;
        let me: MeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(me.user.id, "6650f1");
        assert_eq!(me.user.name, "Ana");
        assert_eq!(me.user.email, "ana@example.com");
    }

    #[test]
    fn test_register_response_uses_camel_case_id() {
        let json = r#"{"message":"User registered successfully","userId":"6650f1"}"#;
        let response: RegisterResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.user_id, "6650f1");
    }

    #[test]
    fn test_login_response_without_user() {
        let response: LoginResponse = serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert!(response.user.is_none());
    }

    #[test]
    fn test_change_password_serialization() {
        let body = ChangePasswordRequest {
            old_password: "old-secret".to_string(),
            new_password: "new-secret".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["old_password"], "old-secret");
        assert_eq!(json["new_password"], "new-secret");
    }
}
