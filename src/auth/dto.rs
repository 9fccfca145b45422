use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::jwt::IssuedToken;
use crate::auth::repo_types::User;
use crate::meta::Meta;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub pwd: String,
    pub name: String,
    pub role: String,
}

/// Request body for authentication.
#[derive(Debug, Deserialize)]
pub struct AuthenticateRequest {
    pub email: String,
    pub pwd: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PublicUser {
    pub email: String,
    pub name: String,
    pub role: String,
    pub meta: Meta,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
            role: user.role,
            meta: user.meta,
        }
    }
}

/// Outcome of an authentication attempt. Built once, never mutated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
}

impl AuthResult {
    pub fn success(issued: IssuedToken, user: PublicUser) -> Self {
        Self {
            success: true,
            message: None,
            token: Some(issued.token),
            expires_at: Some(issued.expires_at),
            user: Some(user),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            token: None,
            expires_at: None,
            user: None,
        }
    }
}
