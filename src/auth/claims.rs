use serde::{Deserialize, Serialize};

/// JWT payload. `email` is the identity claim; it stays optional here so a
/// token without it is reported as invalid rather than undecodable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>, // identity claim
    pub iat: i64,              // issued at (unix timestamp)
    pub exp: i64,              // expires at (unix timestamp)
}
