use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use super::claims::Claims;
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing secret is empty")]
    EmptySecret,
    #[error("token lifetime of {0} minutes is out of range")]
    TtlOutOfRange(i64),
    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Why an Authorization header was rejected, in the order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no valid Authorization token in request")]
    MissingToken,
    #[error("authorization token is not a valid Bearer token")]
    WrongScheme,
    #[error("token signature could not be verified")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token claims are malformed")]
    MalformedClaims,
    #[error("invalid authorization token")]
    InvalidToken,
}

/// A freshly signed token together with the instant callers should treat as
/// its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// HS256 keys plus the token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_minutes: i64,
    empty_secret: bool,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let cfg = &state.config.jwt;
        Self::new(cfg.secret.as_bytes(), cfg.ttl_minutes)
    }
}

impl JwtKeys {
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_minutes,
            empty_secret: secret.is_empty(),
        }
    }

    pub fn issue(&self, email: &str) -> Result<IssuedToken, TokenError> {
        if self.empty_secret {
            return Err(TokenError::EmptySecret);
        }
        let now = OffsetDateTime::now_utc();
        let expires_at = self
            .ttl_minutes
            .checked_mul(60)
            .and_then(|secs| now.checked_add(Duration::seconds(secs)))
            .ok_or(TokenError::TtlOutOfRange(self.ttl_minutes))?;
        let claims = Claims {
            email: Some(email.to_string()),
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(email = %email, expires_at = %expires_at, "jwt signed");
        Ok(IssuedToken { token, expires_at })
    }

    /// Checks an `Authorization` header value and returns the identity claim.
    pub fn validate(&self, authorization: Option<&str>) -> Result<String, ValidationError> {
        let header = match authorization {
            Some(h) if !h.is_empty() => h,
            _ => return Err(ValidationError::MissingToken),
        };
        let token = header
            .strip_prefix(BEARER_PREFIX)
            .ok_or(ValidationError::WrongScheme)?;

        // A header that does not decode means the token was mangled, not that
        // its claims are off.
        decode_header(token).map_err(|_| ValidationError::BadSignature)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => ValidationError::Expired,
                ErrorKind::Json(_)
                | ErrorKind::Base64(_)
                | ErrorKind::Utf8(_)
                | ErrorKind::MissingRequiredClaim(_) => ValidationError::MalformedClaims,
                _ => ValidationError::BadSignature,
            };
            warn!(error = %e, ?reason, "jwt rejected");
            reason
        })?;

        match data.claims.email {
            Some(email) if !email.is_empty() => {
                debug!(email = %email, "jwt verified");
                Ok(email)
            }
            _ => Err(ValidationError::InvalidToken),
        }
    }
}

/// Identity recovered from a valid bearer token.
pub struct AuthUser(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        match keys.validate(auth_header) {
            Ok(email) => Ok(AuthUser(email)),
            Err(reason) => {
                warn!(%reason, "unauthorized request");
                Err((StatusCode::UNAUTHORIZED, reason.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys() -> JwtKeys {
        JwtKeys::new(b"dev-secret", 5)
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    fn sign_raw(claims: serde_json::Value, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .expect("sign raw claims")
    }

    fn far_future() -> i64 {
        (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp()
    }

    #[test]
    fn issue_then_validate_returns_identity() {
        let keys = keys();
        let issued = keys.issue("a@x.com").expect("issue");
        assert!(!issued.token.is_empty());
        assert_eq!(issued.token.split('.').count(), 3);
        let email = keys.validate(Some(&bearer(&issued.token))).expect("validate");
        assert_eq!(email, "a@x.com");
    }

    #[test]
    fn expiry_is_now_plus_ttl() {
        let before = OffsetDateTime::now_utc();
        let issued = keys().issue("a@x.com").expect("issue");
        let after = OffsetDateTime::now_utc();
        assert!(issued.expires_at >= before + Duration::minutes(5));
        assert!(issued.expires_at <= after + Duration::minutes(5));
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let err = JwtKeys::new(b"", 5).issue("a@x.com").unwrap_err();
        assert!(matches!(err, TokenError::EmptySecret));
    }

    #[test]
    fn oversized_ttl_is_an_error_not_a_panic() {
        for ttl in [i64::MAX, i64::MIN, 1_000_000_000_000_000] {
            let err = JwtKeys::new(b"dev-secret", ttl).issue("a@x.com").unwrap_err();
            assert!(matches!(err, TokenError::TtlOutOfRange(t) if t == ttl));
        }
    }

    #[test]
    fn missing_or_empty_header_is_missing_token() {
        assert_eq!(keys().validate(None), Err(ValidationError::MissingToken));
        assert_eq!(keys().validate(Some("")), Err(ValidationError::MissingToken));
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert_eq!(
            keys().validate(Some("Token abc")),
            Err(ValidationError::WrongScheme)
        );
        let issued = keys().issue("a@x.com").unwrap();
        assert_eq!(
            keys().validate(Some(&format!("bearer {}", issued.token))),
            Err(ValidationError::WrongScheme)
        );
    }

    #[test]
    fn token_from_another_secret_has_bad_signature() {
        let issued = JwtKeys::new(b"other-secret", 5).issue("a@x.com").unwrap();
        assert_eq!(
            keys().validate(Some(&bearer(&issued.token))),
            Err(ValidationError::BadSignature)
        );
    }

    #[test]
    fn tampered_or_garbage_tokens_have_bad_signature() {
        let forged = sign_raw(json!({"email": "b@x.com", "iat": 0, "exp": far_future()}), b"x");
        let forged_claims = forged.split('.').nth(1).unwrap().to_string();
        let issued = keys().issue("a@x.com").unwrap();
        let mut parts: Vec<&str> = issued.token.split('.').collect();
        parts[1] = &forged_claims;
        let tampered = parts.join(".");
        assert_eq!(
            keys().validate(Some(&bearer(&tampered))),
            Err(ValidationError::BadSignature)
        );
        assert_eq!(
            keys().validate(Some("Bearer not.a.jwt")),
            Err(ValidationError::BadSignature)
        );
        assert_eq!(
            keys().validate(Some("Bearer ")),
            Err(ValidationError::BadSignature)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = JwtKeys::new(b"dev-secret", -5).issue("a@x.com").unwrap();
        assert_eq!(
            keys().validate(Some(&bearer(&issued.token))),
            Err(ValidationError::Expired)
        );
    }

    #[test]
    fn wrongly_typed_claims_are_malformed() {
        let token = sign_raw(json!({"email": 42, "iat": 0, "exp": far_future()}), b"dev-secret");
        assert_eq!(
            keys().validate(Some(&bearer(&token))),
            Err(ValidationError::MalformedClaims)
        );
        let no_exp = sign_raw(json!({"email": "a@x.com"}), b"dev-secret");
        assert_eq!(
            keys().validate(Some(&bearer(&no_exp))),
            Err(ValidationError::MalformedClaims)
        );
    }

    #[test]
    fn token_without_identity_claim_is_invalid() {
        let token = sign_raw(json!({"iat": 0, "exp": far_future()}), b"dev-secret");
        assert_eq!(
            keys().validate(Some(&bearer(&token))),
            Err(ValidationError::InvalidToken)
        );
    }
}
