use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::auth::dto::{AuthResult, PublicUser, RegisterRequest};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::verify_password;
use crate::auth::repo::RegisterError;
use crate::auth::repo_types::User;
use crate::store::{KvStore, StoreError};

pub const NO_SUCH_USER: &str =
    "Unable to find a record with the given email. Please verify your email and try again";
pub const PASSWORD_MISMATCH: &str =
    "The password submitted does not match this user's password. Please check the email and password and try again";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalise and validate the request, refuse a taken email, then create the
/// user.
///
/// The existence check and the write are separate store calls. Two
/// concurrent registrations of one email can both pass the check; the later
/// write wins.
#[instrument(skip(store, req), fields(email = %req.email))]
pub async fn register(
    store: &dyn KvStore,
    users_table: &str,
    req: RegisterRequest,
) -> Result<User, RegisterError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(RegisterError::InvalidEmail);
    }
    if req.pwd.is_empty() {
        return Err(RegisterError::MissingPassword);
    }

    match User::find_by_email(store, users_table, &email).await {
        Ok(_) => {
            warn!(email = %email, "email already registered");
            return Err(RegisterError::AlreadyRegistered);
        }
        Err(StoreError::NotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let user = User::create(store, users_table, &email, &req.pwd, &req.name, &req.role).await?;
    info!(email = %user.email, "user registered");
    Ok(user)
}

/// Look the user up, check the password, sign a token.
///
/// Every failure ends the attempt with `AuthResult::failure`; nothing is
/// retried and nothing is returned as an error.
#[instrument(skip(store, keys, plain_pwd))]
pub async fn authenticate(
    store: &dyn KvStore,
    users_table: &str,
    keys: &JwtKeys,
    email: &str,
    plain_pwd: &str,
) -> AuthResult {
    let user = match User::find_by_email(store, users_table, email).await {
        Ok(user) => user,
        Err(e) => {
            warn!(error = %e, "authenticate: user lookup failed");
            return AuthResult::failure(NO_SUCH_USER);
        }
    };

    if !verify_password(plain_pwd, &user.pwd) {
        warn!("authenticate: password mismatch");
        return AuthResult::failure(PASSWORD_MISMATCH);
    }

    let issued = match keys.issue(&user.email) {
        Ok(issued) => issued,
        Err(e) => {
            error!(error = %e, "authenticate: token signing failed");
            return AuthResult::failure(e.to_string());
        }
    };

    info!(email = %user.email, expires_at = %issued.expires_at, "user authenticated");
    AuthResult::success(issued, PublicUser::from(user))
}
