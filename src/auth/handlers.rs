use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    app::store_rejection,
    auth::{
        dto::{AuthResult, AuthenticateRequest, PublicUser, RegisterRequest},
        jwt::{AuthUser, JwtKeys},
        repo::RegisterError,
        repo_types::User,
        services::{self, authenticate, normalize_email},
    },
    state::AppState,
    store::StoreError,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/authenticate", post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/users/:email", get(get_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let user = services::register(state.store.as_ref(), &state.config.tables.users, payload)
        .await
        .map_err(|e| match e {
            RegisterError::InvalidEmail | RegisterError::MissingPassword => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            RegisterError::AlreadyRegistered => (StatusCode::CONFLICT, e.to_string()),
            RegisterError::Store(e) => {
                error!(error = %e, "register failed");
                store_rejection(e)
            }
            RegisterError::Hashing(e) => {
                error!(error = %e, "register failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        })?;
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

/// Always answers 200; the body says whether authentication succeeded.
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<AuthenticateRequest>,
) -> Json<AuthResult> {
    let keys = JwtKeys::from_ref(&state);
    let result = authenticate(
        state.store.as_ref(),
        &state.config.tables.users,
        &keys,
        &normalize_email(&payload.email),
        &payload.pwd,
    )
    .await;
    Json(result)
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let email = normalize_email(&email);
    let user = User::find_by_email(state.store.as_ref(), &state.config.tables.users, &email)
        .await
        .map_err(|e| {
            warn!(error = %e, email = %email, "user lookup failed");
            store_rejection(e)
        })?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = User::find_by_email(state.store.as_ref(), &state.config.tables.users, &email)
        .await
        .map_err(|e| {
            error!(error = %e, email = %email, "authenticated user not found");
            match e {
                StoreError::NotFound => (StatusCode::UNAUTHORIZED, "User not found".into()),
                other => store_rejection(other),
            }
        })?;
    Ok(Json(PublicUser::from(user)))
}
