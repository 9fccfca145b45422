use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    app::store_rejection,
    auth::jwt::AuthUser,
    sessions::{dto::SessionInput, repo_types::Session},
    state::AppState,
};

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).put(save_session))
        .route("/sessions/:id", get(get_session))
}

#[instrument(skip(state))]
pub async fn list_sessions(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> Result<Json<Vec<Session>>, (StatusCode, String)> {
    let sessions =
        Session::list_by_owner(state.store.as_ref(), &state.config.tables.sessions, &email)
            .await
            .map_err(|e| {
                error!(error = %e, email = %email, "list sessions failed");
                store_rejection(e)
            })?;
    Ok(Json(sessions))
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Session>, (StatusCode, String)> {
    let session = Session::find_by_id(
        state.store.as_ref(),
        &state.config.tables.sessions,
        &id,
        &email,
    )
    .await
    .map_err(|e| {
        warn!(error = %e, %id, email = %email, "get session failed");
        store_rejection(e)
    })?;
    Ok(Json(session))
}

#[instrument(skip(state, input))]
pub async fn save_session(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Json(input): Json<SessionInput>,
) -> Result<Json<Session>, (StatusCode, String)> {
    let session = Session::upsert(
        state.store.as_ref(),
        &state.config.tables.sessions,
        input.into_session(email),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "save session failed");
        store_rejection(e)
    })?;
    Ok(Json(session))
}
