use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{password::hash_password, SessionUser},
    error::{AppError, AppResult},
    state::AppState,
    users::{
        reconcile::{ensure_user_in_db, SyncOutcome},
        repo::CredentialUpdate,
        repo_types::{ProfileUpdate, PublicUser, User},
    },
};

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me).put(update_me))
        .route("/users/me/credentials", put(set_credentials))
        .route("/users/:auth0_id", get(get_user))
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

#[instrument(skip(state, identity), fields(sub = %identity.sub))]
pub async fn get_me(
    State(state): State<AppState>,
    SessionUser(identity): SessionUser,
) -> AppResult<Json<User>> {
    match ensure_user_in_db(state.users.as_ref(), &identity).await {
        SyncOutcome::Created(user) | SyncOutcome::Existing(Some(user)) => Ok(Json(user)),
        SyncOutcome::Existing(None) => state
            .users
            .find_by_auth0_id(&identity.sub)
            .await?
            .map(Json)
            .ok_or_else(|| AppError::not_found("User not found")),
        SyncOutcome::Failed(e) => Err(e.into()),
    }
}

#[instrument(skip(state, identity, update), fields(sub = %identity.sub))]
pub async fn update_me(
    State(state): State<AppState>,
    SessionUser(identity): SessionUser,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<User>> {
    let user = state
        .users
        .update_profile(&identity.sub, &update)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(role = ?user.role, "profile updated");
    Ok(Json(user))
}

#[instrument(skip(state, identity, payload), fields(sub = %identity.sub))]
pub async fn set_credentials(
    State(state): State<AppState>,
    SessionUser(identity): SessionUser,
    Json(mut payload): Json<CredentialsRequest>,
) -> AppResult<Json<User>> {
    payload.username = payload.username.trim().to_string();

    if !is_valid_username(&payload.username) {
        warn!(username = %payload.username, "invalid username");
        return Err(AppError::bad_request("Invalid username"));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AppError::bad_request("Password too short"));
    }

    let hash = hash_password(&payload.password)?;
    match state
        .users
        .set_credentials(&identity.sub, &payload.username, &hash)
        .await?
    {
        CredentialUpdate::Updated(user) => {
            info!(username = %payload.username, "credentials set");
            Ok(Json(user))
        }
        CredentialUpdate::UsernameTaken => Err(AppError::conflict("Username already taken")),
        CredentialUpdate::NotFound => Err(AppError::not_found("User not found")),
    }
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(auth0_id): Path<String>,
) -> AppResult<Json<PublicUser>> {
    state
        .users
        .find_by_auth0_id(&auth0_id)
        .await?
        .map(|u| Json(PublicUser::from(u)))
        .ok_or_else(|| AppError::not_found("User not found"))
}
