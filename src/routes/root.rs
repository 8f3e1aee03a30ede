use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{password::verify_or_dummy, JsonOrForm, OidcContext},
    state::AppState,
    users::{ensure_user_in_db, repo_types::User},
};

pub const NOT_LOGGED_IN: &str = "You are not logged in";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginSuccess {
    pub success: bool,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginFailure {
    pub success: bool,
    pub message: &'static str,
}

fn login_failure(status: StatusCode, message: &'static str) -> Response {
    (
        status,
        Json(LoginFailure {
            success: false,
            message,
        }),
    )
        .into_response()
}

/// `GET /`: provisions the logged-in user and sends them on to the client app.
#[instrument(skip(state, oidc))]
pub async fn index(State(state): State<AppState>, oidc: OidcContext) -> Response {
    let Some(claims) = oidc.user() else {
        return NOT_LOGGED_IN.into_response();
    };
    let outcome = ensure_user_in_db(state.users.as_ref(), claims).await;
    if outcome.is_failed() {
        warn!(sub = %claims.sub, "redirecting despite failed user sync");
    }
    Redirect::to(&state.config.client_url).into_response()
}

/// `POST /login`: direct username/password check against stored argon2 hashes.
/// An unreadable body is answered like a failed login.
#[instrument(skip(state, body))]
pub async fn password_login(
    State(state): State<AppState>,
    body: Result<JsonOrForm<LoginRequest>, Response>,
) -> Response {
    let Ok(JsonOrForm(payload)) = body else {
        warn!("login body missing username or password");
        return login_failure(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS);
    };
    let username = payload.username.trim();

    let user = match state.users.find_by_username(username).await {
        Ok(u) => u,
        Err(e) => {
            error!(error = %format!("{e:#}"), "find_by_username failed");
            return login_failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let hash = user.as_ref().and_then(|u| u.password_hash.as_deref());
    let ok = match verify_or_dummy(&payload.password, hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return login_failure(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    match user {
        Some(user) if ok => {
            info!(user_id = %user.id, "user logged in with credentials");
            (StatusCode::OK, Json(LoginSuccess { success: true, user })).into_response()
        }
        _ => {
            warn!(username = %username, "login invalid credentials");
            login_failure(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS)
        }
    }
}
