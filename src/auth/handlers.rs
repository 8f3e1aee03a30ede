use axum::{
    extract::{FromRef, Query, State},
    response::Redirect,
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::AuthVerification,
        session::{removal_cookie, SessionKeys, SESSION_COOKIE, VERIFICATION_COOKIE},
    },
    error::{AppError, AppResult},
    state::AppState,
};

/// Provider-owned routes except `GET /login`, which the gateway mounts next to
/// the direct-credential `POST /login`.
pub fn provider_routes() -> Router<AppState> {
    Router::new()
        .route("/callback", post(callback))
        .route("/logout", get(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackForm {
    pub id_token: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Only same-origin paths are accepted as post-login targets.
fn safe_return_to(target: Option<String>) -> String {
    match target {
        Some(t) if t.starts_with('/') && !t.starts_with("//") => t,
        _ => "/".to_string(),
    }
}

#[instrument(skip(state, jar))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> AppResult<(CookieJar, Redirect)> {
    let keys = SessionKeys::from_ref(&state);
    let verification = AuthVerification {
        state: random_token(),
        nonce: random_token(),
        return_to: safe_return_to(query.return_to),
    };
    let url = state
        .identity
        .authorization_url(&verification.state, &verification.nonce)
        .await?;
    let token = keys.sign_verification(&verification)?;
    Ok((jar.add(keys.verification_cookie(token)), Redirect::to(&url)))
}

#[instrument(skip(state, jar, form))]
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<CallbackForm>,
) -> AppResult<(CookieJar, Redirect)> {
    if let Some(err) = form.error {
        warn!(error = %err, "identity provider returned an error");
        return Err(AppError::bad_request(form.error_description.unwrap_or(err)));
    }

    let keys = SessionKeys::from_ref(&state);
    let verification = jar
        .get(VERIFICATION_COOKIE)
        .and_then(|c| keys.verify_verification(c.value()).ok())
        .ok_or_else(|| AppError::bad_request("Login attempt expired, please retry"))?;
    let jar = jar.remove(removal_cookie(VERIFICATION_COOKIE));

    if form.state.as_deref() != Some(verification.state.as_str()) {
        warn!("callback state mismatch");
        return Err(AppError::bad_request("State mismatch"));
    }
    let id_token = form
        .id_token
        .ok_or_else(|| AppError::bad_request("Missing id_token"))?;

    let identity = state
        .identity
        .verify_id_token(&id_token, &verification.nonce)
        .await
        .map_err(|e| {
            warn!(error = %format!("{e:#}"), "id token verification failed");
            AppError::bad_request("Invalid id_token")
        })?;

    let session = keys.sign_session(&identity)?;
    info!(sub = %identity.sub, "user authenticated");
    Ok((
        jar.add(keys.session_cookie(session)),
        Redirect::to(&verification.return_to),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Redirect)> {
    let url = state.identity.logout_url(&state.config.client_url)?;
    Ok((jar.remove(removal_cookie(SESSION_COOKIE)), Redirect::to(&url)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::memory::MemoryUserDirectory;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use axum_extra::extract::cookie::Cookie;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/login", get(login))
            .merge(provider_routes())
            .with_state(state)
    }

    fn set_cookies(res: &Response) -> Vec<Cookie<'static>> {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| Cookie::parse(v.to_string()).ok())
            .collect()
    }

    fn callback_request(cookie: Option<String>, body: String) -> Request<Body> {
        let mut req = Request::post("/callback")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        req.body(Body::from(body)).unwrap()
    }

    fn verification_for(state: &AppState, st: &str, nonce: &str) -> String {
        let keys = SessionKeys::from_ref(state);
        let token = keys
            .sign_verification(&AuthVerification {
                state: st.into(),
                nonce: nonce.into(),
                return_to: "/".into(),
            })
            .unwrap();
        format!("{VERIFICATION_COOKIE}={token}")
    }

    #[test]
    fn return_to_must_be_local_path() {
        assert_eq!(safe_return_to(Some("/jobs".into())), "/jobs");
        assert_eq!(safe_return_to(Some("//evil.test".into())), "/");
        assert_eq!(safe_return_to(Some("https://evil.test".into())), "/");
        assert_eq!(safe_return_to(None), "/");
    }

    #[tokio::test]
    async fn login_redirects_to_provider_with_verification_cookie() {
        let state = AppState::fake(Arc::new(MemoryUserDirectory::new()));
        let res = app(state)
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://idp.test/authorize?state="));
        assert!(set_cookies(&res)
            .iter()
            .any(|c| c.name() == VERIFICATION_COOKIE));
    }

    #[tokio::test]
    async fn callback_issues_session_cookie() {
        let state = AppState::fake(Arc::new(MemoryUserDirectory::new()));
        let cookie = verification_for(&state, "abc", "n1");
        let res = app(state.clone())
            .oneshot(callback_request(
                Some(cookie),
                "state=abc&id_token=valid:auth0%7C42:n1".into(),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let session = set_cookies(&res)
            .into_iter()
            .find(|c| c.name() == SESSION_COOKIE)
            .expect("session cookie set");
        let keys = SessionKeys::from_ref(&state);
        let claims = keys.verify_session(session.value()).unwrap();
        assert_eq!(claims.sub, "auth0|42");
    }

    #[tokio::test]
    async fn callback_rejects_state_mismatch() {
        let state = AppState::fake(Arc::new(MemoryUserDirectory::new()));
        let cookie = verification_for(&state, "abc", "n1");
        let res = app(state)
            .oneshot(callback_request(
                Some(cookie),
                "state=other&id_token=valid:auth0%7C42:n1".into(),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_without_verification_cookie_is_rejected() {
        let state = AppState::fake(Arc::new(MemoryUserDirectory::new()));
        let res = app(state)
            .oneshot(callback_request(None, "state=abc&id_token=valid:x:n1".into()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn logout_clears_session_and_redirects() {
        let state = AppState::fake(Arc::new(MemoryUserDirectory::new()));
        let res = app(state)
            .oneshot(
                Request::get("/logout")
                    .header(header::COOKIE, format!("{SESSION_COOKIE}=whatever"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://idp.test/v2/logout"));
        let cleared = set_cookies(&res)
            .into_iter()
            .find(|c| c.name() == SESSION_COOKIE)
            .expect("session cookie cleared");
        assert_eq!(cleared.value(), "");
    }
}
