use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> anyhow::Result<Router<AppState>> {
    Ok(Router::new().route("/health", get(|| async { "ok" })))
}
