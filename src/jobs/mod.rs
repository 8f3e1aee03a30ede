pub mod dto;
pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repo;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub use repo::{JobStore, PgJobStore};

pub fn router() -> anyhow::Result<Router<AppState>> {
    Ok(handlers::jobs_routes())
}
