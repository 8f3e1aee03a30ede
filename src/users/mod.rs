pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod reconcile;
pub mod repo;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub use reconcile::ensure_user_in_db;
pub use repo::{PgUserDirectory, UserDirectory};

pub fn router() -> anyhow::Result<Router<AppState>> {
    Ok(handlers::users_routes())
}
