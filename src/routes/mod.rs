//! Route modules mounted under `/api/v1`.
//!
//! Every module is registered in [`REGISTRY`]. The loader builds each one in
//! isolation: a module that fails to build, or panics while being merged, is
//! logged and skipped without affecting the others.

pub mod health;
pub mod root;

use std::panic::{catch_unwind, AssertUnwindSafe};

use axum::Router;
use tracing::{error, info};

use crate::{jobs, state::AppState, users};

pub const API_PREFIX: &str = "/api/v1";

/// A named handler collection contributed to the API.
#[derive(Clone, Copy)]
pub struct RouteModule {
    pub name: &'static str,
    pub mount: fn() -> anyhow::Result<Router<AppState>>,
}

pub const REGISTRY: &[RouteModule] = &[
    RouteModule {
        name: "health",
        mount: health::router,
    },
    RouteModule {
        name: "users",
        mount: users::router,
    },
    RouteModule {
        name: "jobs",
        mount: jobs::router,
    },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub mounted: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Merges every module in `modules` into one router, to be nested under
/// [`API_PREFIX`].
pub fn load_routes(modules: &[RouteModule]) -> (Router<AppState>, LoadReport) {
    let mut api = Router::new();
    let mut report = LoadReport::default();

    for module in modules {
        let candidate = api.clone();
        let merged = catch_unwind(AssertUnwindSafe(|| {
            (module.mount)().map(|routes| candidate.merge(routes))
        }));

        match merged {
            Ok(Ok(next)) => {
                api = next;
                report.mounted.push(module.name);
                info!(module = module.name, prefix = API_PREFIX, "route module mounted");
            }
            Ok(Err(e)) => {
                error!(module = module.name, error = %format!("{e:#}"), "route module failed to load");
                report.skipped.push(module.name);
            }
            Err(payload) => {
                error!(module = module.name, panic = %panic_message(payload.as_ref()), "route module panicked while mounting");
                report.skipped.push(module.name);
            }
        }
    }

    (api, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::memory::MemoryUserDirectory;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn alpha() -> anyhow::Result<Router<AppState>> {
        Ok(Router::new().route("/alpha", get(|| async { "alpha" })))
    }

    fn beta() -> anyhow::Result<Router<AppState>> {
        Ok(Router::new().route("/beta", get(|| async { "beta" })))
    }

    fn broken() -> anyhow::Result<Router<AppState>> {
        anyhow::bail!("missing handler set")
    }

    fn clashing() -> anyhow::Result<Router<AppState>> {
        // Same path and method as `alpha`; axum panics on the merge.
        Ok(Router::new().route("/alpha", get(|| async { "again" })))
    }

    async fn status_of(api: Router<AppState>, path: &str) -> StatusCode {
        let app = Router::new()
            .nest(API_PREFIX, api)
            .with_state(AppState::fake(Arc::new(MemoryUserDirectory::new())));
        app.oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn mounts_modules_under_prefix() {
        let (api, report) = load_routes(&[
            RouteModule { name: "alpha", mount: alpha },
            RouteModule { name: "beta", mount: beta },
        ]);
        assert_eq!(report.mounted, vec!["alpha", "beta"]);
        assert!(report.skipped.is_empty());
        assert_eq!(status_of(api.clone(), "/api/v1/alpha").await, StatusCode::OK);
        assert_eq!(status_of(api, "/api/v1/beta").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn failing_module_does_not_block_others() {
        let (api, report) = load_routes(&[
            RouteModule { name: "broken", mount: broken },
            RouteModule { name: "alpha", mount: alpha },
            RouteModule { name: "clashing", mount: clashing },
            RouteModule { name: "beta", mount: beta },
        ]);
        assert_eq!(report.mounted, vec!["alpha", "beta"]);
        assert_eq!(report.skipped, vec!["broken", "clashing"]);
        assert_eq!(status_of(api.clone(), "/api/v1/alpha").await, StatusCode::OK);
        assert_eq!(status_of(api, "/api/v1/beta").await, StatusCode::OK);
    }

    #[test]
    fn registry_loads_cleanly() {
        let (_, report) = load_routes(REGISTRY);
        assert_eq!(report.mounted, vec!["health", "users", "jobs"]);
        assert!(report.skipped.is_empty());
    }
}
