use std::net::SocketAddr;

use axum::{
    http::{HeaderName, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{
    auth,
    config::{AppConfig, CorsConfig},
    routes::{self, root, API_PREFIX, REGISTRY},
    state::AppState,
};

pub fn cors_layer(cfg: &CorsConfig) -> CorsLayer {
    let methods: Vec<Method> = cfg
        .methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    let allowed: Vec<HeaderName> = cfg
        .allowed_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();
    let exposed: Vec<HeaderName> = cfg
        .exposed_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(allowed)
        .expose_headers(exposed)
        .allow_credentials(cfg.credentials);

    match cfg.origin.parse::<HeaderValue>() {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(origin = %cfg.origin, error = %e, "invalid CORS origin; cross-origin requests will be refused");
            layer
        }
    }
}

/// Assembles the full middleware pipeline and route table.
pub fn build_app(state: AppState) -> Router {
    let (api, report) = routes::load_routes(REGISTRY);
    tracing::info!(mounted = ?report.mounted, skipped = ?report.skipped, "route modules loaded");

    let mut router = Router::new()
        .route("/", get(root::index))
        .route("/login", get(auth::handlers::login).post(root::password_login))
        .merge(auth::handlers::provider_routes());
    if !report.mounted.is_empty() {
        router = router.nest(API_PREFIX, api);
    }

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::session::session_middleware,
        ))
        .layer(cors_layer(&state.config.cors))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Server is running on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
