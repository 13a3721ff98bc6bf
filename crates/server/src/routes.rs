//! Route configuration.

use crate::auth::request_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.server.max_upload_bytes).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/menu-images", get(handlers::list_images))
        .route(
            "/api/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/delete-image", post(handlers::delete_image))
        .route("/api/login", post(handlers::login))
        .route("/api/logout", post(handlers::logout));

    let mut router = Router::new().merge(api_routes);

    // Local backends are served under their public path.
    for (mount, backend) in state.mounted_backends() {
        let assets = Router::new()
            .route("/{file}", get(handlers::serve_asset))
            .with_state(backend);
        router = router.nest(&mount, assets);
    }

    // When enabled, /metrics should be network-restricted to the scraper.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // Order of execution: TraceLayer -> CatchPanic -> interceptor -> handler
    router
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_middleware,
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
