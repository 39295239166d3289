pub mod ask;
pub mod health;
pub mod home;

use crate::config::ServerConfig;
use crate::services::AppState;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Assemble the application router with its middleware stack
pub fn create_router(
    state: AppState,
    metrics_handle: PrometheusHandle,
    server: &ServerConfig,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app_routes = Router::new()
        .route("/", get(home::show_page).post(home::submit_question))
        .route("/ask", post(ask::ask))
        .route("/health", get(health::health))
        .route("/readiness", get(health::readiness))
        .with_state(state);

    let metrics_route = Router::new().route(
        "/metrics",
        get(move || {
            let handle = metrics_handle.clone();
            async move { handle.render() }
        }),
    );

    Router::new().merge(app_routes).merge(metrics_route).layer(
        ServiceBuilder::new()
            // Request IDs first so the trace layer sees them
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(server.request_timeout()))
            .layer(ConcurrencyLimitLayer::new(server.max_concurrent_requests))
            .layer(cors),
    )
}
