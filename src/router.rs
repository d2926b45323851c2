use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app_state::AppState;
use crate::handlers;
use crate::openapi;

pub fn create_router(state: AppState, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/version", get(handlers::version::version))
        .route("/api/openapi.json", get(openapi::openapi_json))
        .route(
            "/api/reportes",
            get(handlers::reports::list_reports).post(handlers::reports::create_report),
        )
        .route("/api/reportes/stats", get(handlers::reports::report_stats))
        .route("/api/reportes/export", get(handlers::reports::export_reports))
        .route(
            "/api/reportes/:id",
            patch(handlers::reports::update_report).delete(handlers::reports::delete_report),
        )
        .route("/api/register", post(handlers::auth::register))
        .route("/api/login", post(handlers::auth::login))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
