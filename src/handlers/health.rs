use axum::{http::StatusCode, response::Json};

use crate::models::HealthResponse;

pub const SERVICE_NAME: &str = "helpdesk-reports";

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
        }),
    )
}
