use axum::{http::StatusCode, response::Json};

use super::health::SERVICE_NAME;
use crate::models::VersionResponse;

/// Stamps injected at build time through `HELPDESK_BUILD_VERSION`,
/// `HELPDESK_GIT_SHA` and `HELPDESK_BUILD_TIME`.
pub fn build_info() -> VersionResponse {
    VersionResponse {
        service: SERVICE_NAME.to_string(),
        version: option_env!("HELPDESK_BUILD_VERSION")
            .unwrap_or(env!("CARGO_PKG_VERSION"))
            .to_string(),
        git_sha: option_env!("HELPDESK_GIT_SHA").unwrap_or_default().to_string(),
        build_time: option_env!("HELPDESK_BUILD_TIME").unwrap_or_default().to_string(),
    }
}

#[utoipa::path(
    get,
    path = "/version",
    responses((status = 200, description = "Build information", body = VersionResponse))
)]
pub async fn version() -> (StatusCode, Json<VersionResponse>) {
    (StatusCode::OK, Json(build_info()))
}
