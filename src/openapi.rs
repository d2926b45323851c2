use axum::Json;
use utoipa::OpenApi;

use crate::models::{
    AuthResponse, CreatedResponse, DepartmentField, HealthResponse, LoginRequest, MessageResponse, NewReport,
    Priority, RegisterRequest, Report, ReportPatch, Status, User, VersionResponse,
};
use crate::reports::aggregate::{DashboardStats, Kpis, MonthBucket, PriorityBucket, Trend, WeekdayBucket};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::version::version,
        crate::handlers::reports::list_reports,
        crate::handlers::reports::create_report,
        crate::handlers::reports::update_report,
        crate::handlers::reports::delete_report,
        crate::handlers::reports::report_stats,
        crate::handlers::reports::export_reports,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
    ),
    components(
        schemas(
            Report, NewReport, ReportPatch, DepartmentField, Priority, Status,
            User, RegisterRequest, LoginRequest, AuthResponse, MessageResponse, CreatedResponse,
            HealthResponse, VersionResponse,
            DashboardStats, Kpis, PriorityBucket, WeekdayBucket, MonthBucket, Trend
        )
    ),
    tags(
        (name = "helpdesk-reports", description = "Helpdesk incident reports, dashboard aggregates and users")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
