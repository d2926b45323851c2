use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use utoipa::IntoParams;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{CreatedResponse, MessageResponse, NewReport, Report, ReportPatch};
use crate::reports::filter::FilterParams;
use crate::reports::transfer::{export, export_filename, FileFormat};
use crate::reports::{DashboardStats, ReportFilter};
use crate::services::report_service::{self, Upload, MAX_IMAGES};

#[utoipa::path(
    get,
    path = "/api/reportes",
    responses((status = 200, description = "All reports, newest first", body = [Report]))
)]
pub async fn list_reports(State(state): State<AppState>) -> Result<Json<Vec<Report>>, ApiError> {
    let reports = state.reports.list().await?;
    debug!("Listing {} reports", reports.len());
    Ok(Json(reports))
}

/// Accepts either a JSON body or `multipart/form-data` with a `data` field and
/// up to ten `imagenes` files.
#[utoipa::path(
    post,
    path = "/api/reportes",
    request_body = NewReport,
    responses(
        (status = 201, description = "Report stored", body = CreatedResponse),
        (status = 400, description = "Malformed payload or too many images", body = MessageResponse),
        (status = 409, description = "Report id already exists", body = MessageResponse)
    )
)]
pub async fn create_report(
    State(state): State<AppState>,
    request: Request,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("multipart/form-data"));

    let (payload, uploads) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        let (payload, uploads) = read_multipart(multipart).await?;
        (payload, Some(uploads))
    } else {
        let body = Bytes::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        (serde_json::from_slice::<Value>(&body)?, None)
    };

    let report = report_service::create_report(
        state.reports.as_ref(),
        &payload,
        uploads.as_deref(),
        &state.upload_dir,
        &state.roster,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Reporte guardado correctamente".to_string(),
            id: report.id,
        }),
    ))
}

/// Splits a multipart submission into the report payload and its files. Without a
/// `data` field the remaining text fields form the payload; repeated names become lists.
async fn read_multipart(mut multipart: Multipart) -> Result<(Value, Vec<Upload>), ApiError> {
    let mut data: Option<Value> = None;
    let mut fields = Map::new();
    let mut uploads = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "imagenes" if field.file_name().is_some() => {
                if uploads.len() == MAX_IMAGES {
                    return Err(report_service::SubmissionError::TooManyImages.into());
                }
                let file_name = field.file_name().unwrap_or("imagen").to_string();
                let bytes = field.bytes().await?;
                uploads.push(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "data" => {
                let text = field.text().await?;
                data = Some(serde_json::from_str(&text)?);
            }
            "" => {}
            _ => {
                let text = field.text().await?;
                let key = name.trim_end_matches("[]").to_string();
                match fields.get_mut(&key) {
                    Some(Value::Array(items)) => items.push(Value::String(text)),
                    Some(existing) => {
                        let first = existing.take();
                        *existing = Value::Array(vec![first, Value::String(text)]);
                    }
                    None => {
                        fields.insert(key, Value::String(text));
                    }
                }
            }
        }
    }

    Ok((data.unwrap_or(Value::Object(fields)), uploads))
}

#[utoipa::path(
    patch,
    path = "/api/reportes/{id}",
    params(("id" = String, Path, description = "Report id")),
    request_body = ReportPatch,
    responses(
        (status = 200, description = "Report updated", body = MessageResponse),
        (status = 404, description = "Unknown report id", body = MessageResponse)
    )
)]
pub async fn update_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let patch: ReportPatch = serde_json::from_slice(&body)?;
    state.reports.update(&id, &patch).await?;
    info!("Updated report {}", id);
    Ok(Json(MessageResponse::new("Reporte actualizado correctamente")))
}

#[utoipa::path(
    delete,
    path = "/api/reportes/{id}",
    params(("id" = String, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report deleted", body = MessageResponse),
        (status = 404, description = "Unknown report id", body = MessageResponse)
    )
)]
pub async fn delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.reports.delete(&id).await?;
    info!("Deleted report {}", id);
    Ok(Json(MessageResponse::new("Reporte eliminado correctamente")))
}

#[utoipa::path(
    get,
    path = "/api/reportes/stats",
    params(FilterParams),
    responses(
        (status = 200, description = "Dashboard aggregates over the filtered reports", body = DashboardStats),
        (status = 400, description = "Unknown filter value", body = MessageResponse)
    )
)]
pub async fn report_stats(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Json<DashboardStats>, ApiError> {
    let filter = ReportFilter::try_from(&params)?;
    let now = Local::now();
    let reports = state.reports.list().await?;
    let filtered = filter.apply(&reports, &now);
    Ok(Json(DashboardStats::compute(&filtered, &filter.date_range, &now)))
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExportParams {
    /// `csv` (default) or `json`
    pub format: Option<String>,
    pub fecha: Option<String>,
    pub prioridad: Option<String>,
    pub tipo: Option<String>,
    pub q: Option<String>,
}

impl ExportParams {
    fn filter_params(&self) -> FilterParams {
        FilterParams {
            fecha: self.fecha.clone(),
            prioridad: self.prioridad.clone(),
            tipo: self.tipo.clone(),
            q: self.q.clone(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/reportes/export",
    params(ExportParams),
    responses(
        (status = 200, description = "Filtered reports as a CSV or JSON download"),
        (status = 400, description = "Unknown format or filter value", body = MessageResponse)
    )
)]
pub async fn export_reports(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let format: FileFormat = params
        .format
        .as_deref()
        .unwrap_or("csv")
        .parse()
        .map_err(|e: crate::reports::transfer::ImportError| ApiError::BadRequest(e.to_string()))?;
    let filter = ReportFilter::try_from(&params.filter_params())?;
    let now = Local::now();
    let reports = state.reports.list().await?;
    let filtered = filter.apply(&reports, &now);

    let body = export(&filtered, format)?;
    let filename = export_filename(now.date_naive(), format);
    info!("Exporting {} reports as {}", filtered.len(), filename);

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, format.content_type().to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
        .into_response())
}
