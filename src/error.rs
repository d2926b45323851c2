use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::models::MessageResponse;
use crate::reports::transfer::ExportError;
use crate::reports::FilterError;
use crate::services::auth_service::AuthError;
use crate::services::report_service::SubmissionError;
use crate::store::StoreError;

pub const REPORT_NOT_FOUND: &str = "Reporte no encontrado";
const SERVER_ERROR: &str = "Error en el servidor";

/// Error returned by every handler. Renders as `{"message": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.as_str()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.as_str()),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR)
            }
        };
        (status, Json(MessageResponse::new(message))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::NotFound(REPORT_NOT_FOUND.to_string()),
            StoreError::Duplicate(id) => ApiError::Conflict(format!("El reporte {} ya existe", id)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingFields => ApiError::BadRequest(e.to_string()),
            AuthError::AlreadyExists => ApiError::Conflict(e.to_string()),
            AuthError::UnknownUser | AuthError::WrongPassword => ApiError::Unauthorized(e.to_string()),
            AuthError::Hash(_) | AuthError::Store(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::NotAnObject | SubmissionError::TooManyImages => {
                ApiError::BadRequest(e.to_string())
            }
            SubmissionError::Upload(_) => ApiError::Internal(e.to_string()),
            SubmissionError::Store(store) => store.into(),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::BadRequest(format!("Multipart error: {}", e))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("JSON inválido: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_status() {
        let not_found: ApiError = StoreError::NotFound("R-1".to_string()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let duplicate: ApiError = StoreError::Duplicate("R-1".to_string()).into();
        assert_eq!(duplicate.into_response().status(), StatusCode::CONFLICT);

        let poisoned: ApiError = StoreError::Poisoned.into();
        assert_eq!(poisoned.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_errors_keep_user_facing_messages() {
        let err: ApiError = AuthError::WrongPassword.into();
        assert_eq!(err.to_string(), "Contraseña incorrecta");
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::AlreadyExists.into();
        assert_eq!(err.to_string(), "El usuario ya existe");

        let err: ApiError = AuthError::MissingFields.into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
