use axum::{body::Bytes, extract::State, http::StatusCode, Json};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest};
use crate::services::auth_service;

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Missing fields", body = MessageResponse),
        (status = 409, description = "Email already registered", body = MessageResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let request: RegisterRequest = serde_json::from_slice(&body)?;
    let usuario = auth_service::register(state.users.as_ref(), &request).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Usuario registrado correctamente".to_string(),
            usuario,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = AuthResponse),
        (status = 400, description = "Missing fields", body = MessageResponse),
        (status = 401, description = "Unknown email or wrong password", body = MessageResponse)
    )
)]
pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Json<AuthResponse>, ApiError> {
    let request: LoginRequest = serde_json::from_slice(&body)?;
    let usuario = auth_service::authenticate(state.users.as_ref(), &request).await?;
    Ok(Json(AuthResponse {
        message: "Login exitoso".to_string(),
        usuario,
    }))
}
