//! Login and logout endpoints.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::session::SessionError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Plain success acknowledgement.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// POST /api/login - Check credentials and set the session cookie.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let token = match state.sessions.login(&request.username, &request.password) {
        Ok(token) => token,
        Err(SessionError::InvalidCredentials) => {
            metrics::record_login(false);
            tracing::warn!(username = %request.username, "Rejected login");
            return Err(ApiError::Unauthorized("invalid credentials".to_string()));
        }
        Err(e) => return Err(ApiError::Internal(e.to_string())),
    };

    metrics::record_login(true);
    tracing::info!(username = %request.username, "Admin logged in");

    let cookie = state.sessions.session_cookie(&token);
    Ok((
        [(SET_COOKIE, cookie)],
        Json(SuccessResponse { success: true }),
    )
        .into_response())
}

/// POST /api/logout - Clear the session cookie.
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(SET_COOKIE, state.sessions.cleared_cookie())],
        Json(SuccessResponse { success: true }),
    )
        .into_response()
}
