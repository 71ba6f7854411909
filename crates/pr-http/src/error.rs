//! axum error plumbing. `AppError` and `IntoResponse` are both foreign to
//! this crate, so a thin local wrapper is the only way to give the error
//! taxonomy a response shape.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pr_core::AppError;
use serde_json::json;

pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self(AppError::External(e.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
