//! # Error Handling Middleware
//!
//! Maps [`ClinicError`] kinds to HTTP status codes and a JSON body of the
//! form `{"error": message, "kind": kind}`, so every handler reports
//! failures the same way.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use slotbook_core::errors::ClinicError;
use tracing::error;

/// Seconds a client is asked to wait after a Busy response.
pub const RETRY_AFTER_SECONDS: u64 = 1;

/// Application error wrapper that provides HTTP status code mapping
///
/// # Example
///
/// ```
/// use axum::Json;
/// use slotbook_api::middleware::error_handling::AppError;
/// use slotbook_core::errors::ClinicError;
///
/// async fn handler() -> Result<Json<()>, AppError> {
///     Err(ClinicError::NotFound("Schedule not found".to_string()).into())
/// }
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct AppError(pub ClinicError);

pub fn status_for(err: &ClinicError) -> StatusCode {
    match err {
        ClinicError::NotFound(_) => StatusCode::NOT_FOUND,
        ClinicError::Conflict(_)
        | ClinicError::DuplicateBooking(_)
        | ClinicError::SlotUnavailable(_)
        | ClinicError::InvalidTransition { .. } => StatusCode::CONFLICT,
        ClinicError::InvalidRange(_) | ClinicError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        ClinicError::Forbidden(_) => StatusCode::FORBIDDEN,
        ClinicError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
        ClinicError::DependencyFailure(_) => StatusCode::BAD_GATEWAY,
        ClinicError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() && !self.0.is_retryable() {
            error!("Request failed: {:?}", self.0);
        }

        let body = Json(json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        }));
        let mut response = (status, body).into_response();

        if self.0.is_retryable() {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(RETRY_AFTER_SECONDS),
            );
        }
        response
    }
}

/// Allows `?` on `ClinicResult` inside handlers.
impl From<ClinicError> for AppError {
    fn from(err: ClinicError) -> Self {
        AppError(err)
    }
}

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        AppError(ClinicError::Database(err))
    }
}

/// Maps a ClinicError to an HTTP response
pub fn map_error(err: ClinicError) -> Response {
    AppError(err).into_response()
}
