use crate::response::ApiResponse;
use axum::{Json, http::StatusCode};
use services::EngineError;

pub type ErrorResponse = (StatusCode, Json<ApiResponse<ErrorBody>>);

#[derive(Debug, serde::Serialize, Default)]
pub struct ErrorBody {
    pub code: String,
}

/// Maps lifecycle errors onto HTTP. Only store failures are retryable (503).
pub fn engine_error_response(err: &EngineError) -> ErrorResponse {
    let status = match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Forbidden { .. } => StatusCode::FORBIDDEN,
        EngineError::EventClosed(_) => StatusCode::CONFLICT,
        EngineError::Key(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };

    if err.is_retryable() {
        tracing::error!(error = %err, "Check-in store unavailable");
    }

    let message = match err {
        EngineError::StoreUnavailable(_) => "Service temporarily unavailable, please retry".to_string(),
        other => other.to_string(),
    };

    (
        status,
        Json(ApiResponse::failure(
            ErrorBody {
                code: err.code().to_string(),
            },
            message,
        )),
    )
}
