use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use board_core::BoardError;
use board_types::api::ErrorBody;

/// Handler-level failure. Everything renders as the uniform
/// `{"status":"error","message"}` body; nothing propagates past the
/// operation boundary unhandled.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        error!("internal error: {err:#}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        let status = match &err {
            BoardError::LockTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            BoardError::ColumnNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BoardError::UpdateFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BoardError::UserNotFound(_) => StatusCode::NOT_FOUND,
            BoardError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        };
        if let BoardError::UpdateFailed(cause) = &err {
            error!("row store update failed: {cause:#}");
        }
        Self::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                status: "error".to_string(),
                message: self.message,
            }),
        )
            .into_response()
    }
}
