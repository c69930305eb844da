//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use courier_chats::ChatError;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Numeric HTTP status, e.g. `"404"`.
    pub error: String,
    pub message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: status.as_str().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<ChatError> for GatewayError {
    fn from(error: ChatError) -> Self {
        let message = error.to_string();
        match error {
            ChatError::Validation { .. } => GatewayError::InvalidRequest(message),
            ChatError::RoomNotFound { .. } | ChatError::MessageNotFound { .. } => {
                GatewayError::NotFound(message)
            }
            ChatError::Authorization { .. } => GatewayError::AuthorizationFailed(message),
            ChatError::Conflict { .. } => GatewayError::Conflict(message),
            ChatError::Storage { .. } => GatewayError::InternalError(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_errors_map_to_documented_statuses() {
        let cases = [
            (ChatError::validation("x"), StatusCode::BAD_REQUEST),
            (ChatError::room_not_found("r"), StatusCode::NOT_FOUND),
            (ChatError::message_not_found("m"), StatusCode::NOT_FOUND),
            (ChatError::authorization("no"), StatusCode::FORBIDDEN),
            (ChatError::conflict("race"), StatusCode::CONFLICT),
            (ChatError::storage("disk"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, status) in cases {
            assert_eq!(GatewayError::from(error).status_code(), status);
        }
    }
}
