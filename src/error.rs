use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::WarehouseError;

/// Errors surfaced to HTTP callers as `{ "error": message }`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] WarehouseError),

    #[error("unexpected {record} row shape: {source}")]
    RowMapping {
        record: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("warehouse query timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MissingToken | Self::InvalidToken | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(_) | Self::RowMapping { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the failure happened on our side of the request rather than in
    /// the caller's input.
    pub fn is_server_fault(&self) -> bool {
        self.status().is_server_error()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Response extension marking a 5xx produced from an [`AppError`], so the
/// production masking layer can recognise it.
#[derive(Debug, Clone, Copy)]
pub struct ServerFault;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let server_fault = self.is_server_fault();
        if server_fault {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
        }

        let mut response = (status, Json(ErrorBody::new(self.to_string()))).into_response();
        if server_fault {
            response.extensions_mut().insert(ServerFault);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_taxonomy() {
        assert_eq!(
            AppError::validation("Invalid year parameter").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("nope".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Upstream(WarehouseError::statement("FAILED", "boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Timeout(Duration::from_secs(1)).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn auth_messages_match_client_contract() {
        assert_eq!(AppError::MissingToken.to_string(), "Missing token");
        assert_eq!(
            AppError::InvalidToken.to_string(),
            "Invalid or expired token"
        );
        assert_eq!(
            AppError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
    }

    #[test]
    fn only_server_faults_are_marked() {
        let response = AppError::validation("bad").into_response();
        assert!(response.extensions().get::<ServerFault>().is_none());

        let response = AppError::internal("signing failed").into_response();
        assert!(response.extensions().get::<ServerFault>().is_some());
    }
}
