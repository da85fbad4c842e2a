//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 403 Forbidden - Caller lacks the required capability.
    Forbidden {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 409 Conflict - Queue state does not permit the operation.
    Conflict {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional additional details.
        details: Option<serde_json::Value>,
    },

    /// 422 Unprocessable Entity - Semantically invalid configuration.
    Unprocessable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional details (not exposed to client in production).
        details: Option<String>,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "QUEUE_PAUSED",
    "message": "Queue is currently paused. Cannot issue new tickets.",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "NO_CURRENT_TICKET").
    #[schema(example = "QUEUE_PAUSED")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "Queue is currently paused. Cannot issue new tickets.")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest {
                error_code,
                message,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::Forbidden {
                error_code,
                message,
            } => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::NotFound {
                error_code,
                message,
            } => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::Conflict {
                error_code,
                message,
                details,
            } => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: error_code,
                    message,
                    details,
                },
            ),

            Self::Unprocessable {
                error_code,
                message,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse {
                    error: error_code,
                    message,
                    details: None,
                },
            ),

            Self::InternalError {
                error_code,
                message,
                details,
            } => {
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    details = ?details,
                    "Internal server error"
                );

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: details.map(|d| serde_json::json!(d)),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::Forbidden { message, .. } => write!(f, "Forbidden: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
            Self::Unprocessable { message, .. } => write!(f, "Unprocessable: {message}"),
            Self::InternalError { message, .. } => write!(f, "Internal Error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from qms_core errors.
impl From<qms_core::QmsError> for ApiError {
    fn from(err: qms_core::QmsError) -> Self {
        use qms_core::QmsError;

        let error_code = err.error_code().to_string();
        match &err {
            QmsError::EmptyReason
            | QmsError::ReasonTooLong { .. }
            | QmsError::InvalidPhoneNumber(_) => Self::BadRequest {
                error_code,
                message: err.to_string(),
            },

            QmsError::Unauthorized { .. } => Self::Forbidden {
                error_code,
                message: err.to_string(),
            },

            QmsError::NotFound(_) => Self::NotFound {
                error_code,
                message: err.to_string(),
            },

            QmsError::QueuePaused
            | QmsError::NoPendingTickets
            | QmsError::NoCurrentTicket
            | QmsError::InvalidStatus { .. } => Self::Conflict {
                error_code,
                message: err.to_string(),
                details: None,
            },

            QmsError::ConcurrentModification { expected, found } => Self::Conflict {
                error_code,
                message: err.to_string(),
                details: Some(serde_json::json!({
                    "expected_revision": expected,
                    "found_revision": found,
                    "retryable": true
                })),
            },

            QmsError::ConfigNotFound(_)
            | QmsError::ConfigParse(_)
            | QmsError::ConfigValidation(_) => Self::Unprocessable {
                error_code,
                message: err.to_string(),
            },

            QmsError::Storage(_) | QmsError::Io(_) => Self::InternalError {
                error_code,
                message: err.to_string(),
                details: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qms_core::QmsError;

    #[test]
    fn test_display_messages() {
        let err = ApiError::BadRequest {
            error_code: "test_error".to_string(),
            message: "Test message".to_string(),
        };
        assert!(err.to_string().contains("Bad Request"));
    }

    #[test]
    fn test_error_response_serialization() {
        let response = ErrorResponse {
            error: "QUEUE_PAUSED".to_string(),
            message: "paused".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("QUEUE_PAUSED"));
    }

    #[test]
    fn test_core_error_mapping() {
        assert!(matches!(
            ApiError::from(QmsError::QueuePaused),
            ApiError::Conflict { .. }
        ));
        assert!(matches!(
            ApiError::from(QmsError::NotFound(3)),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            ApiError::from(QmsError::Unauthorized { required: "admin" }),
            ApiError::Forbidden { .. }
        ));
        assert!(matches!(
            ApiError::from(QmsError::EmptyReason),
            ApiError::BadRequest { .. }
        ));
    }

    #[test]
    fn test_concurrent_modification_carries_details() {
        let api_err = ApiError::from(QmsError::ConcurrentModification {
            expected: 4,
            found: 5,
        });
        match api_err {
            ApiError::Conflict { details, .. } => {
                let details = details.unwrap();
                assert_eq!(details["retryable"], true);
                assert_eq!(details["found_revision"], 5);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }
}
