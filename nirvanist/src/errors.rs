use crate::db::errors::DbError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Malformed input, rejected before reaching business logic
    #[error("{message}")]
    Validation { message: String },

    /// Duplicate registration
    #[error("{message}")]
    AlreadyExists { message: String },

    /// Unknown email or wrong password (deliberately indistinguishable)
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Password matched but the account has not confirmed its email yet
    #[error("Email not verified")]
    EmailNotVerified,

    /// Opaque token did not match a stored value
    #[error("{message}")]
    InvalidToken { message: String },

    /// Reset token missing, consumed or past its expiry (deliberately indistinguishable)
    #[error("Invalid or expired reset token")]
    InvalidOrExpiredToken,

    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Session token present but rejected
    #[error("Invalid or expired token")]
    InvalidSession,

    /// Action not permitted by configuration
    #[error("{message}")]
    Forbidden { message: String },

    /// CAPTCHA verdict was negative (or unavailable with fail-open off)
    #[error("CAPTCHA verification failed")]
    CaptchaFailed,

    /// Requested resource not found
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// A third-party collaborator is not configured or unreachable
    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable {
        service: &'static str,
        reason: String,
        /// Client-facing message
        message: &'static str,
    },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Store operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body returned for every error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. }
            | Error::AlreadyExists { .. }
            | Error::InvalidToken { .. }
            | Error::InvalidOrExpiredToken
            | Error::CaptchaFailed => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::EmailNotVerified | Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InvalidSession | Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Database(DbError::NotFound) => StatusCode::NOT_FOUND,
            Error::Database(DbError::UniqueViolation { .. }) => StatusCode::BAD_REQUEST,
            Error::ServiceUnavailable { .. } | Error::Internal { .. } | Error::Database(DbError::Other(_)) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } | Error::AlreadyExists { message } | Error::InvalidToken { message } => message.clone(),
            Error::InvalidCredentials => "Invalid email or password".to_string(),
            Error::EmailNotVerified => "Please verify your email before logging in".to_string(),
            Error::InvalidOrExpiredToken => "Invalid or expired reset token".to_string(),
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Access token required".to_string()),
            Error::InvalidSession => "Invalid or expired token".to_string(),
            Error::Forbidden { message } => message.clone(),
            Error::CaptchaFailed => "CAPTCHA verification failed".to_string(),
            Error::NotFound { resource } => format!("{resource} not found"),
            Error::ServiceUnavailable { message, .. } => message.to_string(),
            Error::Database(DbError::NotFound) => "Resource not found".to_string(),
            Error::Database(DbError::UniqueViolation { .. }) => "Resource already exists".to_string(),
            Error::Internal { .. } | Error::Database(DbError::Other(_)) | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::ServiceUnavailable { .. } => {
                tracing::error!("Collaborator unavailable: {}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::InvalidCredentials
            | Error::EmailNotVerified
            | Error::Unauthenticated { .. }
            | Error::InvalidSession
            | Error::Forbidden { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::Validation { .. }
            | Error::AlreadyExists { .. }
            | Error::InvalidToken { .. }
            | Error::InvalidOrExpiredToken
            | Error::CaptchaFailed
            | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = ErrorBody {
            message: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_and_token_errors_are_uniform() {
        assert_eq!(Error::InvalidCredentials.user_message(), "Invalid email or password");
        assert_eq!(Error::InvalidOrExpiredToken.user_message(), "Invalid or expired reset token");
        assert_eq!(Error::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::InvalidOrExpiredToken.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = Error::Other(anyhow::anyhow!("connection refused to 10.0.0.3:5432"));
        assert_eq!(err.user_message(), "Internal server error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = Error::ServiceUnavailable {
            service: "email",
            reason: "RESEND_API_KEY not set".to_string(),
            message: "Server configuration error",
        };
        assert_eq!(err.user_message(), "Server configuration error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_session_errors() {
        assert_eq!(Error::Unauthenticated { message: None }.user_message(), "Access token required");
        assert_eq!(Error::Unauthenticated { message: None }.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::InvalidSession.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_response_body_is_json_message() {
        let response = Error::validation("Valid email is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.message, "Valid email is required");
    }
}
