//! Unified error handling for the admin panel.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::cloudinary::CloudinaryError;
use crate::firestore::FirestoreError;

/// Application-level error type for the admin panel.
///
/// Gateway failures are normally caught and absorbed at the route handler
/// that triggered them; this type covers the paths where a failure must
/// become an HTTP response instead (malformed requests, render failures).
#[derive(Debug, Error)]
pub enum AppError {
    /// Document database operation failed.
    #[error("Document store error: {0}")]
    Firestore(#[from] FirestoreError),

    /// Media host operation failed.
    #[error("Media host error: {0}")]
    Cloudinary(#[from] CloudinaryError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        Self::BadRequest(format!("invalid multipart body: {e}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server-side errors with Sentry
        if matches!(self, Self::Firestore(_) | Self::Cloudinary(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let status = match &self {
            Self::Firestore(_) | Self::Cloudinary(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose gateway error details to clients
        let message = match &self {
            Self::Firestore(_) | Self::Cloudinary(_) => "External service error".to_string(),
            Self::BadRequest(_) => self.to_string(),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Firestore(FirestoreError::NotFound(
                "users/x".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_gateway_errors_do_not_leak_detail() {
        let err = AppError::Cloudinary(CloudinaryError::Api {
            status: 400,
            message: "preset details".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
