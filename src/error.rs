use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::fetcher::FetchError;
use crate::models::ErrorBody;
use crate::renderer::RenderError;

/// Everything a request can fail with. The HTTP layer is the only place
/// these turn into status codes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{error}: {message}")]
    InvalidInput {
        error: &'static str,
        message: String,
    },

    #[error("Failed to fetch MJML: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to convert MJML: {0}")]
    Render(#[from] RenderError),

    /// Detail is logged, never sent to the caller.
    #[error("unhandled error: {0}")]
    Unhandled(String),
}

impl AppError {
    pub fn invalid_input(error: &'static str, message: impl Into<String>) -> Self {
        AppError::InvalidInput {
            error,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            AppError::Fetch(_) | AppError::Render(_) | AppError::Unhandled(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::InvalidInput { error, message } => ErrorBody::new(error, message),
            AppError::Unhandled(detail) => {
                error!(%detail, "Unhandled error");
                ErrorBody::new("Internal server error", "An unexpected error occurred")
            }
            failure => {
                let message = failure.to_string();
                error!(error = %message, "Conversion error");
                ErrorBody::new("Internal Server Error", message)
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;
    use std::time::Duration;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_input_is_bad_request() {
        let response =
            AppError::invalid_input("URL is required", "Please provide a URL").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"], "URL is required");
        assert_eq!(json["message"], "Please provide a URL");
    }

    #[tokio::test]
    async fn test_fetch_error_carries_upstream_message() {
        let err = AppError::from(FetchError::Timeout {
            url: "http://example.com/a.mjml".to_string(),
            timeout: Duration::from_secs(10),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal Server Error");
        let message = json["message"].as_str().unwrap();
        assert!(message.starts_with("Failed to fetch MJML: "));
        assert!(message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_unhandled_hides_detail() {
        let response = AppError::Unhandled("db password leaked".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
        assert!(!json["message"].as_str().unwrap().contains("password"));
    }
}
