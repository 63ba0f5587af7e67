use axum::{
    extract::rejection::JsonRejection,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use finqa_core::{IngestError, StoreError};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP clients as `{"detail": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),

    /// A request rejected with a status other than 400, e.g. an upload over
    /// the body limit.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rejected { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::NotPdf(_) => ApiError::Validation("File must be a PDF".to_string()),
            other => ApiError::Internal(format!("Error processing PDF: {other}")),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        ApiError::Internal(error.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        let status = error.status();
        let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "File exceeds the maximum upload size".to_string()
        } else {
            format!("invalid multipart body: {}", error.body_text())
        };
        ApiError::Rejected { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_pdf_is_a_client_error() {
        let error = ApiError::from(IngestError::NotPdf("notes.txt".to_string()));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "File must be a PDF");
    }

    #[test]
    fn rejections_keep_their_status() {
        let error = ApiError::Rejected {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "File exceeds the maximum upload size".to_string(),
        };
        assert_eq!(error.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(error.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn store_failures_are_server_errors() {
        let error = ApiError::from(StoreError::Request("qdrant unreachable".to_string()));
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
