use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use facematch::PipelineError;
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("No image part")]
    MissingFile,

    #[error("Invalid image format. Use JPEG or PNG.")]
    InvalidFormat,

    #[error("Could not decode the reference image.")]
    InvalidImage(#[source] image::ImageError),

    #[error("No face found in the reference image.")]
    NoFaceDetected,

    #[error("{0}")]
    BadRequest(String),

    #[error("Not found")]
    NotFound,

    #[error("Record store error: {0}")]
    Records(#[from] records::RecordsError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] embedding::EmbeddingError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// API error response body: `{"error": "<message>"}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::MissingFile
            | ServerError::InvalidFormat
            | ServerError::InvalidImage(_)
            | ServerError::NoFaceDetected
            | ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Records(_)
            | ServerError::Embedding(_)
            | ServerError::Internal(_)
            | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client. Server-side failures are logged in full and
    /// reported generically.
    fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }

        let body = Json(ErrorResponse {
            error: self.public_message(),
        });
        (status, body).into_response()
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NoFaceDetected => ServerError::NoFaceDetected,
            PipelineError::Embedding(err) => ServerError::Embedding(err),
            PipelineError::Records(records::RecordsError::InvalidGroupId(id)) => {
                ServerError::BadRequest(format!("Invalid group id '{id}'"))
            }
            PipelineError::Records(err) => ServerError::Records(err),
        }
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServerError::Internal(format!("worker task failed: {err}"))
    }
}
