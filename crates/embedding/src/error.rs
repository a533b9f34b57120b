use thiserror::Error;

/// Errors surfaced by face encoders.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Encoder configuration is inconsistent (e.g. api mode without a URL).
    #[error("invalid encoder config: {0}")]
    InvalidConfig(String),
    /// The encoder service could not be reached.
    #[error("encoder request failed: {0}")]
    Request(String),
    /// The encoder service answered with a non-success status.
    #[error("encoder returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The encoder service answered with something we cannot read as embeddings.
    #[error("invalid encoder response: {0}")]
    InvalidResponse(String),
    /// Re-encoding the image for transport failed.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        EmbeddingError::Request(err.to_string())
    }
}
