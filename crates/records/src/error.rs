use std::io;
use thiserror::Error;

/// Problems with service-account credentials. All of these are startup errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("no Firestore credentials configured (set a key file path or the individual key fields)")]
    NotConfigured,
    #[error("both a credential file and individual credential fields were supplied")]
    Ambiguous,
    #[error("failed to read credential file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse credential file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("credential field `{0}` is missing or empty")]
    MissingField(&'static str),
    #[error("private key is not a valid RSA PEM: {0}")]
    InvalidKey(String),
}

/// Errors surfaced while listing photo records.
#[derive(Debug, Error)]
pub enum RecordsError {
    /// Group ids are single path segments.
    #[error("invalid group id: {0:?}")]
    InvalidGroupId(String),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    /// Exchanging the service-account assertion for an access token failed.
    #[error("token exchange failed: {0}")]
    Auth(String),
    #[error("invalid document store URL: {0}")]
    InvalidEndpoint(String),
    #[error("document store request failed: {0}")]
    Request(String),
    #[error("document store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid document store response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for RecordsError {
    fn from(err: reqwest::Error) -> Self {
        RecordsError::Request(err.to_string())
    }
}
