//! Service-account credential loading and validation.
//!
//! Credentials are resolved once at startup and validated eagerly: a missing
//! field or a private key that does not parse as RSA PEM is a startup error,
//! never a first-request surprise.

use std::fs;
use std::path::Path;

use jsonwebtoken::EncodingKey;
use serde::Deserialize;

use crate::config::{FirestoreConfig, DEFAULT_TOKEN_URI};
use crate::error::CredentialsError;

/// The subset of a Google service-account key facematch needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

// Keep the key material out of logs.
impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Read a service-account JSON key file.
    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let raw = fs::read_to_string(path).map_err(|source| CredentialsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)?;
        key.validated()
    }

    /// Assemble a key from individually supplied fields.
    pub fn from_fields(cfg: &FirestoreConfig) -> Result<Self, CredentialsError> {
        let key = ServiceAccountKey {
            project_id: required(&cfg.project_id, "project_id")?,
            private_key_id: cfg.private_key_id.clone(),
            private_key: required(&cfg.private_key, "private_key")?,
            client_email: required(&cfg.client_email, "client_email")?,
            client_id: cfg.client_id.clone(),
            token_uri: cfg.token_uri.clone().unwrap_or_else(default_token_uri),
        };
        key.validated()
    }

    /// Parse the private key for RS256 signing.
    pub fn encoding_key(&self) -> Result<EncodingKey, CredentialsError> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| CredentialsError::InvalidKey(e.to_string()))
    }

    fn validated(mut self) -> Result<Self, CredentialsError> {
        // Env vars and some secret stores flatten newlines to a literal "\n".
        if self.private_key.contains("\\n") {
            self.private_key = self.private_key.replace("\\n", "\n");
        }
        for (name, value) in [
            ("project_id", &self.project_id),
            ("private_key", &self.private_key),
            ("client_email", &self.client_email),
            ("token_uri", &self.token_uri),
        ] {
            if value.trim().is_empty() {
                return Err(CredentialsError::MissingField(name));
            }
        }
        self.encoding_key()?;
        Ok(self)
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, CredentialsError> {
    value
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or(CredentialsError::MissingField(name))
}

/// Resolve credentials from `cfg`.
///
/// Returns `Ok(None)` only for emulator deployments without credentials.
pub fn resolve_credentials(cfg: &FirestoreConfig) -> Result<Option<ServiceAccountKey>, CredentialsError> {
    if let Some(path) = cfg.credentials_path.as_deref() {
        if cfg.has_inline_credentials() {
            return Err(CredentialsError::Ambiguous);
        }
        return ServiceAccountKey::from_file(path).map(Some);
    }
    if cfg.has_inline_credentials() {
        return ServiceAccountKey::from_fields(cfg).map(Some);
    }
    if cfg.emulator_host.is_some() {
        return Ok(None);
    }
    Err(CredentialsError::NotConfigured)
}
