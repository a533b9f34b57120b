use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default production REST endpoint.
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com";

/// Default OAuth2 token endpoint for service accounts.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Connection settings for the Firestore record source.
///
/// Credentials come from exactly one place:
///
/// - [`credentials_path`](Self::credentials_path): a service-account JSON key file, or
/// - the decomposed fields (`project_id`, `private_key_id`, `private_key`,
///   `client_email`, `client_id`, `token_uri`), handy when secrets are
///   injected one env var at a time.
///
/// When [`emulator_host`](Self::emulator_host) is set only `project_id` is needed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FirestoreConfig {
    pub credentials_path: Option<PathBuf>,
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    /// PEM-encoded RSA key. Literal `\n` sequences are unescaped on load.
    pub private_key: Option<String>,
    pub client_email: Option<String>,
    pub client_id: Option<String>,
    pub token_uri: Option<String>,
    /// `host:port` of a Firestore emulator; disables credential exchange.
    pub emulator_host: Option<String>,
    /// REST endpoint, overridable for tests and private deployments.
    pub base_url: String,
    /// Documents requested per page while listing a collection.
    pub page_size: u32,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            project_id: None,
            private_key_id: None,
            private_key: None,
            client_email: None,
            client_id: None,
            token_uri: None,
            emulator_host: None,
            base_url: DEFAULT_FIRESTORE_URL.into(),
            page_size: 300,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl FirestoreConfig {
    /// `true` if any decomposed credential field was supplied.
    pub fn has_inline_credentials(&self) -> bool {
        self.private_key.is_some() || self.client_email.is_some() || self.private_key_id.is_some()
    }
}
