use serde::{Deserialize, Serialize};

/// Selects and tunes the face-encoding backend.
///
/// # Example
/// ```
/// use embedding::EncoderConfig;
///
/// let cfg = EncoderConfig {
///     mode: "api".into(),
///     api_url: Some("http://faces.internal:9000/encode".into()),
///     api_auth_header: Some("Bearer s3cr3t".into()),
///     ..Default::default()
/// };
/// assert_eq!(cfg.api_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EncoderConfig {
    /// `"api"` (remote encoder service) or `"stub"` (deterministic thumbnail encoder).
    pub mode: String,
    /// Encoder endpoint when [`mode`](Self::mode) is `"api"`.
    pub api_url: Option<String>,
    /// Sent verbatim as the `Authorization` header (e.g. `"Bearer xyz"`).
    pub api_auth_header: Option<String>,
    /// Whole-request timeout for one encode call.
    pub api_timeout_secs: u64,
    /// TCP connect timeout.
    pub api_connect_timeout_secs: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            mode: "api".into(),
            api_url: None,
            api_auth_header: None,
            api_timeout_secs: 30,
            api_connect_timeout_secs: 10,
        }
    }
}
