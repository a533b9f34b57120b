use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::credentials::ServiceAccountKey;
use crate::error::{CredentialsError, RecordsError};

pub(crate) const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before they actually expire.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// OAuth2 JWT-bearer flow for a service account, with a single cached token.
pub(crate) struct TokenProvider {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    client: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, client: reqwest::Client) -> Result<Self, CredentialsError> {
        let encoding_key = key.encoding_key()?;
        Ok(Self {
            key,
            encoding_key,
            client,
            cached: Mutex::new(None),
        })
    }

    /// A valid access token, exchanging a fresh assertion when needed.
    pub async fn access_token(&self) -> Result<String, RecordsError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(token.token.clone());
            }
        }

        let fresh = self.exchange(now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    pub(crate) fn assertion(&self, now: DateTime<Utc>) -> Result<String, RecordsError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: self.key.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: self.key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| RecordsError::Auth(format!("failed to sign assertion: {e}")))
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, RecordsError> {
        let assertion = self.assertion(now)?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| RecordsError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RecordsError::Auth(format!("HTTP {status}: {body}")));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| RecordsError::Auth(format!("invalid token response: {e}")))?;
        let lifetime = body.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        let expires_at = Duration::try_seconds(lifetime)
            .filter(|_| lifetime >= 0)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| RecordsError::Auth(format!("token lifetime out of range: {lifetime}")))?;

        tracing::debug!(
            client_email = %self.key.client_email,
            expires_in = lifetime,
            "obtained Firestore access token"
        );

        Ok(CachedToken {
            token: body.access_token,
            expires_at,
        })
    }
}
