use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::FirestoreConfig;
use crate::credentials::resolve_credentials;
use crate::error::{CredentialsError, RecordsError};
use crate::token::TokenProvider;
use crate::{photos_path, RecordSource, PHOTO_URL_FIELD};

/// Token the Firestore emulator accepts as an all-access bearer.
const EMULATOR_TOKEN: &str = "owner";

/// One Firestore document as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Value of a string field, `None` if absent or not a string.
    pub fn string_field(&self, field: &str) -> Option<String> {
        self.fields
            .get(field)
            .and_then(|v| v.get("stringValue"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

enum Auth {
    Emulator,
    ServiceAccount(TokenProvider),
}

/// Read-only Cloud Firestore client over the v1 REST API.
///
/// Built once at startup and shared; it owns its HTTP connection pool and
/// the cached access token.
pub struct FirestoreClient {
    client: reqwest::Client,
    documents_url: Url,
    page_size: u32,
    auth: Auth,
}

impl FirestoreClient {
    /// Resolve credentials and build the client. Fails fast on bad credentials.
    pub fn from_config(cfg: &FirestoreConfig) -> Result<Self, RecordsError> {
        let credentials = resolve_credentials(cfg)?;

        let project_id = credentials
            .as_ref()
            .map(|key| key.project_id.clone())
            .or_else(|| cfg.project_id.clone())
            .filter(|p| !p.trim().is_empty())
            .ok_or(CredentialsError::MissingField("project_id"))?;

        let base = match cfg.emulator_host.as_deref() {
            Some(host) => format!("http://{}", host.trim_end_matches('/')),
            None => cfg.base_url.trim_end_matches('/').to_string(),
        };

        let documents_url =
            Url::parse(&format!("{base}/v1/projects/{project_id}/databases/(default)/documents"))
                .map_err(|e| RecordsError::InvalidEndpoint(format!("{base}: {e}")))?;
        if documents_url.cannot_be_a_base() {
            return Err(RecordsError::InvalidEndpoint(base));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .build()?;

        let auth = match (cfg.emulator_host.is_some(), credentials) {
            (false, Some(key)) => Auth::ServiceAccount(TokenProvider::new(key, client.clone())?),
            _ => Auth::Emulator,
        };

        tracing::info!(
            project_id = %project_id,
            emulator = matches!(auth, Auth::Emulator),
            "Firestore client ready"
        );

        Ok(Self {
            client,
            documents_url,
            page_size: cfg.page_size.max(1),
            auth,
        })
    }

    async fn bearer(&self) -> Result<String, RecordsError> {
        match &self.auth {
            Auth::Emulator => Ok(EMULATOR_TOKEN.to_string()),
            Auth::ServiceAccount(tokens) => tokens.access_token().await,
        }
    }

    /// URL of `collection_path` under the documents root. Each `/`-separated
    /// segment is percent-encoded, so `?`, `#` and `%` stay inside the path.
    fn collection_url(&self, collection_path: &str) -> Result<Url, RecordsError> {
        let mut url = self.documents_url.clone();
        url.path_segments_mut()
            .map_err(|()| RecordsError::InvalidEndpoint(self.documents_url.to_string()))?
            .pop_if_empty()
            .extend(collection_path.split('/'));
        Ok(url)
    }

    /// Every document directly under `collection_path`, in store order.
    pub async fn list_documents(&self, collection_path: &str) -> Result<Vec<Document>, RecordsError> {
        let url = self.collection_url(collection_path)?;
        let page_size = self.page_size.to_string();
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let token = self.bearer().await?;
            let mut query: Vec<(&str, &str)> = vec![("pageSize", page_size.as_str())];
            if let Some(t) = page_token.as_deref() {
                query.push(("pageToken", t));
            }

            let response = self
                .client
                .get(url.clone())
                .bearer_auth(token)
                .query(&query)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                return Err(RecordsError::Status { status, body });
            }

            let page: ListDocumentsResponse = response
                .json()
                .await
                .map_err(|e| RecordsError::InvalidResponse(e.to_string()))?;
            documents.extend(page.documents);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(collection = collection_path, count = documents.len(), "listed documents");
        Ok(documents)
    }
}

#[async_trait]
impl RecordSource for FirestoreClient {
    async fn list_photo_urls(&self, group_id: &str) -> Result<Vec<Option<String>>, RecordsError> {
        let path = photos_path(group_id)?;
        let documents = self.list_documents(&path).await?;
        Ok(documents
            .iter()
            .map(|doc| doc.string_field(PHOTO_URL_FIELD))
            .collect())
    }
}
