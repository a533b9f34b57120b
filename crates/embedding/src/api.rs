use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use serde_json::Value;

use crate::{EmbeddingError, EncoderConfig, FaceEmbedding, FaceEncoder};

/// Face encoder backed by a remote HTTP service.
///
/// Each call POSTs the image as PNG (`Content-Type: image/png`) and expects
/// one of these response shapes:
///
/// - `{"embeddings": [[f32, ...], ...]}`
/// - `[[f32, ...], ...]`
///
/// An empty list means the service found no face.
pub struct HttpFaceEncoder {
    client: reqwest::Client,
    url: String,
    auth_header: Option<String>,
}

impl HttpFaceEncoder {
    pub fn from_config(cfg: &EncoderConfig) -> Result<Self, EmbeddingError> {
        let url = cfg
            .api_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| EmbeddingError::InvalidConfig("api_url is required for api mode".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.api_timeout_secs))
            .connect_timeout(Duration::from_secs(cfg.api_connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: url.to_string(),
            auth_header: cfg.api_auth_header.clone(),
        })
    }

    async fn send(&self, body: Vec<u8>) -> Result<Value, EmbeddingError> {
        let mut request = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/png");
        if let Some(header) = self.auth_header.as_deref() {
            request = request.header(reqwest::header::AUTHORIZATION, header);
        }

        let response = request.body(body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Status { status, body });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(format!("invalid JSON: {e}")))
    }
}

#[async_trait]
impl FaceEncoder for HttpFaceEncoder {
    async fn encode(&self, image: &RgbImage) -> Result<Vec<FaceEmbedding>, EmbeddingError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let value = self.send(png).await?;
        let faces = parse_embeddings(value)?;
        tracing::debug!(
            faces = faces.len(),
            width = image.width(),
            height = image.height(),
            "encoder service answered"
        );
        Ok(faces)
    }

    fn name(&self) -> &'static str {
        "api"
    }
}

pub(crate) fn parse_embeddings(value: Value) -> Result<Vec<FaceEmbedding>, EmbeddingError> {
    let collection = match value {
        Value::Object(mut map) => map.remove("embeddings").ok_or_else(|| {
            EmbeddingError::InvalidResponse("missing `embeddings` field".into())
        })?,
        other => other,
    };

    let vectors = match collection {
        Value::Array(items) if items.iter().all(|item| matches!(item, Value::Array(_))) => items
            .into_iter()
            .map(parse_vector)
            .collect::<Result<Vec<_>, _>>()?,
        // A flat numeric array is a single face.
        Value::Array(items) => vec![parse_vector(Value::Array(items))?],
        Value::Null => Vec::new(),
        _ => {
            return Err(EmbeddingError::InvalidResponse(
                "embeddings must be an array".into(),
            ))
        }
    };

    if let Some(first) = vectors.first() {
        let dim = first.len();
        if dim == 0 {
            return Err(EmbeddingError::InvalidResponse("empty embedding".into()));
        }
        if vectors.iter().any(|v| v.len() != dim) {
            return Err(EmbeddingError::InvalidResponse(
                "embeddings have inconsistent dimensions".into(),
            ));
        }
    }

    Ok(vectors.into_iter().map(FaceEmbedding::new).collect())
}

fn parse_vector(value: Value) -> Result<Vec<f32>, EmbeddingError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| {
                entry
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| EmbeddingError::InvalidResponse("non-numeric embedding value".into()))
            })
            .collect(),
        _ => Err(EmbeddingError::InvalidResponse(
            "embedding must be an array of numbers".into(),
        )),
    }
}
