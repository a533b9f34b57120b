//! Face embeddings for facematch
//!
//! This crate turns decoded RGB images into zero or more face embeddings and
//! decides whether two embeddings belong to the same person. Everything else
//! in facematch treats it as an opaque capability behind [`FaceEncoder`].
//!
//! Two backends ship with the crate:
//!
//! - **API mode** - POST the image to a face-encoding service and read back
//!   one vector per detected face. This is what production runs.
//! - **Stub mode** - A deterministic thumbnail encoder. No model, no network.
//!   Identical (or near-identical) pictures land close together, a flat image
//!   has "no face". Handy for local development and tests.
//!
//! Comparison is Euclidean distance against a tolerance: `distance <= tolerance`
//! means same person. Lower tolerance is stricter, 0.6 is the usual default.
//!
//! ## Quick example
//!
//! ```no_run
//! use embedding::{build_encoder, EncoderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), embedding::EmbeddingError> {
//!     let cfg = EncoderConfig {
//!         mode: "api".into(),
//!         api_url: Some("http://localhost:9000/encode".into()),
//!         ..Default::default()
//!     };
//!     let encoder = build_encoder(&cfg)?;
//!
//!     let img = image::RgbImage::new(64, 64);
//!     let faces = encoder.encode(&img).await?;
//!     println!("{} face(s)", faces.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod api;
mod stub;

use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;

pub use crate::api::HttpFaceEncoder;
pub use crate::config::EncoderConfig;
pub use crate::error::EmbeddingError;
pub use crate::stub::ThumbnailEncoder;
pub use crate::types::{face_distance, FaceEmbedding};

/// Tolerance used when callers do not pick one.
pub const DEFAULT_TOLERANCE: f32 = 0.6;

/// Produces face embeddings from decoded images.
#[async_trait]
pub trait FaceEncoder: Send + Sync {
    /// Extract one embedding per detected face. An image without faces yields
    /// an empty vector, not an error.
    async fn encode(&self, image: &RgbImage) -> Result<Vec<FaceEmbedding>, EmbeddingError>;

    /// `true` when `candidate` lies within `tolerance` of `reference`.
    fn compare(&self, reference: &FaceEmbedding, candidate: &FaceEmbedding, tolerance: f32) -> bool {
        face_distance(reference, candidate) <= tolerance
    }

    /// Short backend label for logs.
    fn name(&self) -> &'static str;
}

/// Build the encoder selected by `cfg.mode`.
///
/// `"api"` requires [`EncoderConfig::api_url`]; `"stub"` needs nothing.
pub fn build_encoder(cfg: &EncoderConfig) -> Result<Arc<dyn FaceEncoder>, EmbeddingError> {
    match cfg.mode.as_str() {
        "api" => Ok(Arc::new(HttpFaceEncoder::from_config(cfg)?)),
        "stub" => Ok(Arc::new(ThumbnailEncoder::new())),
        other => Err(EmbeddingError::InvalidConfig(format!(
            "unknown encoder mode '{other}' (expected 'api' or 'stub')"
        ))),
    }
}
