//! Workspace umbrella crate for facematch.
//!
//! This crate stitches the embedding provider, the record source and the
//! match engine together so callers can go from "reference image + group id"
//! to "matching photo URLs" with a single API entry point.

pub use embedding::{
    build_encoder, face_distance, EmbeddingError, EncoderConfig, FaceEmbedding, FaceEncoder,
    ThumbnailEncoder, DEFAULT_TOLERANCE,
};
pub use matcher::{
    decode_rgb, CandidateOutcome, FetchConfig, FetchError, HttpImageFetcher, ImageFetcher,
    MatchConfig, MatchEngine, MatchMetrics, DEFAULT_BATCH_SIZE,
};
pub use records::{
    FirestoreClient, FirestoreConfig, RecordSource, RecordsError, StaticRecordSource,
};

use std::sync::Arc;

use image::RgbImage;
use thiserror::Error;

/// Errors that can occur while matching a reference image against a group.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no face found in the reference image")]
    NoFaceDetected,
    #[error("embedding failure: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("record lookup failure: {0}")]
    Records(#[from] RecordsError),
}

/// Reference embedding, record lookup and batched comparison, in that order.
///
/// The reference face is always computed before the record source is touched,
/// so an image without a face never costs a store round-trip.
pub struct MatchPipeline {
    engine: MatchEngine,
    records: Arc<dyn RecordSource>,
    config: MatchConfig,
}

impl MatchPipeline {
    pub fn new(engine: MatchEngine, records: Arc<dyn RecordSource>, config: MatchConfig) -> Self {
        Self {
            engine,
            records,
            config,
        }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// First face found in `image`. When several faces are present the
    /// encoder's first one is used.
    pub async fn reference_embedding(
        &self,
        image: &RgbImage,
    ) -> Result<FaceEmbedding, PipelineError> {
        let faces = self.engine.encoder().encode(image).await?;
        let count = faces.len();
        let reference = faces
            .into_iter()
            .next()
            .ok_or(PipelineError::NoFaceDetected)?;
        if count > 1 {
            tracing::debug!(faces = count, "reference image has several faces, using the first");
        }
        Ok(reference)
    }

    /// URLs in `group_id` whose picture shows the same person as `reference`.
    pub async fn match_reference(
        &self,
        reference: &FaceEmbedding,
        group_id: &str,
    ) -> Result<Vec<String>, PipelineError> {
        let urls = self.records.list_photo_urls(group_id).await?;
        tracing::debug!(group_id, candidates = urls.len(), "group records loaded");
        Ok(self.engine.find_matches(reference, &urls, &self.config).await)
    }

    /// Full pipeline: encode the reference image, then match it against `group_id`.
    pub async fn match_group(
        &self,
        image: &RgbImage,
        group_id: &str,
    ) -> Result<Vec<String>, PipelineError> {
        let reference = self.reference_embedding(image).await?;
        self.match_reference(&reference, group_id).await
    }
}
