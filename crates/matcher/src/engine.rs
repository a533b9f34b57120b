use std::sync::Arc;
use std::time::Instant;

use embedding::{FaceEmbedding, FaceEncoder};
use image::RgbImage;

use crate::config::MatchConfig;
use crate::fetch::ImageFetcher;
use crate::metrics::{CandidateOutcome, MatchMetrics};


/// Batched comparison of candidate images against one reference face.
///
/// The engine is cheap to share behind an `Arc`: it holds no per-request
/// state, only handles to the encoder, the fetcher and an optional metrics
/// observer.
pub struct MatchEngine {
    encoder: Arc<dyn FaceEncoder>,
    fetcher: Arc<dyn ImageFetcher>,
    metrics: Option<Arc<dyn MatchMetrics>>,
}

impl MatchEngine {
    pub fn new(encoder: Arc<dyn FaceEncoder>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            encoder,
            fetcher,
            metrics: None,
        }
    }

    /// Attach a metrics observer.
    pub fn with_metrics(mut self, metrics: Arc<dyn MatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn encoder(&self) -> &Arc<dyn FaceEncoder> {
        &self.encoder
    }

    /// URLs whose image contains a face within `cfg.tolerance` of `reference`.
    ///
    /// Candidates are processed in contiguous batches of `cfg.batch_size`:
    /// every image of a batch is fetched first, then each is encoded and
    /// compared. Results keep input order. `None` entries, unreachable or
    /// undecodable images, and encoder failures count as "no match" and never
    /// abort the run. An image with several matching faces is reported once.
    pub async fn find_matches(
        &self,
        reference: &FaceEmbedding,
        urls: &[Option<String>],
        cfg: &MatchConfig,
    ) -> Vec<String> {
        let start = Instant::now();
        let batch_size = cfg.effective_batch_size();
        let mut matches = Vec::new();

        for (batch_idx, batch) in urls.chunks(batch_size).enumerate() {
            let images = self.fetch_batch(batch).await;
            tracing::debug!(
                batch = batch_idx,
                requested = batch.len(),
                decoded = images.len(),
                "batch fetched"
            );

            for (url, image) in images {
                let outcome = self.compare_image(reference, url, &image, cfg.tolerance).await;
                if outcome == CandidateOutcome::Matched {
                    matches.push(url.to_string());
                }
                self.record(outcome);
            }
        }

        let latency = start.elapsed();
        tracing::info!(
            candidates = urls.len(),
            matches = matches.len(),
            batch_size,
            tolerance = cfg.tolerance,
            elapsed_ms = latency.as_millis() as u64,
            "match run complete"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_match(latency, urls.len(), matches.len());
        }

        matches
    }

    async fn fetch_batch<'a>(&self, batch: &'a [Option<String>]) -> Vec<(&'a str, RgbImage)> {
        let mut images = Vec::with_capacity(batch.len());
        for entry in batch {
            let Some(url) = entry.as_deref() else {
                tracing::debug!("skipping record without photo URL");
                self.record(CandidateOutcome::Skipped);
                continue;
            };
            match self.fetcher.fetch(url).await {
                Ok(image) => images.push((url, image)),
                Err(err) => {
                    tracing::warn!(url, error = %err, "candidate fetch failed, skipping");
                    self.record(CandidateOutcome::FetchFailed);
                }
            }
        }
        images
    }

    async fn compare_image(
        &self,
        reference: &FaceEmbedding,
        url: &str,
        image: &RgbImage,
        tolerance: f32,
    ) -> CandidateOutcome {
        match self.encoder.encode(image).await {
            Ok(faces) => {
                // `any` stops at the first matching face.
                if faces
                    .iter()
                    .any(|face| self.encoder.compare(reference, face, tolerance))
                {
                    CandidateOutcome::Matched
                } else {
                    CandidateOutcome::NoMatch
                }
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "encoding candidate failed, skipping");
                CandidateOutcome::EncodeFailed
            }
        }
    }

    fn record(&self, outcome: CandidateOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_candidate(outcome);
        }
    }
}
