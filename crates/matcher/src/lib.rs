//! # Face matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` takes a reference [`FaceEmbedding`](embedding::FaceEmbedding) and a
//! list of candidate photo URLs and returns the URLs whose image contains a
//! face within tolerance of the reference. It owns the batching policy, the
//! candidate download path, and the per-candidate error policy.
//!
//! ## Core Types
//!
//! - [`MatchConfig`]: batch size (default 5) and tolerance (default 0.6).
//! - [`MatchEngine`]: batched fetch-then-compare loop over candidate URLs.
//! - [`ImageFetcher`] / [`HttpImageFetcher`]: turns a URL into an RGB image.
//! - [`MatchMetrics`]: optional observer handed to the engine at construction.
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use embedding::ThumbnailEncoder;
//! use matcher::{FetchConfig, HttpImageFetcher, MatchConfig, MatchEngine};
//!
//! # async fn run(reference: embedding::FaceEmbedding) -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpImageFetcher::new(&FetchConfig::default())?;
//! let engine = MatchEngine::new(Arc::new(ThumbnailEncoder::new()), Arc::new(fetcher));
//!
//! let urls = vec![Some("https://example.com/a.jpg".to_string()), None];
//! let hits = engine.find_matches(&reference, &urls, &MatchConfig::default()).await;
//! println!("{hits:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error policy
//!
//! A candidate that cannot be fetched, decoded or encoded is logged at `warn`
//! and treated as "no match"; `find_matches` itself never fails.

mod config;
mod engine;
mod fetch;
mod metrics;

pub use crate::config::{MatchConfig, DEFAULT_BATCH_SIZE, DEFAULT_TOLERANCE};
pub use crate::engine::MatchEngine;
pub use crate::fetch::{decode_rgb, FetchConfig, FetchError, HttpImageFetcher, ImageFetcher};
pub use crate::metrics::{CandidateOutcome, MatchMetrics};
