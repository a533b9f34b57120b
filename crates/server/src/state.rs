use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::metrics::ServerMetrics;
use embedding::FaceEncoder;
use facematch::MatchPipeline;
use matcher::{HttpImageFetcher, ImageFetcher, MatchEngine};
use records::{FirestoreClient, RecordSource};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Encoder, record source and match engine, wired once at startup
    pub pipeline: Arc<MatchPipeline>,

    /// Prometheus recorder shared by the router and the match engine
    pub metrics: Arc<ServerMetrics>,
}

impl ServerState {
    /// Build the production collaborators described by `config`: the face
    /// encoder, the Firestore client and the HTTP image fetcher.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let encoder = embedding::build_encoder(&config.encoder)?;
        let records: Arc<dyn RecordSource> = Arc::new(FirestoreClient::from_config(&config.firebase)?);
        let fetcher = HttpImageFetcher::new(&config.fetch_config())
            .map_err(|err| ServerError::Config(format!("image fetcher: {err}")))?;

        tracing::info!(encoder = encoder.name(), "collaborators initialised");
        Self::from_parts(config, encoder, records, Arc::new(fetcher))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: ServerConfig,
        encoder: Arc<dyn FaceEncoder>,
        records: Arc<dyn RecordSource>,
        fetcher: Arc<dyn ImageFetcher>,
    ) -> ServerResult<Self> {
        if let Some(dir) = config.upload_dir() {
            std::fs::create_dir_all(dir).map_err(|err| {
                ServerError::Config(format!("cannot create upload dir {}: {err}", dir.display()))
            })?;
        }

        let metrics = Arc::new(ServerMetrics::new());
        let engine = MatchEngine::new(encoder, fetcher).with_metrics(metrics.clone());
        let pipeline = MatchPipeline::new(engine, records, config.match_config());

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            metrics,
        })
    }
}
