// Metrics hooks for the match engine.
//
// The engine is handed an optional `MatchMetrics` observer at construction and
// reports every candidate outcome plus one summary per `find_matches` call.
// This keeps instrumentation decoupled from any specific metrics backend.
use std::time::Duration;

/// What happened to a single candidate URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateOutcome {
    /// At least one face matched the reference.
    Matched,
    /// The image was processed but no face matched.
    NoMatch,
    /// The record had no URL.
    Skipped,
    /// Download or decode failed.
    FetchFailed,
    /// The encoder failed on this image.
    EncodeFailed,
}

impl CandidateOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CandidateOutcome::Matched => "matched",
            CandidateOutcome::NoMatch => "no_match",
            CandidateOutcome::Skipped => "skipped",
            CandidateOutcome::FetchFailed => "fetch_failed",
            CandidateOutcome::EncodeFailed => "encode_failed",
        }
    }
}

/// Metrics observer for match operations.
pub trait MatchMetrics: Send + Sync {
    /// Called once per candidate entry, including `None` entries.
    fn record_candidate(&self, outcome: CandidateOutcome);

    /// Called once per `find_matches` with the wall-clock latency, the number
    /// of candidate entries, and the number of matches returned.
    fn record_match(&self, latency: Duration, candidates: usize, hits: usize);
}
