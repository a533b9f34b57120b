//! Prometheus-backed metrics for the server and the match engine.
//!
//! Each [`ServerMetrics`] owns its own recorder; nothing is installed
//! globally, so independent server instances (and tests) never share counters.

use std::time::Duration;

use matcher::{CandidateOutcome, MatchMetrics};
use ::metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

pub const REQUESTS_TOTAL: &str = "facematch_requests_total";
pub const CANDIDATES_TOTAL: &str = "facematch_candidates_total";
pub const MATCH_SECONDS: &str = "facematch_match_seconds";

pub struct ServerMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl ServerMetrics {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let metrics = Self { recorder, handle };
        metrics.with_recorder(|| {
            describe_counter!(REQUESTS_TOTAL, "HTTP requests served, by route and status");
            describe_counter!(CANDIDATES_TOTAL, "Candidate photos processed, by outcome");
            describe_histogram!(MATCH_SECONDS, Unit::Seconds, "Time spent matching one group");
        });
        metrics
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn record_request(&self, method: &str, route: &str, status: u16) {
        let (method, route, status) = (method.to_string(), route.to_string(), status.to_string());
        self.with_recorder(|| {
            counter!(REQUESTS_TOTAL, "method" => method, "route" => route, "status" => status)
                .increment(1);
        });
    }

    fn with_recorder<T>(&self, f: impl FnOnce() -> T) -> T {
        ::metrics::with_local_recorder(&self.recorder, f)
    }
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchMetrics for ServerMetrics {
    fn record_candidate(&self, outcome: CandidateOutcome) {
        self.with_recorder(|| {
            counter!(CANDIDATES_TOTAL, "outcome" => outcome.as_str()).increment(1);
        });
    }

    fn record_match(&self, latency: Duration, candidates: usize, hits: usize) {
        tracing::debug!(candidates, hits, "recording match latency");
        self.with_recorder(|| {
            histogram!(MATCH_SECONDS).record(latency.as_secs_f64());
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = ServerMetrics::new();
        metrics.record_request("POST", "/api/match-images/", 200);
        metrics.record_candidate(CandidateOutcome::Matched);
        metrics.record_candidate(CandidateOutcome::Matched);
        metrics.record_candidate(CandidateOutcome::FetchFailed);
        metrics.record_match(Duration::from_millis(250), 3, 2);

        let text = metrics.render();
        assert!(text.contains("facematch_requests_total"), "{text}");
        assert!(text.contains(r#"facematch_candidates_total{outcome="matched"} 2"#), "{text}");
        assert!(text.contains(r#"facematch_candidates_total{outcome="fetch_failed"} 1"#), "{text}");
        assert!(text.contains("facematch_match_seconds"), "{text}");
    }

    #[test]
    fn instances_are_isolated() {
        let a = ServerMetrics::new();
        let b = ServerMetrics::new();
        a.record_candidate(CandidateOutcome::Skipped);
        assert!(!b.render().contains(r#"outcome="skipped""#));
    }
}
