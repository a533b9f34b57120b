//! facematch server - HTTP API for face matching over photo groups
//!
//! Upload a reference photo, get back the URLs of every photo in a group that
//! shows the same person. The group's photos are listed from Cloud Firestore
//! (`groups/{group_id}/photos`, field `photoURL`), downloaded in batches and
//! compared with the reference face.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     dotenvy::dotenv().ok();
//!     let config = ServerConfig::load()?;
//!     server::run(config)
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - greeting
//! - `GET /api/test` - smoke test
//! - `POST /api/match-images/` - multipart `reference_image` (+ optional `group_id`)
//! - `GET /health` - liveness probe
//! - `GET /metrics` - Prometheus metrics
//!
//! Errors are returned as `{"error": "<message>"}`.

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, run, start_server};
pub use state::ServerState;
