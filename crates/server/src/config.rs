use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use embedding::EncoderConfig;
use matcher::{FetchConfig, MatchConfig, DEFAULT_BATCH_SIZE, DEFAULT_TOLERANCE};
use records::FirestoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Address bound in production mode, whatever `bind_addr`/`port` say.
pub const PRODUCTION_ADDR: &str = "0.0.0.0:8000";

/// Runtime worker threads in production mode.
pub const PRODUCTION_WORKERS: usize = 4;

/// Secret used when none is configured.
pub const DEFAULT_SECRET_KEY: &str = "defaultsecretkey";

/// Group matched when a request does not name one.
pub const DEFAULT_GROUP_ID: &str = "uLFXzY5qXGg23xmFoacq";

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Opaque application secret
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// Production process mode: fixed bind address, 4 workers, JSON logs
    #[serde(default)]
    pub production: bool,

    /// Server bind address (development mode)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port (development mode)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Scratch directory for uploaded reference images; empty disables spooling
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Group used when the request carries no `group_id`
    #[serde(default = "default_group_id")]
    pub default_group_id: String,

    /// Candidates fetched per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Maximum embedding distance counted as a match
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Log filter; defaults to `debug` in development and `info` in production
    #[serde(default)]
    pub log_level: Option<String>,

    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Candidate image download timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Candidate image connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Record store connection
    #[serde(default)]
    pub firebase: FirestoreConfig,

    /// Face encoder backend
    #[serde(default)]
    pub encoder: EncoderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            production: false,
            bind_addr: default_bind_addr(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            default_group_id: default_group_id(),
            batch_size: default_batch_size(),
            tolerance: default_tolerance(),
            log_level: None,
            timeout_secs: default_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            firebase: FirestoreConfig::default(),
            encoder: EncoderConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `facematch.{toml,yaml,json}` file and
    /// `FACEMATCH_*` environment variables (`__` separates nested keys, e.g.
    /// `FACEMATCH_FIREBASE__CREDENTIALS_PATH`).
    ///
    /// The unprefixed `SECRET_KEY` and `FIREBASE_ADMIN_KEY_PATH` variables are
    /// honoured as fallbacks. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn load() -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(secret) = std::env::var("SECRET_KEY") {
            builder = builder.set_default("secret_key", secret)?;
        }
        if let Ok(path) = std::env::var("FIREBASE_ADMIN_KEY_PATH") {
            builder = builder.set_default("firebase.credentials_path", path)?;
        }

        let config: ServerConfig = builder
            // Load from file if exists
            .add_source(config::File::with_name("facematch").required(false))
            // Override with environment variables
            .add_source(
                config::Environment::with_prefix("FACEMATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later, at request time.
    pub fn validate(&self) -> ServerResult<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ServerError::Config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.batch_size == 0 {
            return Err(ServerError::Config("batch_size must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ServerError::Config("timeout_secs must be at least 1".into()));
        }
        records::photos_path(&self.default_group_id).map_err(|_| {
            ServerError::Config(format!(
                "default_group_id '{}' is not a valid group id",
                self.default_group_id
            ))
        })?;
        if !self.production {
            self.socket_addr()?;
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> ServerResult<SocketAddr> {
        let addr_str = if self.production {
            PRODUCTION_ADDR.to_string()
        } else {
            format!("{}:{}", self.bind_addr, self.port)
        };
        addr_str
            .parse()
            .map_err(|err| ServerError::Config(format!("invalid bind address '{addr_str}': {err}")))
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Scratch directory, or `None` when spooling is disabled.
    pub fn upload_dir(&self) -> Option<&Path> {
        let dir = self.upload_dir.trim();
        (!dir.is_empty()).then(|| Path::new(dir))
    }

    pub fn log_level(&self) -> &str {
        match &self.log_level {
            Some(level) => level,
            None if self.production => "info",
            None => "debug",
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            batch_size: self.batch_size,
            tolerance: self.tolerance,
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout_secs: self.fetch_timeout_secs,
            connect_timeout_secs: self.connect_timeout_secs,
        }
    }
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_group_id() -> String {
    DEFAULT_GROUP_ID.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_tolerance() -> f32 {
    DEFAULT_TOLERANCE
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}
