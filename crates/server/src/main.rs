//! facematch server binary.
//!
//! Reads `.env`, loads configuration and serves until SIGTERM or Ctrl+C.

use server::ServerConfig;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::load()?;

    server::run(config)
}
