//! Command-line and environment settings for the inference server.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, Parser)]
#[command(name = "formation-service", about = "Serve workshop recommendations over HTTP")]
pub struct ServiceConfig {
    /// Model bundle written by `formations train`.
    #[arg(long, env = "FORMATION_BUNDLE", default_value = "formation_predictor.bundle")]
    pub bundle: PathBuf,

    /// Address to listen on.
    #[arg(long, env = "FORMATION_LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Per-request budget for preprocessing and prediction.
    #[arg(long, env = "FORMATION_TIMEOUT_MS", default_value_t = 2000)]
    pub timeout_ms: u64,

    /// Workshops returned per request; defaults to the value stored in the bundle.
    #[arg(long, env = "FORMATION_TOP_K")]
    pub top_k: Option<usize>,
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
