use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

// ── Application config ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding JSON fixture files for the filter worker
    /// (`observers.json`, `objects.json`).
    pub fixtures_dir: PathBuf,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            fixtures_dir: PathBuf::from(env_or("MAPWATCH_FIXTURES_DIR", "data/fixtures")),
            log_filter: env_or("MAPWATCH_LOG", "info"),
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  fixtures_dir: {}", self.fixtures_dir.display());
        tracing::info!("  log_filter:   {}", self.log_filter);
    }
}
