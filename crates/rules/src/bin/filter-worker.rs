//! filter-worker — run the filtering pipeline for one observer.
//!
//! Loads observers and geo-objects from JSON fixture files into the
//! in-memory backend, runs the engine for the requested observer, and
//! prints the filtered objects plus the persisted rule configuration
//! (so stateful rules' `_state` updates are visible).

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use mapwatch_core::{config, Config, GeoObject, Observer};
use mapwatch_rules::{FilterEngine, RuleRegistry};
use mapwatch_storage::{MemoryBackend, ObserverStore};

// ── CLI ─────────────────────────────────────────────────────────────

/// Run the rule-filtering pipeline for one observer against JSON fixtures.
#[derive(Parser, Debug)]
#[command(name = "filter-worker", version, about)]
struct Cli {
    /// Observer id to render.
    #[arg(long)]
    observer: i64,

    /// Fixtures directory holding observers.json and objects.json.
    /// Defaults to the configured fixtures directory.
    #[arg(long, env = "MAPWATCH_FIXTURES_DIR")]
    fixtures: Option<PathBuf>,
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    let app_config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(app_config.log_filter.clone())),
        )
        .init();
    app_config.log_summary();

    let cli = Cli::parse();
    let fixtures = cli.fixtures.unwrap_or(app_config.fixtures_dir);

    let observers: Vec<Observer> =
        serde_json::from_str(&fs::read_to_string(fixtures.join("observers.json"))?)?;
    let objects: Vec<GeoObject> =
        serde_json::from_str(&fs::read_to_string(fixtures.join("objects.json"))?)?;
    info!(observers = observers.len(), objects = objects.len(), "loaded fixtures");

    let backend = Arc::new(MemoryBackend::new());
    for observer in observers {
        backend.insert_observer(observer);
    }
    for object in objects {
        backend.insert_object(object);
    }

    let engine = FilterEngine::new(RuleRegistry::builtin()?, backend.clone(), backend.clone());

    let observer = backend.get(cli.observer)?;
    info!(observer_id = observer.id, observer = %observer.name, "running filter pipeline");

    let filtered = engine.get_filtered_objects(&observer)?;
    info!(count = filtered.len(), "filtered objects");
    println!("{}", serde_json::to_string_pretty(&filtered)?);

    // Re-read so persisted `_state` updates show up.
    let after = backend.get(cli.observer)?;
    println!("{}", serde_json::to_string_pretty(&after.rules)?);

    Ok(())
}
