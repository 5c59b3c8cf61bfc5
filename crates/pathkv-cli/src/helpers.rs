//! Shared helper functions used across CLI subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use pathkv_store::StoreConfig;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Load `path` if given, else fall back to `data/pathkv.db`.
pub fn resolve_config(path: Option<&Path>, table: &str) -> Result<StoreConfig> {
    match path {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let config = StoreConfig::sqlite(Path::new("data").join("pathkv.db"), table);
            config.validate().context("invalid table name")?;
            info!(table, "no config file, using data/pathkv.db");
            Ok(config)
        }
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Parse a command-line value as JSON, or keep it as a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Pretty JSON for terminal output.
pub fn render(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
