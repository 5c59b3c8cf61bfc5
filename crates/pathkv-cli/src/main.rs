//! CLI entry point for pathkv.
//!
//! Every subcommand opens the configured store, runs one operation, and
//! prints the result as JSON on stdout. Logs go to stderr.

mod cli;
mod helpers;

use anyhow::{Context, Result};
use clap::Parser;
use pathkv_store::PathStore;
use serde_json::{Value, json};
use tracing::{debug, info};

use cli::{Cli, Commands};
use helpers::{init_tracing, parse_value, render, resolve_config};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Best-effort: a missing .env is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing("warn");

    let config = resolve_config(cli.config.as_deref(), &cli.table)?;
    let store = PathStore::open(&config)
        .await
        .with_context(|| format!("failed to open {} store", config.backend.kind()))?;
    debug!(backend = config.backend.kind(), "store ready");

    match cli.command {
        Commands::Get { key, default } => {
            let value = store.get(&key, default.as_deref().map(parse_value)).await?;
            println!("{}", render(&value));
        }
        Commands::Set { key, value } => {
            let record = store.set(&key, parse_value(&value)).await?;
            println!("{}", render(&record));
        }
        Commands::Has { key } => {
            println!("{}", store.has(&key).await?);
        }
        Commands::Push { key, values } => {
            let value = store
                .push(&key, values.iter().map(|v| parse_value(v)))
                .await?;
            println!("{}", render(&value));
        }
        Commands::All => {
            let all = store.all().await?;
            println!("{}", render(&Value::Object(all)));
        }
        Commands::Delete { key } => {
            println!("{}", store.delete(&key).await?);
        }
        Commands::Demo => cmd_demo(&store).await?,
    }

    info!(cache = %store.cache().stats(), "done");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: demo
// ---------------------------------------------------------------------------

async fn cmd_demo(store: &PathStore) -> Result<()> {
    store.set("user", json!({"name": "Alex"})).await?;
    println!("set user        -> {}", store.get("user", None).await?);

    store.set("user.gender", json!("male")).await?;
    println!("set user.gender -> {}", store.get("user", None).await?);

    store.set("user.age", json!(33)).await?;
    println!("get user.age    -> {}", store.get("user.age", None).await?);

    store.push("user.children", [json!("Suzy")]).await?;
    store.push("user.name", [json!("Johnson")]).await?;

    println!("has user.hehe   -> {}", store.has("user.hehe").await?);
    println!("has user.name   -> {}", store.has("user.name").await?);
    println!("all             -> {}", render(&Value::Object(store.all().await?)));
    Ok(())
}
