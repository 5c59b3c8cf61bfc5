//! CLI argument definitions for pathkv.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// pathkv -- a dotted-path key-value store.
#[derive(Parser)]
#[command(
    name = "pathkv",
    version,
    about = "pathkv -- read and write nested JSON fields by dotted key",
    long_about = "Stores one JSON record per top-level key in SQLite or Postgres. \
                  Keys like `user.age` address fields inside a record."
)]
pub struct Cli {
    /// TOML config file. Without it, a SQLite file in ./data is used.
    #[arg(long, short, global = true, env = "PATHKV_CONFIG")]
    pub config: Option<PathBuf>,

    /// Table used when no config file is given.
    #[arg(long, global = true, default_value = "userinfo")]
    pub table: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the value at KEY (creating the record if it is missing).
    Get {
        key: String,
        /// Fallback value, as JSON or a bare string.
        #[arg(long, short)]
        default: Option<String>,
    },

    /// Write VALUE at KEY and print the resulting record.
    Set {
        key: String,
        /// JSON value; anything that does not parse is stored as a string.
        value: String,
    },

    /// Report whether KEY exists.
    Has { key: String },

    /// Append each VALUE to the sequence at KEY.
    Push {
        key: String,
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Print every stored record.
    All,

    /// Remove a record or a nested field.
    Delete { key: String },

    /// Run the user/age walkthrough against the configured store.
    Demo,
}
