//! # TRACE CLI (`trace`)
//!
//! Command-line front-end for the aggregation engine.
//!
//! ## Usage
//!
//! ```bash
//! trace --config ./config/trace.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `trace search username <name>` | Look a handle up across every platform |
//! | `trace search email <address>` | Gravatar, Hunter.io and breach lookups |
//! | `trace search phone <number>` | Carrier, line type and country |
//! | `trace search image <path>` | Reverse image search of a local file |
//! | `trace providers` | List providers and their credential status |
//! | `trace serve` | Start the HTTP server |
//!
//! Reports are printed to stdout as pretty JSON; logs go to stderr and are
//! filtered with `RUST_LOG` (default `info`).

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use trace_osint::config::{self, Config};
use trace_osint::models::{SearchKind, SearchRequest};
use trace_osint::search::SearchEngine;
use trace_osint::{server, sources};

#[derive(Parser)]
#[command(
    name = "trace",
    about = "TRACE: multi-source OSINT lookups for usernames, emails, phones and images",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/trace.toml`. When the file does not exist the
    /// built-in defaults are used and credentials come from the environment.
    #[arg(long, global = true, default_value = "./config/trace.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query every provider registered for one identifier kind.
    Search {
        #[command(subcommand)]
        target: SearchTarget,
    },

    /// List registered providers, their kind and credential status.
    Providers,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum SearchTarget {
    /// Username or handle (a leading `@` is ignored).
    Username { query: String },
    /// Email address.
    Email { query: String },
    /// Phone number, ideally in international format.
    Phone { query: String },
    /// Path to an image file.
    Image { path: PathBuf },
}

fn load(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn request(target: SearchTarget) -> anyhow::Result<SearchRequest> {
    Ok(match target {
        SearchTarget::Username { query } => SearchRequest::text(SearchKind::Username, query),
        SearchTarget::Email { query } => SearchRequest::text(SearchKind::Email, query),
        SearchTarget::Phone { query } => SearchRequest::text(SearchKind::Phone, query),
        SearchTarget::Image { path } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read image: {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            SearchRequest::image_bytes(bytes, filename)
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load(&cli.config)?;

    match cli.command {
        Commands::Search { target } => {
            let engine = SearchEngine::from_config(&cfg)?;
            let report = engine.aggregate(&request(target)?).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Providers => {
            let engine = SearchEngine::from_config(&cfg)?;
            sources::list_providers(engine.registries());
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
