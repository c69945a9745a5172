//! CLI entry point for the reading list tool.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use readinglist_core::config::{self, FileConfig};
use readinglist_core::server::{self, AppState};
use readinglist_core::{
    Credentials, DEFAULT_REQUEST_INTERVAL_MS, Endpoints, MemoryCache, ReadingListService,
    ReqwestTransport, SqliteCache,
};
use tracing::{debug, info};

mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so stdout carries only the JSON payload.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let loaded = config::load_config(args.config_file.as_deref())?;
    if let Some(path) = loaded.path.as_deref().filter(|_| loaded.config.is_some()) {
        debug!(path = %path.display(), "loaded config file");
    }
    let file_config = loaded.config.unwrap_or_default();

    let endpoints = resolve_endpoints(&args, &file_config);
    endpoints.validate()?;

    let credentials = resolve_credentials(&args, &file_config)?;
    let interval_ms = args
        .rate_limit
        .or(file_config.request_interval_ms)
        .unwrap_or(DEFAULT_REQUEST_INTERVAL_MS);
    config::validate_request_interval(Some(interval_ms))?;

    let service = build_service(&args, &file_config, endpoints)
        .await?
        .with_request_interval(Duration::from_millis(interval_ms));

    match args.command.clone().unwrap_or(Command::Fetch) {
        Command::Fetch => {
            let json = service
                .get_reading_list_json(&credentials)
                .await
                .context("failed to fetch reading list")?;
            info!(source = ?json.source, "reading list ready");
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json.body)?;
        }
        Command::Serve { bind } => {
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            let state = AppState {
                service: Arc::new(service),
                credentials: Arc::new(credentials),
            };
            server::serve(listener, state).await?;
        }
    }

    Ok(())
}

/// Flags override file values; file values override built-in defaults.
fn resolve_endpoints(args: &Args, file_config: &FileConfig) -> Endpoints {
    let base = file_config.endpoints();
    Endpoints {
        login_url: args.login_url.clone().unwrap_or(base.login_url),
        entries_url: args.entries_url.clone().unwrap_or(base.entries_url),
        extracts_url: args.extracts_url.clone().unwrap_or(base.extracts_url),
    }
}

fn resolve_credentials(args: &Args, file_config: &FileConfig) -> Result<Credentials> {
    let Some(username) = args
        .username
        .clone()
        .or_else(|| file_config.username.clone())
        .filter(|name| !name.is_empty())
    else {
        bail!("No username configured. Set READINGLIST_USERNAME or `username` in the config file.");
    };
    let Some(password) = args.password.clone().filter(|p| !p.is_empty()) else {
        bail!("No password configured. Set READINGLIST_PASSWORD.");
    };
    Ok(Credentials::new(username, password))
}

async fn build_service(
    args: &Args,
    file_config: &FileConfig,
    endpoints: Endpoints,
) -> Result<ReadingListService> {
    let transport = Arc::new(ReqwestTransport::new().context("failed to build HTTP client")?);

    if args.no_cache {
        debug!("cache disabled");
        return Ok(ReadingListService::uncached(transport, endpoints));
    }

    match args.cache_path.as_ref().or(file_config.cache_path.as_ref()) {
        Some(path) => {
            let cache = SqliteCache::new(path)
                .await
                .with_context(|| format!("failed to open cache at '{}'", path.display()))?;
            debug!(path = %path.display(), "using SQLite cache");
            Ok(ReadingListService::new(transport, Arc::new(cache), endpoints))
        }
        None => {
            debug!("using in-memory cache");
            Ok(ReadingListService::new(
                transport,
                Arc::new(MemoryCache::new()),
                endpoints,
            ))
        }
    }
}
