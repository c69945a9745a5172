//! CLI argument definitions using clap derive macros.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fetch an authenticated reading list, enrich it with page extracts, and
/// serve it from a cache.
///
/// Credentials come from READINGLIST_USERNAME / READINGLIST_PASSWORD (or the
/// matching flags); endpoints from the config file or the flags below.
#[derive(Parser, Debug)]
#[command(name = "readinglist")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/readinglist/config.toml)
    #[arg(long, global = true)]
    pub config_file: Option<PathBuf>,

    /// Account name
    #[arg(long, env = "READINGLIST_USERNAME", global = true)]
    pub username: Option<String>,

    /// Account password
    #[arg(long, env = "READINGLIST_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Login page URL
    #[arg(long, global = true)]
    pub login_url: Option<String>,

    /// Paginated list entries URL
    #[arg(long, global = true)]
    pub entries_url: Option<String>,

    /// Batch extract URL prefix (ending in `titles=`)
    #[arg(long, global = true)]
    pub extracts_url: Option<String>,

    /// Delay before each remote request in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u64).range(0..=60000), global = true)]
    pub rate_limit: Option<u64>,

    /// SQLite cache file (default: in-memory cache for this process)
    #[arg(long, global = true)]
    pub cache_path: Option<PathBuf>,

    /// Bypass the cache entirely
    #[arg(long, global = true, conflicts_with = "cache_path")]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the reading list as JSON (default)
    Fetch,
    /// Serve the reading list over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
}
