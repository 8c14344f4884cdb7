//! CLI argument definitions using clap

use beacon_core::HttpMethod;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Configuration file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "beacon.toml";

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "Beacon - data-access client for the campaign dashboard")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (JSON, TOML or YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and persist the session
    Login {
        email: String,

        /// Account password
        #[arg(long, env = "BEACON_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and clear every cached response
    Logout,

    /// Show the signed-in user and credential expiry
    Whoami,

    /// Read an API path through the cache
    Get {
        /// Path below `/api`, e.g. `/campaigns`
        path: String,

        /// Treat cached entries older than this as stale
        #[arg(long)]
        ttl_ms: Option<u64>,

        /// Skip the cache lookup but store the fresh response
        #[arg(long, conflicts_with = "no_store")]
        reload: bool,

        /// Bypass the cache entirely
        #[arg(long)]
        no_store: bool,
    },

    /// Send a request with any method
    Send {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: HttpMethod,

        /// Path below `/api`
        path: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,
    },

    /// Inspect or clear the local cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
pub enum CacheAction {
    /// Show cache statistics
    Stats,

    /// Remove every entry in the cache namespace
    Clear,

    /// Remove expired entries
    Prune,
}
