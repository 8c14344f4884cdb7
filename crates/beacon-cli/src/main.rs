//! Beacon CLI
//!
//! Drives the data-access layer from a terminal: sign in, issue API calls
//! through the cache, and inspect or clear what is stored locally.
//!
//! ```bash
//! beacon login ana@example.com --password secret
//! beacon get /campaigns --ttl-ms 60000
//! beacon send POST /campaigns --body '{"name":"Spring"}'
//! beacon cache stats
//! ```

mod args;
mod commands;
mod console;
mod logging;
mod router;

use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = args::Cli::parse();
    router::route(cli).await
}
