//! API call commands

use crate::console::CliConsole;
use anyhow::Context;
use beacon_core::{CacheMode, DataLayer, HttpMethod, RequestOptions};
use std::time::Duration;

pub struct GetArgs {
    pub path: String,
    pub ttl_ms: Option<u64>,
    pub reload: bool,
    pub no_store: bool,
}

impl GetArgs {
    fn options(&self) -> RequestOptions {
        let mut options = RequestOptions::get().cache_mode(self.cache_mode());
        if let Some(ttl) = self.ttl_ms {
            options = options.cache_ttl(Duration::from_millis(ttl));
        }
        options
    }

    fn cache_mode(&self) -> CacheMode {
        if self.no_store {
            CacheMode::NoStore
        } else if self.reload {
            CacheMode::Reload
        } else {
            CacheMode::Default
        }
    }
}

pub async fn get(layer: &DataLayer, console: &CliConsole, args: GetArgs) -> anyhow::Result<()> {
    console.info(&format!("GET {}", args.path));
    let value = layer.client().request(&args.path, args.options()).await?;
    console.json(&value)
}

pub async fn send(
    layer: &DataLayer,
    console: &CliConsole,
    method: HttpMethod,
    path: &str,
    body: Option<&str>,
) -> anyhow::Result<()> {
    let mut options = RequestOptions::with_method(method);
    if let Some(body) = body {
        let body = serde_json::from_str(body).context("--body is not valid JSON")?;
        options = options.body(body);
    }

    console.info(&format!("{} {}", method, path));
    let value = layer.client().request(path, options).await?;
    console.json(&value)
}
