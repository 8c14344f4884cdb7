//! Cache maintenance commands

use crate::console::CliConsole;
use beacon_core::DataLayer;
use serde_json::json;

pub fn stats(layer: &DataLayer, console: &CliConsole) -> anyhow::Result<()> {
    let cache = layer.cache();
    let stats = cache.statistics();
    console.json(&json!({
        "namespace": cache.key_space().prefix(),
        "version": cache.key_space().version(),
        "scope": cache.active_scope(),
        "storageDir": layer.config().storage.dir,
        "hitRate": stats.hit_rate(),
        "statistics": stats,
    }))
}

pub async fn clear(layer: &DataLayer, console: &CliConsole) -> anyhow::Result<()> {
    layer.cache().clear_all().await;
    console.success("Cache cleared");
    Ok(())
}

pub async fn prune(layer: &DataLayer, console: &CliConsole) -> anyhow::Result<()> {
    let removed = layer.cache().cleanup_expired().await;
    console.success(&format!("Removed {} expired entries", removed));
    console.json(&json!({ "removed": removed }))
}
