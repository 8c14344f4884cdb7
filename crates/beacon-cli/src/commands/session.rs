//! Sign-in commands

use crate::console::CliConsole;
use beacon_core::{DataLayer, SessionState};
use serde_json::json;

pub async fn login(
    layer: &DataLayer,
    console: &CliConsole,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let user = layer.session().login(email, password).await?;
    console.success(&format!("Signed in as {}", user.display_name()));
    console.json(&json!({
        "user": user,
        "expiresAt": layer.session().expires_at(),
    }))
}

pub async fn logout(layer: &DataLayer, console: &CliConsole) -> anyhow::Result<()> {
    if !layer.session().is_authenticated() {
        console.warn("Not signed in");
    }
    layer.session().logout().await;
    console.success("Signed out");
    Ok(())
}

/// Print the session state as JSON
pub fn whoami(layer: &DataLayer, console: &CliConsole) -> anyhow::Result<()> {
    let state = layer.session().state();
    if state == SessionState::Unauthenticated {
        console.warn("Not signed in");
    }
    console.json(&serde_json::to_value(&state)?)
}
