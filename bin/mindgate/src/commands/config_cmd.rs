use anyhow::Context;
use mindgate_core::{Capability, Paths, Settings};
use serde_json::Value;

/// Show the current settings as pretty-printed JSON.
pub async fn show() -> anyhow::Result<()> {
    let paths = Paths::new();
    let settings = Settings::load_or_default(&paths);

    println!();
    println!("📋 Current Settings");
    println!("  File: {}", paths.settings_file().display());
    println!();
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

pub async fn set_enabled(capability: &str, enabled: bool) -> anyhow::Result<()> {
    let capability: Capability =
        capability.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let paths = Paths::new();
    let mut settings = Settings::load_or_default(&paths);
    settings.set_enabled(capability, enabled);
    settings.save(&paths.settings_file())?;

    println!("✓ {} {}", capability, if enabled { "enabled" } else { "disabled" });
    Ok(())
}

pub async fn set(capability: &str, patch: &str) -> anyhow::Result<()> {
    let capability: Capability =
        capability.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let patch: Value = serde_json::from_str(patch).context("patch is not valid JSON")?;

    let paths = Paths::new();
    let mut settings = Settings::load_or_default(&paths);
    settings.apply_capability_patch(capability, &patch)?;
    settings.save(&paths.settings_file())?;

    println!("✓ Updated {} settings", capability);
    Ok(())
}
