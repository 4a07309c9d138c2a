use mindgate_core::{Capability, Paths, Settings};

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();
    let settings_path = paths.settings_file();

    println!("mindgate status");
    println!("===============");
    println!();
    println!(
        "Settings:  {} {}",
        settings_path.display(),
        if settings_path.exists() { "✓" } else { "✗ (not found, defaults active)" }
    );

    let settings = Settings::load_or_default(&paths);
    println!("Backend:   {}", settings.backend.api_base);
    println!(
        "API key:   {}",
        if settings.backend.api_key.is_empty() { "✗ not set" } else { "✓ configured" }
    );
    println!("Timeout:   {}s", settings.backend.request_timeout_secs);
    println!();

    println!("Capabilities:");
    for capability in Capability::ALL {
        let descriptor = capability.descriptor();
        let gate = if settings.is_enabled(capability) { "✓ enabled" } else { "✗ disabled" };
        println!("  {:<20} {:<20} {}", capability.as_str(), descriptor.label, gate);
    }

    if !settings_path.exists() {
        println!();
        println!("Run `mindgate onboard` to persist settings.");
    }
    Ok(())
}
