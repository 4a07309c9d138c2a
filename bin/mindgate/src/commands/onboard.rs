use mindgate_core::{Paths, Settings};

pub async fn run(force: bool) -> anyhow::Result<()> {
    let paths = Paths::new();
    let settings_path = paths.settings_file();

    if settings_path.exists() && !force {
        println!("Settings already exist at {}", settings_path.display());
        println!("Use --force to overwrite with defaults.");
        return Ok(());
    }

    paths.ensure_dirs()?;
    let settings = Settings::default();
    settings.save(&settings_path)?;

    println!("✓ Created {}", settings_path.display());
    println!();
    println!("All capabilities start enabled. Point the backend at your AI service:");
    println!("  mindgate config show");
    println!("  edit {} (backend.api_base / backend.api_key)", settings_path.display());
    Ok(())
}
