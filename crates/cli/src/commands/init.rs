//! `lectern init` — Write a default configuration file.

use lectern_config::AppConfig;
use std::path::Path;

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => AppConfig::config_dir().join("config.toml"),
    };

    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        println!("Edit it manually or delete it and re-run init.");
        return Ok(());
    }

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&config_path, AppConfig::default_toml())?;

    println!("Created config at: {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Set ANTHROPIC_API_KEY (or add api_key to the config)");
    println!("  2. Run: lectern ingest ./docs");
    println!("  3. Run: lectern chat");
    Ok(())
}
