//! Write a config file and create the storage layout.

use std::path::Path;

use anyhow::Context;
use promoreel_common::config::AppConfig;

pub fn run(config: AppConfig, config_path: &Path, force: bool) -> anyhow::Result<()> {
    init(&config, config_path, force)?;

    println!("Config written to {}", config_path.display());
    println!();
    println!("Directories:");
    println!("  Storage:   {}", config.storage_root.display());
    println!("  Videos:    {}", config.output_dir.display());
    println!("  Generated: {}", config.generated_dir.display());
    println!("  Music:     {}", config.music_dir.display());
    println!("  Jobs:      {}", config.jobs_dir.display());
    Ok(())
}

pub fn init(config: &AppConfig, config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }
    config
        .ensure_dirs()
        .context("Failed to create storage directories")?;
    config
        .save_to(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(())
}
