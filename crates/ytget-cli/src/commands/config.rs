use anyhow::{Context, Result};
use std::path::Path;
use ytget_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("ytget configuration\n");
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{}", rendered.trim_end());

    if config.paths.ffmpeg.is_none() {
        println!("\n# paths.ffmpeg unset: auto-detected from PATH");
    }
    if config.temp.directory.is_none() {
        println!("# temp.directory unset: using {}", config.temp_dir().display());
    }

    // Show config file locations
    println!("\nConfig file locations (in priority order):");
    if let Some(p) = config_path {
        println!("  1. {} (specified)", p.display());
    }
    if let Some(config_dir) = dirs::config_dir() {
        println!("  2. {}/ytget/config.toml", config_dir.display());
    }
    println!("  3. Environment variables (YTGET_<SECTION>__<KEY>)");

    Ok(())
}
