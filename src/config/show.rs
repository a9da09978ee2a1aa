use anyhow::{Context, Result};
use console::style;
use std::path::Path;

use super::Config;

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Provider:").bold().yellow());
    match config.embedding.base_url() {
        Ok(url) => eprintln!("  Base URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Base URL: {} ({})", style("Invalid").red(), e),
    }
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!(
        "  API key variable: {} ({})",
        style(&config.embedding.api_key_env).cyan(),
        if config.embedding.api_key().is_ok() {
            style("set").green()
        } else {
            style("not set").red()
        }
    );
    eprintln!(
        "  Timeout: {}s",
        style(config.embedding.timeout_seconds).cyan()
    );
    eprintln!(
        "  Retry attempts: {}",
        style(config.embedding.retry_attempts).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Chunking:").bold().yellow());
    eprintln!("  Chunk size: {}", style(config.chunking.chunk_size).cyan());
    eprintln!("  Overlap: {}", style(config.chunking.overlap).cyan());

    eprintln!();
    eprintln!("{}", style("Index:").bold().yellow());
    eprintln!(
        "  Directory: {}",
        style(config.index.directory.display()).cyan()
    );
    eprintln!("  Top k: {}", style(config.index.top_k).cyan());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}
