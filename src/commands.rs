use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::RagError;
use crate::config::Config;
use crate::indexer::{BuildProgress, Indexer};
use crate::query;

/// Rebuild the index in `directory` (or the configured one) from `files`
#[inline]
pub fn build_index(config: &Config, files: &[PathBuf], directory: Option<PathBuf>) -> Result<()> {
    let mut config = config.clone();
    if let Some(directory) = directory {
        config.index.directory = directory;
    }

    info!(
        "Building index in {} from {} files",
        config.index.directory.display(),
        files.len()
    );

    let indexer = Indexer::from_config(&config).context("Failed to initialize indexer")?;

    let bar = if console::user_attended_stderr() {
        ProgressBar::new(0).with_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} chunks {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        )
    } else {
        ProgressBar::hidden()
    };

    let result = indexer.build_with_progress(files, |event| match event {
        BuildProgress::Chunked { total_chunks } => bar.set_length(total_chunks as u64),
        BuildProgress::Embedded { done, source, .. } => {
            bar.set_position(done as u64);
            bar.set_message(source.to_string());
        }
    });
    bar.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(RagError::EmptyInput) => {
            println!("No valid documents found. The existing index was left untouched.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Index build failed"),
    };

    for skipped in &report.files_skipped {
        println!("Skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    println!(
        "Indexed {} chunks from {} files (dimension {})",
        report.chunks_indexed, report.files_indexed, report.dimension
    );
    println!(
        "Index saved to {}",
        indexer.store().index_path().display()
    );

    Ok(())
}

/// Print the lookup answer for `question`
#[inline]
pub fn query_index(
    config: &Config,
    question: &str,
    directory: Option<&Path>,
    k: Option<usize>,
) -> Result<()> {
    let directory = directory.unwrap_or(&config.index.directory);
    let k = k.unwrap_or(config.index.top_k);

    let answer = query::lookup(question, directory, k, config);
    println!("{}", answer);
    Ok(())
}

/// Write the default configuration file if none exists yet
#[inline]
pub fn init_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    if config.config_file_path().exists() {
        println!(
            "Configuration already exists at {}",
            config.config_file_path().display()
        );
        return Ok(());
    }

    config.save().context("Failed to save configuration")?;
    println!(
        "Configuration written to {}",
        config.config_file_path().display()
    );
    Ok(())
}
