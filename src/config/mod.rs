// Configuration management module
// TOML settings for the embedding provider, chunking and the index location

pub mod settings;
pub mod show;


pub use settings::{Config, ConfigError, EmbeddingConfig, IndexConfig};
pub use show::show_config;

/// Resolve the configuration directory, preferring an explicit override
#[inline]
pub fn resolve_config_dir(
    override_dir: Option<std::path::PathBuf>,
) -> Result<std::path::PathBuf, ConfigError> {
    match override_dir {
        Some(dir) => Ok(dir),
        None => Config::default_dir(),
    }
}
