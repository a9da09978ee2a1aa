use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::embeddings::EmbeddingError;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Extraction error for {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedFileType(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("No valid documents found")]
    EmptyInput,

    #[error("Cannot store source path {0:?} in the metadata log")]
    UnencodableMetadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl RagError {
    /// Errors that only affect a single input file during a build.
    #[inline]
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::Extraction { .. } | Self::UnsupportedFileType(_)
        )
    }
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extractor;
pub mod index;
pub mod indexer;
pub mod query;
