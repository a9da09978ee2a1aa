
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;

/// Configuration for fixed-window chunking. Sizes are in characters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Window length
    pub chunk_size: usize,
    /// Characters shared between adjacent windows
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 25,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(self.chunk_size));
        }
        if self.overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.overlap,
                chunk_size: self.chunk_size,
            });
        }
        Ok(())
    }

    /// Distance between the starts of two consecutive windows
    #[inline]
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Split `text` into overlapping windows of `chunk_size` characters.
///
/// Each window starts `chunk_size - overlap` characters after the previous
/// one and the walk stops at the first window that reaches the end of the
/// text, so the last window may be shorter. Empty text yields no chunks.
#[inline]
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, ConfigError> {
    let config = ChunkingConfig {
        chunk_size,
        overlap,
    };
    config.validate()?;

    // Byte offset of every char boundary, including the end of the text
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_count {
            break;
        }
        start += config.stride();
    }

    debug!(
        "Chunked {} characters into {} chunks (size {}, overlap {})",
        char_count,
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}
