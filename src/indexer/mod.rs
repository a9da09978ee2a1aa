// Indexer module
// Builds the index: extract -> chunk -> embed -> rebuild the store

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::embeddings::chunking::{ChunkingConfig, chunk_text};
use crate::embeddings::{Embedder, OpenAiClient};
use crate::extractor;
use crate::index::store::check_source_path;
use crate::index::{DocumentChunk, IndexStore};
use crate::{RagError, Result};

/// Turns a fixed set of source documents into a persisted index
pub struct Indexer<E> {
    embedder: E,
    store: IndexStore,
    chunking: ChunkingConfig,
}

/// A file left out of the build, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub files_indexed: usize,
    pub files_skipped: Vec<SkippedFile>,
    pub chunks_indexed: usize,
    pub dimension: usize,
}

/// Progress notifications emitted while building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildProgress<'a> {
    /// All files were read; `total_chunks` embeddings are about to be requested
    Chunked { total_chunks: usize },
    /// One more chunk was embedded
    Embedded { done: usize, total: usize, source: &'a str },
}

impl Indexer<OpenAiClient> {
    /// Indexer using the configured OpenAI-compatible provider and index directory
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = OpenAiClient::from_config(&config.embedding)?;
        let store = IndexStore::open(&config.index.directory)?;
        Ok(Self::new(embedder, store, config.chunking))
    }
}

impl<E: Embedder> Indexer<E> {
    #[inline]
    pub fn new(embedder: E, store: IndexStore, chunking: ChunkingConfig) -> Self {
        Self {
            embedder,
            store,
            chunking,
        }
    }

    #[inline]
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    #[inline]
    pub fn into_store(self) -> IndexStore {
        self.store
    }

    /// Rebuild the index from `file_paths`.
    ///
    /// Files that cannot be extracted, or whose path cannot be recorded in the
    /// metadata log, are logged and skipped. Any embedding
    /// failure aborts the build before anything is written.
    ///
    /// # Errors
    ///
    /// - [`RagError::Config`] for an invalid chunking configuration, before
    ///   any file is read.
    /// - [`RagError::EmptyInput`] if no file produced a chunk; the existing
    ///   index is left as it was.
    /// - [`RagError::Embedding`] if the provider fails.
    #[inline]
    pub fn build<P: AsRef<Path>>(&self, file_paths: &[P]) -> Result<BuildReport> {
        self.build_with_progress(file_paths, |_| {})
    }

    #[inline]
    pub fn build_with_progress<P, F>(&self, file_paths: &[P], mut progress: F) -> Result<BuildReport>
    where
        P: AsRef<Path>,
        F: FnMut(BuildProgress<'_>),
    {
        self.chunking.validate()?;

        let (chunks, files_indexed, files_skipped) = self.collect_chunks(file_paths)?;

        if chunks.is_empty() {
            warn!("No valid documents found, index left untouched");
            return Err(RagError::EmptyInput);
        }

        let total = chunks.len();
        progress(BuildProgress::Chunked {
            total_chunks: total,
        });
        info!("Embedding {} chunks from {} files", total, files_indexed);

        let mut vectors = Vec::with_capacity(total);
        for (done, chunk) in chunks.iter().enumerate() {
            let vector = self.embedder.embed(&chunk.text).inspect_err(|e| {
                warn!("Embedding failed for a chunk of {}: {}", chunk.source_path, e);
            })?;
            vectors.push(vector);
            progress(BuildProgress::Embedded {
                done: done + 1,
                total,
                source: &chunk.source_path,
            });
        }

        self.store.rebuild(&vectors, &chunks)?;

        Ok(BuildReport {
            files_indexed,
            files_skipped,
            chunks_indexed: total,
            dimension: vectors.first().map_or(0, Vec::len),
        })
    }

    fn collect_chunks<P: AsRef<Path>>(
        &self,
        file_paths: &[P],
    ) -> Result<(Vec<DocumentChunk>, usize, Vec<SkippedFile>)> {
        let mut chunks = Vec::new();
        let mut files_indexed = 0;
        let mut files_skipped = Vec::new();

        for path in file_paths {
            let path = path.as_ref();
            let source = path.to_string_lossy();
            if let Err(e) = check_source_path(&source) {
                warn!("Skipping {}: {}", path.display(), e);
                files_skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                continue;
            }

            let text = match extractor::extract(path) {
                Ok(text) => text,
                Err(e) if e.is_per_file() => {
                    warn!("Skipping {}: {}", path.display(), e);
                    files_skipped.push(SkippedFile {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let pieces = chunk_text(&text, self.chunking.chunk_size, self.chunking.overlap)?;
            debug!("{} produced {} chunks", path.display(), pieces.len());
            if pieces.is_empty() {
                files_skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    reason: "no text extracted".to_string(),
                });
                continue;
            }

            chunks.extend(
                pieces
                    .into_iter()
                    .map(|text| DocumentChunk::new(source.as_ref(), text)),
            );
            files_indexed += 1;
        }

        Ok((chunks, files_indexed, files_skipped))
    }
}
