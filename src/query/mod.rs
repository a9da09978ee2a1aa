//! Query side of the index: embed a question, find the nearest chunks and
//! render them for the conversational tool layer.


use std::path::Path;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::config::Config;
use crate::embeddings::{Embedder, OpenAiClient};
use crate::index::IndexStore;
use crate::{RagError, Result};

pub const NO_INDEX_MESSAGE: &str = "No Vectorized Database Found";
pub const NO_MATCHES_MESSAGE: &str = "No relevant documents found.";

/// One retrieved chunk, ranked from 1
#[derive(Debug, Clone, PartialEq)]
pub struct RankedChunk {
    pub rank: usize,
    pub chunk_text: String,
    pub source_path: String,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// The store has never been built
    NoIndex,
    /// Closest chunks first; may be empty
    Matches(Vec<RankedChunk>),
}

impl QueryResult {
    /// Retrieved chunks, empty for [`QueryResult::NoIndex`]
    #[inline]
    pub fn matches(&self) -> &[RankedChunk] {
        match self {
            Self::NoIndex => &[],
            Self::Matches(matches) => matches,
        }
    }

    /// Human-readable text handed back to the chat agent
    #[inline]
    pub fn render(&self) -> String {
        match self {
            Self::NoIndex => NO_INDEX_MESSAGE.to_string(),
            Self::Matches(matches) if matches.is_empty() => NO_MATCHES_MESSAGE.to_string(),
            Self::Matches(matches) => matches
                .iter()
                .map(|m| format!("{}. Most Relevant Chunk:\n{}\n", m.rank, m.chunk_text))
                .join(""),
        }
    }
}

pub struct QueryEngine<E> {
    embedder: E,
    store: IndexStore,
}

impl QueryEngine<OpenAiClient> {
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = OpenAiClient::from_config(&config.embedding)?;
        let store = IndexStore::open(&config.index.directory)?;
        Ok(Self::new(embedder, store))
    }
}

impl<E: Embedder> QueryEngine<E> {
    #[inline]
    pub fn new(embedder: E, store: IndexStore) -> Self {
        Self { embedder, store }
    }

    #[inline]
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Up to `k` chunks closest to `text`.
    ///
    /// An unbuilt store yields [`QueryResult::NoIndex`] without calling the
    /// embedder.
    ///
    /// # Errors
    ///
    /// [`RagError::Embedding`] if the provider fails and
    /// [`RagError::DimensionMismatch`] if it returns a vector of a different
    /// dimension than the stored one.
    #[inline]
    pub fn query(&self, text: &str, k: usize) -> Result<QueryResult> {
        if self.store.dimension().is_none() {
            debug!("Query against unbuilt index at {}", self.store.directory().display());
            return Ok(QueryResult::NoIndex);
        }

        let vector = self.embedder.embed(text)?;
        let matches = self
            .store
            .search_chunks(&vector, k)?
            .into_iter()
            .enumerate()
            .map(|(i, (neighbor, chunk))| RankedChunk {
                rank: i + 1,
                chunk_text: chunk.text,
                source_path: chunk.source_path,
                distance: neighbor.distance,
            })
            .collect::<Vec<_>>();

        debug!("Query matched {} chunks (k = {})", matches.len(), k);
        Ok(QueryResult::Matches(matches))
    }
}

/// Answer `question` from the index in `directory` using the configured
/// embedding provider. Never fails: problems come back as text.
///
/// An unbuilt index is reported before the provider is configured, so a
/// missing API key does not hide it.
#[inline]
pub fn lookup(question: &str, directory: &Path, k: usize, config: &Config) -> String {
    let store = match IndexStore::open(directory) {
        Ok(store) => store,
        Err(e) => {
            warn!("Lookup in {} failed: {}", directory.display(), e);
            return describe_failure(&e);
        }
    };
    if store.dimension().is_none() {
        return QueryResult::NoIndex.render();
    }

    match OpenAiClient::from_config(&config.embedding) {
        Ok(client) => answer(&QueryEngine::new(client, store), question, k),
        Err(e) => {
            warn!("Lookup could not create embedding client: {}", e);
            describe_failure(&RagError::from(e))
        }
    }
}

/// [`lookup`] with an explicit embedder
#[inline]
pub fn lookup_with<E: Embedder>(embedder: E, directory: &Path, question: &str, k: usize) -> String {
    match IndexStore::open(directory) {
        Ok(store) => answer(&QueryEngine::new(embedder, store), question, k),
        Err(e) => {
            warn!("Lookup in {} failed: {}", directory.display(), e);
            describe_failure(&e)
        }
    }
}

fn answer<E: Embedder>(engine: &QueryEngine<E>, question: &str, k: usize) -> String {
    match engine.query(question, k) {
        Ok(result) => result.render(),
        Err(e) => {
            warn!("Lookup in {} failed: {}", engine.store().directory().display(), e);
            describe_failure(&e)
        }
    }
}

fn describe_failure(error: &RagError) -> String {
    match error {
        RagError::DimensionMismatch { .. } => error.to_string(),
        _ => format!("Policy lookup failed: {}", error),
    }
}
