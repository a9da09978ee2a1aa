//! Vector index and its persisted store.
//!
//! [`VectorIndex`] is the search capability; [`FlatIndex`] is the exact
//! brute-force implementation. [`IndexStore`] pairs an index with the
//! metadata log of the chunks it was built from and keeps both on disk.

pub mod flat;
pub mod store;

use crate::Result;

pub use flat::FlatIndex;
pub use store::{IndexStore, INDEX_FILE_NAME, METADATA_FILE_NAME};

/// A piece of a source document. The unit that gets embedded and retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub source_path: String,
    pub text: String,
}

impl DocumentChunk {
    #[inline]
    pub fn new(source_path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            text: text.into(),
        }
    }
}

/// A search hit: the row of the stored vector and its distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    /// Lower is closer
    pub distance: f32,
}

/// Nearest-neighbor search over fixed-dimension vectors.
///
/// Rows are numbered in insertion order starting at zero.
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored and query vector must have
    fn dimension(&self) -> usize;

    /// Number of stored rows
    fn len(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append vectors as new rows, in order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RagError::DimensionMismatch`] if any vector has the
    /// wrong length; no rows are added in that case.
    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()>;

    /// Up to `k` closest rows, closest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RagError::DimensionMismatch`] if the query has the
    /// wrong length.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}
