
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{DocumentChunk, FlatIndex, Neighbor, VectorIndex};
use crate::{RagError, Result};

pub const INDEX_FILE_NAME: &str = "vectorized_db.bin";
pub const METADATA_FILE_NAME: &str = "vectorized_db_meta.txt";

const METADATA_DELIMITER: char = '|';
const TEMP_SUFFIX: &str = "tmp";

/// Flat vector index plus the metadata log of the chunks behind its rows,
/// persisted side by side in one directory.
///
/// Row `n` of the index always belongs to entry `n` of the metadata log.
/// [`IndexStore::rebuild`] holds the write lock while it replaces both
/// artifacts; searches share the read lock.
pub struct IndexStore {
    directory: PathBuf,
    state: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    index: Option<FlatIndex>,
    chunks: Vec<DocumentChunk>,
}

impl IndexStore {
    /// Open the store kept in `directory`, creating the directory if needed.
    ///
    /// Missing artifacts leave the store empty and unbuilt.
    ///
    /// # Errors
    ///
    /// [`RagError::CorruptIndex`] if an artifact cannot be parsed, or if the
    /// metadata log is not the one the index was written with.
    #[inline]
    pub fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;

        let index_path = directory.join(INDEX_FILE_NAME);
        let metadata_path = directory.join(METADATA_FILE_NAME);

        let index = if index_path.exists() {
            let bytes = fs::read(&index_path)?;
            Some(FlatIndex::from_bytes(&bytes)?)
        } else {
            None
        };

        let metadata = if metadata_path.exists() {
            Some(fs::read_to_string(&metadata_path).map_err(|e| {
                RagError::CorruptIndex(format!(
                    "failed to read {}: {}",
                    metadata_path.display(),
                    e
                ))
            })?)
        } else {
            None
        };

        if let (Some((_, expected_crc)), Some(metadata)) = (&index, &metadata) {
            let actual_crc = crc32fast::hash(metadata.as_bytes());
            if actual_crc != *expected_crc {
                return Err(RagError::CorruptIndex(format!(
                    "metadata log checksum {actual_crc:#010x} does not match the index ({expected_crc:#010x})"
                )));
            }
        }

        let index = index.map(|(index, _)| index);
        let chunks = metadata.as_deref().map(parse_metadata).transpose()?.unwrap_or_default();

        let rows = index.as_ref().map_or(0, VectorIndex::len);
        if rows != chunks.len() {
            return Err(RagError::CorruptIndex(format!(
                "vector index has {} rows but metadata log has {} entries",
                rows,
                chunks.len()
            )));
        }

        match &index {
            Some(index) => info!(
                "Opened index at {} ({} rows, dimension {})",
                directory.display(),
                index.len(),
                index.dimension()
            ),
            None => debug!("No index found at {}, starting empty", directory.display()),
        }

        Ok(Self {
            directory,
            state: RwLock::new(StoreState { index, chunks }),
        })
    }

    #[inline]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.directory.join(INDEX_FILE_NAME)
    }

    #[inline]
    pub fn metadata_path(&self) -> PathBuf {
        self.directory.join(METADATA_FILE_NAME)
    }

    /// Dimension of the stored vectors, `None` until the store is built
    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.state.read().index.as_ref().map(VectorIndex::dimension)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.state.read().chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Metadata of the chunk stored at `row`
    #[inline]
    pub fn chunk(&self, row: usize) -> Option<DocumentChunk> {
        self.state.read().chunks.get(row).cloned()
    }

    /// Replace the whole store with `vectors` and their `chunks`, in order.
    ///
    /// Chunk text is stored with line breaks flattened to spaces. Both
    /// artifacts are written to temporary files and renamed into place; the
    /// in-memory state only changes once they are on disk.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmptyInput`] if `vectors` is empty; nothing is touched.
    /// - [`RagError::DimensionMismatch`] if the vectors differ in length.
    /// - [`RagError::UnencodableMetadata`] if a source path cannot be
    ///   written to the metadata log.
    #[inline]
    pub fn rebuild(&self, vectors: &[Vec<f32>], chunks: &[DocumentChunk]) -> Result<()> {
        let Some(first) = vectors.first() else {
            warn!("No vectors to index, leaving {} untouched", self.directory.display());
            return Err(RagError::EmptyInput);
        };

        if first.is_empty() {
            return Err(RagError::Other(anyhow::anyhow!("embedding vectors are empty")));
        }

        if vectors.len() != chunks.len() {
            return Err(RagError::Other(anyhow::anyhow!(
                "{} vectors supplied for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let chunks: Vec<DocumentChunk> = chunks
            .iter()
            .map(normalize_chunk)
            .collect::<Result<_>>()?;

        let mut index = FlatIndex::new(first.len());
        index.add(vectors)?;

        let mut state = self.state.write();

        let metadata = render_metadata(&chunks);
        let index_bytes = index.to_bytes(crc32fast::hash(metadata.as_bytes()))?;
        let staged_index = stage(&self.index_path(), &index_bytes)?;
        let staged_metadata = stage(&self.metadata_path(), metadata.as_bytes())?;
        staged_index.commit()?;
        staged_metadata.commit()?;

        info!(
            "Index saved to {} ({} rows, dimension {})",
            self.index_path().display(),
            index.len(),
            index.dimension()
        );

        *state = StoreState {
            index: Some(index),
            chunks,
        };
        Ok(())
    }

    /// Exact nearest neighbors of `vector`, closest first.
    ///
    /// An unbuilt store returns no neighbors.
    ///
    /// # Errors
    ///
    /// [`RagError::DimensionMismatch`] if `vector` does not match the stored
    /// dimension.
    #[inline]
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let state = self.state.read();
        match &state.index {
            Some(index) => index.search(vector, k),
            None => Ok(Vec::new()),
        }
    }

    /// Nearest neighbors resolved to their chunks, closest first
    #[inline]
    pub fn search_chunks(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<(Neighbor, DocumentChunk)>> {
        let state = self.state.read();
        let Some(index) = &state.index else {
            return Ok(Vec::new());
        };

        Ok(index
            .search(vector, k)?
            .into_iter()
            .filter_map(|neighbor| {
                state
                    .chunks
                    .get(neighbor.row)
                    .map(|chunk| (neighbor, chunk.clone()))
            })
            .collect())
    }
}

/// Source paths are written verbatim in front of the `|` delimiter, one
/// entry per line, so they cannot contain either.
pub(crate) fn check_source_path(source_path: &str) -> Result<()> {
    if source_path.contains([METADATA_DELIMITER, '\n', '\r']) {
        return Err(RagError::UnencodableMetadata(source_path.to_string()));
    }
    Ok(())
}

fn normalize_chunk(chunk: &DocumentChunk) -> Result<DocumentChunk> {
    check_source_path(&chunk.source_path)?;

    Ok(DocumentChunk {
        source_path: chunk.source_path.clone(),
        text: chunk.text.replace(['\n', '\r'], " "),
    })
}

fn render_metadata(chunks: &[DocumentChunk]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        out.push_str(&chunk.source_path);
        out.push(METADATA_DELIMITER);
        out.push_str(&chunk.text);
        out.push('\n');
    }
    out
}

/// One `path|text` entry per line. The first `|` separates the fields, so
/// chunk text may itself contain `|`.
fn parse_metadata(content: &str) -> Result<Vec<DocumentChunk>> {
    content
        .split_terminator('\n')
        .enumerate()
        .map(|(line_number, line)| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            line.split_once(METADATA_DELIMITER)
                .map(|(path, text)| DocumentChunk::new(path, text))
                .ok_or_else(|| {
                    RagError::CorruptIndex(format!(
                        "metadata line {} has no '{}' delimiter",
                        line_number + 1,
                        METADATA_DELIMITER
                    ))
                })
        })
        .collect()
}

/// A fully written temporary file waiting to be renamed over its target.
/// Dropping it without committing removes the temporary file.
struct StagedFile {
    tmp_path: PathBuf,
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    fn commit(mut self) -> Result<()> {
        fs::rename(&self.tmp_path, &self.path)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

fn stage(path: &Path, bytes: &[u8]) -> Result<StagedFile> {
    let mut file_name = path.file_name().unwrap_or_default().to_os_string();
    file_name.push(".");
    file_name.push(TEMP_SUFFIX);
    let staged = StagedFile {
        tmp_path: path.with_file_name(file_name),
        path: path.to_path_buf(),
        committed: false,
    };
    fs::write(&staged.tmp_path, bytes)?;
    Ok(staged)
}
