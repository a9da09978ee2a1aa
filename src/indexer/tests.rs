use super::*;
use crate::config::ConfigError;
use crate::embeddings::EmbeddingError;
use crate::index::{INDEX_FILE_NAME, METADATA_FILE_NAME};
use std::cell::Cell;
use std::fs;
use tempfile::TempDir;

/// Embeds text as `[length, first char code]` and counts calls
struct LengthEmbedder {
    calls: Cell<usize>,
}

impl LengthEmbedder {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
        }
    }
}

impl Embedder for LengthEmbedder {
    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        self.calls.set(self.calls.get() + 1);
        let first = text.chars().next().map_or(0.0, |c| c as u32 as f32);
        Ok(vec![text.chars().count() as f32, first])
    }
}

/// Fails on the n-th call
struct FlakyEmbedder {
    fail_on: usize,
    calls: Cell<usize>,
}

impl Embedder for FlakyEmbedder {
    fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call == self.fail_on {
            Err(EmbeddingError::Transient("connection reset".to_string()))
        } else {
            Ok(vec![1.0, 2.0])
        }
    }
}

fn create_test_indexer<E: Embedder>(embedder: E, chunking: ChunkingConfig) -> (Indexer<E>, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let store = IndexStore::open(temp_dir.path().join("storage")).expect("should open store");
    (Indexer::new(embedder, store, chunking), temp_dir)
}

fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("should write file");
    path
}

#[test]
fn build_single_document() {
    let (indexer, temp_dir) = create_test_indexer(LengthEmbedder::new(), ChunkingConfig::default());
    let path = write_file(&temp_dir, "info.txt", "AB".repeat(600).as_bytes());

    let report = indexer.build(&[&path]).expect("build should succeed");

    assert_eq!(report.files_indexed, 1);
    assert!(report.files_skipped.is_empty());
    assert_eq!(report.chunks_indexed, 2);
    assert_eq!(report.dimension, 2);

    let store = indexer.store();
    assert_eq!(store.len(), 2);
    assert_eq!(store.chunk(0).map(|c| c.text.len()), Some(1000));
    assert_eq!(store.chunk(1).map(|c| c.text.len()), Some(225));
    assert_eq!(
        store.chunk(1).map(|c| c.source_path),
        Some(path.to_string_lossy().into_owned())
    );
}

#[test]
fn unsupported_and_missing_files_are_skipped() {
    let (indexer, temp_dir) = create_test_indexer(LengthEmbedder::new(), ChunkingConfig::default());
    let good = write_file(&temp_dir, "good.txt", b"Pets travel in the cabin.");
    let unsupported = write_file(&temp_dir, "table.csv", b"a,b,c");
    let missing = temp_dir.path().join("missing.txt");

    let report = indexer
        .build(&[&unsupported, &good, &missing])
        .expect("build should succeed");

    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.chunks_indexed, 1);
    let skipped: Vec<&PathBuf> = report.files_skipped.iter().map(|s| &s.path).collect();
    assert_eq!(skipped, vec![&unsupported, &missing]);
    assert!(report.files_skipped[0].reason.contains("Unsupported"));
}

#[test]
fn unencodable_path_is_skipped_before_embedding() {
    let (indexer, temp_dir) = create_test_indexer(LengthEmbedder::new(), ChunkingConfig::default());
    let good = write_file(&temp_dir, "good.txt", "x".repeat(3000).as_bytes());
    let odd = write_file(&temp_dir, "odd|name.txt", "y".repeat(3000).as_bytes());

    let report = indexer.build(&[&good, &odd]).expect("build should succeed");

    assert_eq!(report.files_indexed, 1);
    assert_eq!(report.chunks_indexed, 4);
    assert_eq!(report.files_skipped.len(), 1);
    assert_eq!(report.files_skipped[0].path, odd);
    assert!(report.files_skipped[0].reason.contains("metadata log"));
    assert_eq!(indexer.embedder.calls.get(), report.chunks_indexed);

    let good_source = good.to_string_lossy().into_owned();
    assert!(
        (0..indexer.store().len())
            .all(|row| indexer.store().chunk(row).map(|c| c.source_path) == Some(good_source.clone()))
    );
}

#[test]
fn chunk_order_follows_file_order() {
    let chunking = ChunkingConfig {
        chunk_size: 4,
        overlap: 1,
    };
    let (indexer, temp_dir) = create_test_indexer(LengthEmbedder::new(), chunking);
    let first = write_file(&temp_dir, "a.txt", b"abcdefg");
    let second = write_file(&temp_dir, "b.txt", b"XYZ");

    indexer.build(&[&first, &second]).expect("build should succeed");

    let texts: Vec<String> = (0..indexer.store().len())
        .filter_map(|row| indexer.store().chunk(row).map(|c| c.text))
        .collect();
    assert_eq!(texts, vec!["abcd", "defg", "XYZ"]);
    assert_eq!(indexer.embedder.calls.get(), 3);
}

#[test]
fn invalid_chunking_fails_before_embedding() {
    let chunking = ChunkingConfig {
        chunk_size: 10,
        overlap: 10,
    };
    let (indexer, temp_dir) = create_test_indexer(LengthEmbedder::new(), chunking);
    let path = write_file(&temp_dir, "a.txt", b"some text");

    let err = indexer.build(&[&path]).expect_err("config is invalid");
    assert!(matches!(
        err,
        RagError::Config(ConfigError::OverlapTooLarge { .. })
    ));
    assert_eq!(indexer.embedder.calls.get(), 0);
}

#[test]
fn no_chunks_leaves_existing_index() {
    let (indexer, temp_dir) = create_test_indexer(LengthEmbedder::new(), ChunkingConfig::default());
    let good = write_file(&temp_dir, "good.txt", b"Refunds take 7 days.");
    indexer.build(&[&good]).expect("first build should succeed");
    let metadata_path = indexer.store().directory().join(METADATA_FILE_NAME);
    let before = fs::read(&metadata_path).expect("read metadata");

    let empty = write_file(&temp_dir, "empty.txt", b"");
    let unsupported = write_file(&temp_dir, "x.md", b"# nope");
    let err = indexer
        .build(&[&empty, &unsupported])
        .expect_err("nothing to index");

    assert!(matches!(err, RagError::EmptyInput));
    assert_eq!(fs::read(&metadata_path).expect("read metadata"), before);
    assert_eq!(indexer.store().len(), 1);
}

#[test]
fn no_files_at_all() {
    let (indexer, _temp_dir) = create_test_indexer(LengthEmbedder::new(), ChunkingConfig::default());
    let paths: [PathBuf; 0] = [];

    assert!(matches!(indexer.build(&paths), Err(RagError::EmptyInput)));
    assert!(!indexer.store().directory().join(INDEX_FILE_NAME).exists());
}

#[test]
fn embedding_failure_persists_nothing() {
    let embedder = FlakyEmbedder {
        fail_on: 2,
        calls: Cell::new(0),
    };
    let chunking = ChunkingConfig {
        chunk_size: 5,
        overlap: 0,
    };
    let (indexer, temp_dir) = create_test_indexer(embedder, chunking);
    let path = write_file(&temp_dir, "a.txt", b"0123456789abcde");

    let err = indexer.build(&[&path]).expect_err("second embedding fails");
    assert!(matches!(err, RagError::Embedding(EmbeddingError::Transient(_))));
    assert!(!indexer.store().directory().join(INDEX_FILE_NAME).exists());
    assert!(!indexer.store().directory().join(METADATA_FILE_NAME).exists());
    assert_eq!(indexer.store().dimension(), None);
}

#[test]
fn progress_is_reported() {
    let chunking = ChunkingConfig {
        chunk_size: 3,
        overlap: 0,
    };
    let (indexer, temp_dir) = create_test_indexer(LengthEmbedder::new(), chunking);
    let path = write_file(&temp_dir, "a.txt", b"abcdefgh");

    let mut total = None;
    let mut embedded = Vec::new();
    indexer
        .build_with_progress(&[&path], |event| match event {
            BuildProgress::Chunked { total_chunks } => total = Some(total_chunks),
            BuildProgress::Embedded { done, total, .. } => embedded.push((done, total)),
        })
        .expect("build should succeed");

    assert_eq!(total, Some(3));
    assert_eq!(embedded, vec![(1, 3), (2, 3), (3, 3)]);
}
