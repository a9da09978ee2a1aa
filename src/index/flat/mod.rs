//! Exact flat index.
//!
//! Vectors are kept in one contiguous row-major buffer and every search
//! compares the query against all of them by squared Euclidean distance.
//!
//! # Binary format
//!
//! Little endian throughout:
//!
//! | field     | type                       |
//! |-----------|----------------------------|
//! | magic     | `b"PRVI"`                  |
//! | version   | `u16`                      |
//! | dimension | `u32`                      |
//! | rows      | `u64`                      |
//! | meta crc  | `u32`                      |
//! | vectors   | `rows * dimension` x `f32` |
//!
//! `meta crc` is the CRC32 of the metadata log written alongside the index,
//! so a store can tell when the two files come from different builds.


use std::io::Write;

use super::{Neighbor, VectorIndex};
use crate::{RagError, Result};

pub const INDEX_MAGIC: [u8; 4] = *b"PRVI";
pub const INDEX_FORMAT_VERSION: u16 = 2;
const HEADER_LEN: usize = 4 + 2 + 4 + 8 + 4;

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Row `row` as a slice, if it exists
    #[inline]
    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Serialize the index in the binary format described in the module docs
    pub fn write_to<W: Write>(&self, mut writer: W, metadata_crc: u32) -> std::io::Result<()> {
        let dimension = u32::try_from(self.dimension).map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("dimension {} does not fit the index format", self.dimension),
            )
        })?;

        writer.write_all(&INDEX_MAGIC)?;
        writer.write_all(&INDEX_FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&dimension.to_le_bytes())?;
        writer.write_all(&(self.len() as u64).to_le_bytes())?;
        writer.write_all(&metadata_crc.to_le_bytes())?;
        for value in &self.data {
            writer.write_all(&value.to_le_bytes())?;
        }
        writer.flush()
    }

    pub fn to_bytes(&self, metadata_crc: u32) -> std::io::Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        self.write_to(&mut bytes, metadata_crc)?;
        Ok(bytes)
    }

    /// Parse an index written by [`FlatIndex::write_to`], returning it with
    /// the metadata checksum recorded in its header
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, u32)> {
        if bytes.len() < HEADER_LEN {
            return Err(corrupt(format!(
                "index artifact is {} bytes, shorter than its header",
                bytes.len()
            )));
        }

        let (magic, rest) = bytes.split_at(4);
        if magic != INDEX_MAGIC {
            return Err(corrupt(format!(
                "bad magic bytes: expected {INDEX_MAGIC:?}, found {magic:?}"
            )));
        }

        let (version, rest) = rest.split_at(2);
        let version = u16::from_le_bytes([version[0], version[1]]);
        if version != INDEX_FORMAT_VERSION {
            return Err(corrupt(format!("unsupported index format version {version}")));
        }

        let (dimension, rest) = rest.split_at(4);
        let dimension = u32::from_le_bytes([dimension[0], dimension[1], dimension[2], dimension[3]])
            as usize;
        let (rows, rest) = rest.split_at(8);
        let mut row_bytes = [0u8; 8];
        row_bytes.copy_from_slice(rows);
        let rows = u64::from_le_bytes(row_bytes);
        let (metadata_crc, payload) = rest.split_at(4);
        let metadata_crc = u32::from_le_bytes([
            metadata_crc[0],
            metadata_crc[1],
            metadata_crc[2],
            metadata_crc[3],
        ]);

        if dimension == 0 {
            return Err(corrupt("index dimension is zero".to_string()));
        }

        let expected_len = usize::try_from(rows)
            .ok()
            .and_then(|rows| rows.checked_mul(dimension))
            .and_then(|values| values.checked_mul(4));
        if expected_len != Some(payload.len()) {
            return Err(corrupt(format!(
                "index declares {rows} rows of dimension {dimension} but holds {} payload bytes",
                payload.len()
            )));
        }

        let data = payload
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok((Self { dimension, data }, metadata_crc))
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for FlatIndex {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            self.check_dimension(vector)?;
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_dimension(query)?;

        if k == 0 || self.data.is_empty() {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| Neighbor {
                row,
                distance: squared_euclidean(query, vector),
            })
            .collect();

        // Stable, so equal distances keep insertion order
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);

        Ok(neighbors)
    }
}

#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn corrupt(message: String) -> RagError {
    RagError::CorruptIndex(message)
}
