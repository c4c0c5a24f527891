// In: src/sstable/index.rs

//! Decoder for the primary partition index (`Index.db`).
//!
//! Each entry is a `u16`-length partition key, the vint offset of the
//! partition in the data file and a vint promoted-index length followed by
//! that many bytes of promoted index, which is skipped. Entries appear in
//! partitioner order; nothing here assumes that order is sorted by key.

use crate::error::SstableError;
use crate::kernels::ByteCursor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry<'a> {
    pub key: &'a [u8],
    pub position: u64,
    /// Zero when the partition has no promoted index.
    pub promoted_index_length: u64,
}

/// A lazy sequence of index entries. Stops after the first error.
pub struct IndexReader<'a> {
    cursor: ByteCursor<'a>,
    failed: bool,
}

impl<'a> IndexReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: ByteCursor::new(bytes),
            failed: false,
        }
    }

    fn read_entry(&mut self) -> Result<IndexEntry<'a>, SstableError> {
        let key = self.cursor.read_short_length_bytes()?;
        let position = self.cursor.read_unsigned_vint()?;
        let promoted_index_length = self.cursor.read_unsigned_vint()?;
        let skip = usize::try_from(promoted_index_length).map_err(|_| {
            SstableError::MalformedVarint {
                offset: self.cursor.position(),
                reason: format!("promoted index length {} does not fit in memory", promoted_index_length),
            }
        })?;
        self.cursor.skip(skip)?;
        Ok(IndexEntry {
            key,
            position,
            promoted_index_length,
        })
    }
}

impl<'a> Iterator for IndexReader<'a> {
    type Item = Result<IndexEntry<'a>, SstableError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_at_end() {
            return None;
        }
        let entry = self.read_entry();
        self.failed = entry.is_err();
        Some(entry)
    }
}

/// Decodes the whole index.
pub fn read_index(bytes: &[u8]) -> Result<Vec<IndexEntry<'_>>, SstableError> {
    IndexReader::new(bytes).collect()
}

/// The data-file offsets of every indexed partition, in index order. Offsets
/// must strictly increase.
pub fn partition_offsets(bytes: &[u8]) -> Result<Vec<u64>, SstableError> {
    let mut offsets: Vec<u64> = Vec::new();
    for entry in IndexReader::new(bytes) {
        let entry = entry?;
        if let Some(&previous) = offsets.last() {
            if entry.position <= previous {
                return Err(SstableError::IndexMismatch {
                    expected: previous + 1,
                    actual: entry.position,
                });
            }
        }
        offsets.push(entry.position);
    }
    Ok(offsets)
}
