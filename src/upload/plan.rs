//! Chunk plan arithmetic
//!
//! A file of `file_size` bytes is cut into `ceil(file_size / chunk_size)`
//! contiguous, non-overlapping inclusive ranges. Only the last range may
//! be short.

use crate::storage::ByteRange;

/// Partition of a file into fixed-size chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub file_size: u64,
    pub chunk_size: u64,
    pub total_chunks: u64,
}

impl ChunkPlan {
    /// `None` when either size is zero
    pub fn new(file_size: u64, chunk_size: u64) -> Option<Self> {
        if file_size == 0 || chunk_size == 0 {
            return None;
        }
        Some(Self {
            file_size,
            chunk_size,
            total_chunks: file_size.div_ceil(chunk_size),
        })
    }

    /// Byte range of chunk `index`, `None` past the last chunk
    pub fn range(&self, index: u64) -> Option<ByteRange> {
        if index >= self.total_chunks {
            return None;
        }
        let start = index * self.chunk_size;
        let end = (start + self.chunk_size - 1).min(self.file_size - 1);
        Some(ByteRange { start, end })
    }

    pub fn is_last(&self, index: u64) -> bool {
        index + 1 == self.total_chunks
    }

    pub fn ranges(&self) -> impl Iterator<Item = ByteRange> + '_ {
        (0..self.total_chunks).filter_map(move |index| self.range(index))
    }
}
