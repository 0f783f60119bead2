//! Line-aligned partitioning of a file into byte ranges
//!
//! A chunk starts where the previous one ended. Its nominal end is `start + size`;
//! that candidate is then moved forward to just past the next newline so that no
//! physical line is ever split between two chunks. The last chunk ends at the end
//! of the data. Together the ranges tile the input with no gap and no overlap.

use std::ops::Range;

/// Default target size of a chunk in bytes (1 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// A contiguous byte range of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    /// Byte offset of the first byte of the chunk
    pub start: usize,
    /// Number of bytes in the chunk
    pub len: usize,
}
impl ChunkRange {
    #[must_use]
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Exclusive end offset
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    #[must_use]
    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Lazy iterator over the [`ChunkRange`]s of a byte buffer
///
/// Created by [`chunk_ranges`] or [`FastqFile::chunks`](super::FastqFile::chunks).
/// The iterator only borrows the data; building a new one restarts the enumeration.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    data: &'a [u8],
    size: usize,
    offset: usize,
}
impl<'a> Chunks<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], size: usize) -> Self {
        Self {
            data,
            size,
            offset: 0,
        }
    }
}
impl Iterator for Chunks<'_> {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<Self::Item> {
        let file_end = self.data.len();
        if self.offset >= file_end {
            return None;
        }

        let start = self.offset;
        let candidate = start.saturating_add(self.size);
        let end = if candidate >= file_end {
            file_end
        } else {
            // finish the line the candidate falls in
            match memchr::memchr(b'\n', &self.data[candidate..]) {
                Some(pos) => candidate + pos + 1,
                None => file_end,
            }
        };

        self.offset = end;
        Some(ChunkRange::new(start, end - start))
    }
}

/// Splits `data` into line-aligned ranges of roughly `size` bytes
#[must_use]
pub fn chunk_ranges(data: &[u8], size: usize) -> Chunks<'_> {
    Chunks::new(data, size)
}

#[cfg(test)]
mod testing {
    use super::*;

    fn assert_tiles(data: &[u8], size: usize) {
        let ranges: Vec<_> = chunk_ranges(data, size).collect();
        let mut expected_start = 0;
        for range in &ranges {
            assert_eq!(range.start, expected_start);
            assert!(range.len > 0);
            // every chunk but the last one ends on a newline
            if range.end() < data.len() {
                assert_eq!(data[range.end() - 1], b'\n');
            }
            expected_start = range.end();
        }
        assert_eq!(expected_start, data.len());
    }

    #[test]
    fn test_ranges_tile_the_data() {
        let data = b"@r:1:2:3/1\nACGT\n+\nIIII\n@r:1:2:4/1\nACGTACGT\n+\nIIIIIIII\n";
        for size in 0..=data.len() + 3 {
            assert_tiles(data, size);
        }
    }

    #[test]
    fn test_without_trailing_newline() {
        let data = b"line one\nline two\nline three";
        for size in 0..=data.len() {
            assert_tiles(data, size);
        }
    }

    #[test]
    fn test_candidate_moves_to_end_of_line() {
        let data = b"aaaa\nbbbb\ncccc\n";
        let ranges: Vec<_> = chunk_ranges(data, 2).collect();
        assert_eq!(
            ranges,
            vec![
                ChunkRange::new(0, 5),
                ChunkRange::new(5, 5),
                ChunkRange::new(10, 5)
            ]
        );
    }

    #[test]
    fn test_candidate_on_line_start_takes_next_line() {
        // the candidate (offset 5) is the first byte of "bbbb", that whole line joins the chunk
        let data = b"aaaa\nbbbb\ncccc\n";
        let ranges: Vec<_> = chunk_ranges(data, 5).collect();
        assert_eq!(ranges, vec![ChunkRange::new(0, 10), ChunkRange::new(10, 5)]);
    }

    #[test]
    fn test_empty_data_has_no_chunks() {
        assert_eq!(chunk_ranges(b"", DEFAULT_CHUNK_SIZE).count(), 0);
    }

    #[test]
    fn test_single_chunk_when_size_exceeds_data() {
        let data = b"aaaa\nbbbb\n";
        let ranges: Vec<_> = chunk_ranges(data, DEFAULT_CHUNK_SIZE).collect();
        assert_eq!(ranges, vec![ChunkRange::new(0, data.len())]);
    }

    #[test]
    fn test_restartable() {
        let data = b"aaaa\nbbbb\ncccc\n";
        let chunks = chunk_ranges(data, 3);
        let first: Vec<_> = chunks.clone().collect();
        let second: Vec<_> = chunks.collect();
        assert_eq!(first, second);
    }
}
