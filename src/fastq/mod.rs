//! # fastq
//!
//! Chunked FASTQ parsing.
//!
//! A FASTQ file is memory mapped ([`FastqFile`]), cut into line-aligned byte ranges
//! ([`ChunkRange`], see [`chunk`]) and each range is parsed independently by a chunk
//! worker ([`parse_chunk`]). Lines are classified one at a time ([`classify_line`]) rather
//! than by their position in a 4-line record, so a range may start or end in the middle of
//! a record: the per-chunk lists only line up into records once every chunk of a file has
//! been concatenated in order (see [`ParsedChunk::extend`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pairflag::fastq::{FastqFile, ParsedChunk, Strand};
//!
//! let file = FastqFile::new("./data/reads_R2.fastq").unwrap();
//!
//! let mut parsed = ParsedChunk::default();
//! for range in file.chunks(1024 * 1024) {
//!     parsed.extend(file.parse_range(range, Strand::Reverse).unwrap());
//! }
//! let records = parsed.into_records(Strand::Reverse).unwrap();
//! println!("{} reverse reads", records.len());
//! ```

pub mod chunk;
mod classify;
mod reader;
mod worker;

use std::fmt;

pub use chunk::{ChunkRange, Chunks, DEFAULT_CHUNK_SIZE};
pub use classify::{classify_line, is_header_line, is_sequence_line, LineKind};
pub use reader::FastqFile;
pub use worker::parse_chunk;

use crate::error::{ParseError, Result};

/// Which mate of a read pair a file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}
impl Strand {
    #[must_use]
    pub fn is_reverse(self) -> bool {
        matches!(self, Self::Reverse)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
        }
    }
}
impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single parsed read
///
/// `complement` is only filled for reads of the reverse strand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub id: String,
    pub sequence: String,
    pub quality: String,
    pub complement: Option<String>,
    pub strand: Strand,
}

/// The output of one chunk worker: parallel lists of the lines it classified
///
/// The lists are kept separate (and not zipped into records) because a chunk boundary
/// is only guaranteed to fall on a line boundary, not on a record boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedChunk {
    /// Normalised read ids (see [`normalize_read_id`])
    pub ids: Vec<String>,
    /// Nucleotide sequences in file order
    pub sequences: Vec<String>,
    /// Quality strings in file order
    pub qualities: Vec<String>,
    /// Reverse complements of `sequences` (reverse strand only)
    pub complements: Vec<String>,
}
impl ParsedChunk {
    /// Appends the lists of a later chunk to this one
    pub fn extend(&mut self, other: ParsedChunk) {
        self.ids.extend(other.ids);
        self.sequences.extend(other.sequences);
        self.qualities.extend(other.qualities);
        self.complements.extend(other.complements);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
            && self.sequences.is_empty()
            && self.qualities.is_empty()
            && self.complements.is_empty()
    }

    /// Number of header lines seen
    #[must_use]
    pub fn num_ids(&self) -> usize {
        self.ids.len()
    }

    /// Zips the parallel lists into records
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingData`] if the lists have different lengths or if a
    /// quality line is empty.
    pub fn into_records(self, strand: Strand) -> Result<Vec<SequenceRecord>> {
        let n = self.ids.len();
        if self.sequences.len() != n || self.qualities.len() != n {
            return Err(ParseError::MissingData(format!(
                "{strand} strand has {} ids, {} sequences and {} quality lines",
                n,
                self.sequences.len(),
                self.qualities.len()
            ))
            .into());
        }
        if strand.is_reverse() && self.complements.len() != n {
            return Err(ParseError::MissingData(format!(
                "{strand} strand has {} sequences but {} reverse complements",
                n,
                self.complements.len()
            ))
            .into());
        }
        if let Some(pos) = self.qualities.iter().position(String::is_empty) {
            return Err(ParseError::MissingData(format!(
                "empty quality line for read '{}'",
                self.ids[pos]
            ))
            .into());
        }

        let mut complements = self.complements.into_iter();
        let records = self
            .ids
            .into_iter()
            .zip(self.sequences)
            .zip(self.qualities)
            .map(|((id, sequence), quality)| SequenceRecord {
                id,
                sequence,
                quality,
                complement: if strand.is_reverse() {
                    complements.next()
                } else {
                    None
                },
                strand,
            })
            .collect();
        Ok(records)
    }
}

/// Reduces a FASTQ header (or an aligner read name) to the id used as the table key
///
/// Strips a leading `@`, keeps only the first whitespace-delimited token and removes a
/// trailing `/1` or `/2` mate suffix.
#[must_use]
pub fn normalize_read_id(header: &str) -> &str {
    let header = header.trim();
    let header = header.strip_prefix('@').unwrap_or(header);
    let token = header.split_whitespace().next().unwrap_or("");
    token
        .strip_suffix("/1")
        .or_else(|| token.strip_suffix("/2"))
        .unwrap_or(token)
}

/// Returns the reverse complement of a DNA sequence, preserving case
///
/// Accepted characters are `A`, `C`, `G`, `T`, `N` and `.` in either case.
///
/// # Errors
///
/// Returns [`ParseError::NonDnaSequence`] if any other character is found.
pub fn reverse_complement(sequence: &str) -> Result<String> {
    let mut out = String::with_capacity(sequence.len());
    for b in sequence.bytes().rev() {
        out.push(match b {
            b'A' => 'T',
            b'T' => 'A',
            b'C' => 'G',
            b'G' => 'C',
            b'a' => 't',
            b't' => 'a',
            b'c' => 'g',
            b'g' => 'c',
            b'N' => 'N',
            b'n' => 'n',
            b'.' => '.',
            _ => return Err(ParseError::NonDnaSequence(sequence.to_string()).into()),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::Error;

    #[test]
    fn test_normalize_read_id() {
        assert_eq!(normalize_read_id("@HWI-ST1:8:1101:1:2#0/1"), "HWI-ST1:8:1101:1:2#0");
        assert_eq!(normalize_read_id("@HWI-ST1:8:1101:1:2#0/2"), "HWI-ST1:8:1101:1:2#0");
        assert_eq!(
            normalize_read_id("@M001:45:FC:1:1101:15589:1333 1:N:0:1"),
            "M001:45:FC:1:1101:15589:1333"
        );
        assert_eq!(normalize_read_id("read_7"), "read_7");
        assert_eq!(normalize_read_id("read_7/3"), "read_7/3");
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement("ATGC").unwrap(), "GCAT");
        assert_eq!(reverse_complement("aacN").unwrap(), "Ngtt");
        assert_eq!(reverse_complement("").unwrap(), "");
    }

    #[test]
    fn test_reverse_complement_rejects_non_dna() {
        let err = reverse_complement("ATYG").unwrap_err();
        assert!(matches!(
            err,
            Error::ParseError(ParseError::NonDnaSequence(ref s)) if s == "ATYG"
        ));
    }

    fn chunk(ids: &[&str], seqs: &[&str], quals: &[&str]) -> ParsedChunk {
        ParsedChunk {
            ids: ids.iter().map(ToString::to_string).collect(),
            sequences: seqs.iter().map(ToString::to_string).collect(),
            qualities: quals.iter().map(ToString::to_string).collect(),
            complements: Vec::new(),
        }
    }

    #[test]
    fn test_extend_then_zip_across_split_record() {
        // first chunk ends between the sequence and the quality line of read b
        let mut parsed = chunk(&["a", "b"], &["ACGT", "GGGG"], &["IIII"]);
        parsed.extend(chunk(&["c"], &["TTTT"], &["JJJJ", "KKKK"]));

        let records = parsed.into_records(Strand::Forward).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].id, "b");
        assert_eq!(records[1].quality, "JJJJ");
        assert_eq!(records[2].sequence, "TTTT");
        assert!(records.iter().all(|r| r.complement.is_none()));
    }

    #[test]
    fn test_unequal_lists_are_missing_data() {
        let parsed = chunk(&["a", "b"], &["ACGT", "GGGG"], &["IIII"]);
        assert!(matches!(
            parsed.into_records(Strand::Forward),
            Err(Error::ParseError(ParseError::MissingData(_)))
        ));
    }

    #[test]
    fn test_empty_quality_is_missing_data() {
        let parsed = chunk(&["a"], &["ACGT"], &[""]);
        assert!(matches!(
            parsed.into_records(Strand::Forward),
            Err(Error::ParseError(ParseError::MissingData(_)))
        ));
    }

    #[test]
    fn test_reverse_requires_complements() {
        let parsed = chunk(&["a"], &["ACGT"], &["IIII"]);
        assert!(parsed.into_records(Strand::Reverse).is_err());
    }
}
