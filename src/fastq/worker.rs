use log::trace;

use super::classify::{classify_line, LineKind};
use super::{normalize_read_id, reverse_complement, ParsedChunk, Strand};
use crate::error::Result;

/// Parses the lines of one chunk into parallel lists
///
/// Each line is classified on its own (see [`classify_line`]); no 4-line record framing
/// is assumed, so the lists of a single chunk need not have equal lengths.
/// Reverse strand sequences are also reverse complemented.
///
/// # Arguments
///
/// * `bytes` - The exact bytes of the chunk
/// * `strand` - The mate the file holds
///
/// # Errors
///
/// Returns an error if the chunk is not valid UTF-8 or if a reverse strand sequence
/// contains a character that cannot be complemented.
pub fn parse_chunk(bytes: &[u8], strand: Strand) -> Result<ParsedChunk> {
    let text = std::str::from_utf8(bytes)?;

    let mut parsed = ParsedChunk::default();
    for line in text.lines() {
        match classify_line(line) {
            LineKind::Sequence => {
                let sequence = line.trim();
                if strand.is_reverse() {
                    parsed.complements.push(reverse_complement(sequence)?);
                }
                parsed.sequences.push(sequence.to_string());
            }
            LineKind::Header => parsed.ids.push(normalize_read_id(line).to_string()),
            LineKind::Separator => {}
            LineKind::Quality => parsed.qualities.push(line.trim().to_string()),
        }
    }

    trace!(
        "parsed {} bytes of the {strand} strand: {} ids, {} sequences, {} quality lines",
        bytes.len(),
        parsed.ids.len(),
        parsed.sequences.len(),
        parsed.qualities.len()
    );
    Ok(parsed)
}
