use std::sync::LazyLock;

use regex::Regex;

/// Illumina style header: `@`, an instrument token, then at least three `:<digits>` fields
static HEADER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@\S+?(?::\d+){3,10}\S*(?:\s.*)?$").expect("valid header pattern")
});

/// Kind of a physical FASTQ line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Header,
    Sequence,
    Separator,
    Quality,
}

/// Returns true if the line is made only of the letters `ATGCNYP` (any case)
#[must_use]
pub fn is_sequence_line(line: &str) -> bool {
    !line.is_empty()
        && line.bytes().all(|b| {
            matches!(
                b.to_ascii_uppercase(),
                b'A' | b'T' | b'G' | b'C' | b'N' | b'Y' | b'P'
            )
        })
}

#[must_use]
pub fn is_header_line(line: &str) -> bool {
    HEADER_PATTERN.is_match(line)
}

/// Classifies a single line without looking at its neighbours
///
/// The checks run in a fixed order: sequence alphabet first, then the header
/// pattern, then the bare `+` separator. Everything else is a quality line, so a
/// quality string made only of nucleotide letters is reported as [`LineKind::Sequence`].
#[must_use]
pub fn classify_line(line: &str) -> LineKind {
    let line = line.trim_end();
    if is_sequence_line(line) {
        LineKind::Sequence
    } else if is_header_line(line) {
        LineKind::Header
    } else if line == "+" {
        LineKind::Separator
    } else {
        LineKind::Quality
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_sequence_lines() {
        assert_eq!(classify_line("ACGTNacgtn"), LineKind::Sequence);
        assert_eq!(classify_line("ATGCYP\r"), LineKind::Sequence);
        assert_eq!(classify_line("ACGU"), LineKind::Quality);
    }

    #[test]
    fn test_header_lines() {
        assert_eq!(
            classify_line("@HWI-ST1234:8:1101:1234:5678#0/1"),
            LineKind::Header
        );
        assert_eq!(
            classify_line("@M00123:45:000000000-A1B2C:1:1101:15589:1333 1:N:0:1"),
            LineKind::Header
        );
        // not enough numeric colon fields
        assert_eq!(classify_line("@read1"), LineKind::Quality);
        assert_eq!(classify_line("@read:1:2"), LineKind::Quality);
    }

    #[test]
    fn test_separator_is_bare_plus() {
        assert_eq!(classify_line("+"), LineKind::Separator);
        assert_eq!(classify_line("+  "), LineKind::Separator);
        assert_eq!(classify_line("+HWI-ST1234:8:1101:1234:5678"), LineKind::Quality);
    }

    #[test]
    fn test_quality_lines() {
        assert_eq!(classify_line("IIIIHHHH##"), LineKind::Quality);
        assert_eq!(classify_line(""), LineKind::Quality);
    }

    #[test]
    fn test_nucleotide_like_quality_is_misread() {
        // phred+33 'A', 'C', 'G' and 'T' are valid quality characters
        assert_eq!(classify_line("AAAACCCC"), LineKind::Sequence);
    }
}
