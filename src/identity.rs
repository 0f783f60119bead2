//! Overlap identity of mate pairs from aligner output
//!
//! The aligner writes one tab-delimited line per mate, forward mate first. Only three
//! positional fields are read: the read name (field 0), the 1-based position of the mate
//! (field 7, `0` when unmapped) and the read sequence (field 9). Where the forward read
//! runs into its mate, the tail of the forward sequence is compared base by base with the
//! head of the reverse sequence.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{debug, info, warn};

use crate::error::{Result, ScoreError};
use crate::fastq::normalize_read_id;
use crate::stats::round_to;
use crate::table::{FlagUpdate, Table};

/// Field holding the read name
const FIELD_NAME: usize = 0;

/// Field holding the 1-based mate position
const FIELD_MATE_POS: usize = 7;

/// Field holding the read sequence
const FIELD_SEQ: usize = 9;

/// One mate line of the aligner output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentLine<'a> {
    pub name: &'a str,
    pub mate_pos: u64,
    pub seq: &'a str,
}
impl<'a> AlignmentLine<'a> {
    /// Splits one output line into its positional fields
    ///
    /// # Arguments
    ///
    /// * `line` - The raw line, with or without its line terminator
    /// * `lineno` - 1-based line number used in errors
    ///
    /// # Errors
    ///
    /// Returns [`ScoreError::MalformedRecord`] if the line has fewer than ten fields or
    /// the mate position is not an unsigned integer.
    pub fn parse(line: &'a str, lineno: usize) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() <= FIELD_SEQ {
            return Err(ScoreError::MalformedRecord(
                lineno,
                format!("expected at least {} fields, found {}", FIELD_SEQ + 1, fields.len()),
            )
            .into());
        }
        let mate_pos = fields[FIELD_MATE_POS].trim().parse().map_err(|_| {
            ScoreError::MalformedRecord(
                lineno,
                format!("mate position '{}' is not a number", fields[FIELD_MATE_POS]),
            )
        })?;
        Ok(Self {
            name: fields[FIELD_NAME].trim(),
            mate_pos,
            seq: fields[FIELD_SEQ].trim(),
        })
    }
}

/// Both mate lines of one read pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentPairRecord {
    /// Normalised read id of the forward mate
    pub id: String,
    /// 1-based start of the overlap on the forward read
    pub fw_pos: u64,
    /// Mate position reported on the reverse line
    pub rv_pos: u64,
    pub fw_seq: String,
    pub rv_seq: String,
    /// Whether both lines name the same read
    pub same_read: bool,
}
impl AlignmentPairRecord {
    #[must_use]
    pub fn new(fw: &AlignmentLine<'_>, rv: &AlignmentLine<'_>) -> Self {
        let id = normalize_read_id(fw.name);
        Self {
            id: id.to_string(),
            fw_pos: fw.mate_pos,
            rv_pos: rv.mate_pos,
            fw_seq: fw.seq.to_string(),
            rv_seq: rv.seq.to_string(),
            same_read: id == normalize_read_id(rv.name),
        }
    }

    /// Identity of the overlap, or `None` when the pair cannot be scored
    ///
    /// A pair is not scored when the mates name different reads, when either mate is
    /// unmapped, or when the overlap is empty.
    #[must_use]
    pub fn identity(&self) -> Option<f64> {
        if !self.same_read || self.fw_pos == 0 || self.rv_pos == 0 {
            return None;
        }
        calculate_identity(&self.fw_seq, &self.rv_seq, self.fw_pos as usize)
    }
}

/// Percent identity of the overlap between a forward read and its mate
///
/// The forward read overlaps its mate from the 1-based `fw_pos` onwards, so the mate's
/// overlapping head is `len(fw_seq) - fw_pos` bases long. The last base of both regions
/// is left out of the comparison. The result is rounded to 2 decimals.
///
/// Returns `None` if `fw_pos` is zero or past the end of the forward read, or if the
/// compared region of the mate is empty.
///
/// # Examples
///
/// ```rust
/// use pairflag::identity::calculate_identity;
///
/// assert_eq!(calculate_identity("AAAACCGGTTA", "CCGGTAAAA", 5), Some(100.0));
/// assert_eq!(calculate_identity("AAAACCGGTTA", "CCAATAAAA", 5), Some(60.0));
/// ```
#[must_use]
pub fn calculate_identity(fw_seq: &str, rv_seq: &str, fw_pos: usize) -> Option<f64> {
    let fw = fw_seq.as_bytes();
    let rv = rv_seq.as_bytes();
    if fw_pos == 0 || fw_pos > fw.len() {
        return None;
    }

    let rv_overlap_pos = fw.len() - fw_pos;
    let rv_end = rv_overlap_pos.saturating_sub(1).min(rv.len());
    let rv_slice = &rv[..rv_end];
    if rv_slice.is_empty() {
        return None;
    }
    let fw_slice = &fw[fw_pos - 1..fw.len() - 1];

    let hits = rv_slice
        .iter()
        .zip(fw_slice)
        .filter(|(r, f)| r == f)
        .count();
    Some(round_to(100.0 / rv_slice.len() as f64 * hits as f64, 2))
}

/// Accumulates identity scores over a stream of aligner output
#[derive(Debug, Clone, Default)]
pub struct IdentityScorer {
    scores: HashMap<String, f64>,
    pairs: usize,
    skipped: usize,
}
impl IdentityScorer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads aligner output two lines at a time and scores every pair
    ///
    /// Header lines starting with `@` before the first record and blank lines are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails, if a line is malformed, or if the output ends
    /// on a forward mate without its reverse mate.
    pub fn scan<R: BufRead>(&mut self, reader: R) -> Result<()> {
        let mut in_header = true;
        let mut pending: Option<(usize, String)> = None;

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let lineno = i + 1;
            if line.trim().is_empty() {
                continue;
            }
            if in_header && line.starts_with('@') {
                continue;
            }
            in_header = false;

            match pending.take() {
                None => pending = Some((lineno, line)),
                Some((fw_lineno, fw_line)) => {
                    let fw = AlignmentLine::parse(&fw_line, fw_lineno)?;
                    let rv = AlignmentLine::parse(&line, lineno)?;
                    self.add_pair(&AlignmentPairRecord::new(&fw, &rv));
                }
            }
        }

        if let Some((lineno, _)) = pending {
            return Err(ScoreError::UnpairedRecord(lineno).into());
        }
        if self.skipped > 0 {
            warn!(
                "{} of {} alignment pairs could not be scored",
                self.skipped, self.pairs
            );
        }
        debug!("scored {} alignment pairs", self.scores.len());
        Ok(())
    }

    /// Scores one pair, returning its identity if it was computable
    pub fn add_pair(&mut self, pair: &AlignmentPairRecord) -> Option<f64> {
        self.pairs += 1;
        let identity = pair.identity();
        match identity {
            Some(score) => {
                self.scores.insert(pair.id.clone(), score);
            }
            None => self.skipped += 1,
        }
        identity
    }

    /// Scores by read id
    #[must_use]
    pub fn scores(&self) -> &HashMap<String, f64> {
        &self.scores
    }

    /// Number of pairs read
    #[must_use]
    pub fn num_pairs(&self) -> usize {
        self.pairs
    }

    /// Number of pairs that could not be scored
    #[must_use]
    pub fn num_skipped(&self) -> usize {
        self.skipped
    }

    /// Left joins the accumulated scores onto the `overlap_identity_perc` column
    pub fn join_into(&self, table: &mut Table) -> FlagUpdate {
        let update = table.set_identity_scores(&self.scores);
        info!(
            "joined identity scores onto {} of {} reads",
            update.marked,
            table.len()
        );
        update
    }
}

/// Scores the aligner output at `path` and joins the scores onto `table`
pub fn score_file<P: AsRef<Path>>(path: P, table: &mut Table) -> Result<FlagUpdate> {
    let reader = File::open(path).map(BufReader::new)?;
    let mut scorer = IdentityScorer::new();
    scorer.scan(reader)?;
    Ok(scorer.join_into(table))
}

#[cfg(test)]
mod testing {
    use std::io::Cursor;

    use super::*;
    use crate::table::{Column, Row, Value};
    use crate::{Error, ScoreError};

    fn sam_line(name: &str, mate_pos: u64, seq: &str) -> String {
        format!("{name}\t99\tchr1\t100\t42\t11M\t=\t{mate_pos}\t50\t{seq}\tIIIIIIIIIII\n")
    }

    #[test]
    fn test_identical_overlap() {
        assert_eq!(calculate_identity("AAAACCGGTTA", "CCGGTAAAA", 5), Some(100.0));
    }

    #[test]
    fn test_partial_overlap_is_rounded() {
        // 1 of 3 bases match
        assert_eq!(calculate_identity("AAAAACGT", "ATTT", 4), Some(33.33));
    }

    #[test]
    fn test_not_computable() {
        assert_eq!(calculate_identity("ACGT", "ACGT", 0), None);
        assert_eq!(calculate_identity("ACGT", "ACGT", 5), None);
        // overlap of a single base leaves nothing to compare
        assert_eq!(calculate_identity("ACGT", "ACGT", 3), None);
        assert_eq!(calculate_identity("ACGTACGT", "", 2), None);
    }

    #[test]
    fn test_identity_in_range() {
        let seqs = ["ACGTACGTAC", "TTTTTTTTTT", "GATTACA", "CCCCGGGGAATT"];
        for fw in seqs {
            for rv in seqs {
                for pos in 0..=fw.len() + 1 {
                    if let Some(v) = calculate_identity(fw, rv, pos) {
                        assert!((0.0..=100.0).contains(&v));
                    }
                }
            }
        }
    }

    #[test]
    fn test_parse_line() {
        let line = sam_line("read1/1", 5, "ACGT");
        let parsed = AlignmentLine::parse(&line, 1).unwrap();
        assert_eq!(parsed.name, "read1/1");
        assert_eq!(parsed.mate_pos, 5);
        assert_eq!(parsed.seq, "ACGT");

        assert!(matches!(
            AlignmentLine::parse("a\tb\tc", 3),
            Err(Error::ScoreError(ScoreError::MalformedRecord(3, _)))
        ));
        let bad = "r\t0\t*\t0\t0\t*\t*\tx\t0\tACGT";
        assert!(matches!(
            AlignmentLine::parse(bad, 9),
            Err(Error::ScoreError(ScoreError::MalformedRecord(9, _)))
        ));
    }

    #[test]
    fn test_scan_pairs() {
        let mut output = String::from("@HD\tVN:1.0\n@SQ\tSN:chr1\tLN:1000\n");
        output.push_str(&sam_line("r1", 5, "AAAACCGGTTA"));
        output.push_str(&sam_line("r1", 7, "CCGGTAAAA"));
        // mismatched mates
        output.push_str(&sam_line("r2", 5, "AAAACCGGTTA"));
        output.push_str(&sam_line("r3", 7, "CCGGTAAAA"));
        // unmapped mate
        output.push_str(&sam_line("r4", 0, "AAAACCGGTTA"));
        output.push_str(&sam_line("r4", 7, "CCGGTAAAA"));

        let mut scorer = IdentityScorer::new();
        scorer.scan(Cursor::new(output)).unwrap();
        assert_eq!(scorer.num_pairs(), 3);
        assert_eq!(scorer.num_skipped(), 2);
        assert_eq!(scorer.scores().get("r1"), Some(&100.0));
        assert!(!scorer.scores().contains_key("r2"));

        let mut table = Table::new();
        for id in ["r1", "r2", "r3", "r4"] {
            table.push(Row::new(id)).unwrap();
        }
        scorer.join_into(&mut table);
        let scores = table.column_values(Column::OverlapIdentityPerc).unwrap();
        assert_eq!(scores[0], Value::Float(100.0));
        // mismatched and unmapped pairs stay null
        assert_eq!(scores[1], Value::Null);
        assert_eq!(scores[2], Value::Null);
        assert_eq!(scores[3], Value::Null);
    }

    #[test]
    fn test_unpaired_trailing_line() {
        let mut output = sam_line("r1", 5, "AAAACCGGTTA");
        output.push_str(&sam_line("r1", 7, "CCGGTAAAA"));
        output.push_str(&sam_line("r2", 5, "AAAACCGGTTA"));
        let mut scorer = IdentityScorer::new();
        assert!(matches!(
            scorer.scan(Cursor::new(output)),
            Err(Error::ScoreError(ScoreError::UnpairedRecord(3)))
        ));
    }

    #[test]
    fn test_join_into_table() {
        let mut table = Table::new();
        for id in ["r1", "r2"] {
            table.push(Row::new(id)).unwrap();
        }
        let mut scorer = IdentityScorer::new();
        let fw = AlignmentLine {
            name: "r1/1",
            mate_pos: 5,
            seq: "AAAACCGGTTA",
        };
        let rv = AlignmentLine {
            name: "r1/2",
            mate_pos: 7,
            seq: "CCGGTAAAA",
        };
        assert_eq!(scorer.add_pair(&AlignmentPairRecord::new(&fw, &rv)), Some(100.0));

        let update = scorer.join_into(&mut table);
        assert_eq!(update.marked, 1);
        assert_eq!(
            table.column_values(Column::OverlapIdentityPerc).unwrap(),
            vec![Value::Float(100.0), Value::Null]
        );
    }
}
