//! Derived per-read statistics
//!
//! Runs once on a freshly ingested [`Table`]: pairing status, sequence lengths and
//! the A/T/G/C percentages of both mates.

use log::info;

use crate::table::{Row, Table};

/// One of the four unambiguous nucleotides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Base {
    A,
    T,
    G,
    C,
}
impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::T, Base::G, Base::C];

    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::T => 'T',
            Self::G => 'G',
            Self::C => 'C',
        }
    }
}

/// Raw, case-insensitive nucleotide counts of a sequence
///
/// `other` holds everything that is not A, T, G or C (`N`, `Y`, `P`, ...), so the
/// five counts always add up to the sequence length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NucleotideCounts {
    pub a: usize,
    pub t: usize,
    pub g: usize,
    pub c: usize,
    pub other: usize,
}
impl NucleotideCounts {
    #[must_use]
    pub fn from_sequence(sequence: &str) -> Self {
        let mut counts = Self::default();
        for b in sequence.bytes() {
            match b.to_ascii_uppercase() {
                b'A' => counts.a += 1,
                b'T' => counts.t += 1,
                b'G' => counts.g += 1,
                b'C' => counts.c += 1,
                _ => counts.other += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn get(&self, base: Base) -> usize {
        match base {
            Base::A => self.a,
            Base::T => self.t,
            Base::G => self.g,
            Base::C => self.c,
        }
    }

    /// Total number of characters counted
    #[must_use]
    pub fn len(&self) -> usize {
        self.a + self.t + self.g + self.c + self.other
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Share of `base` in percent, rounded to 4 decimals; `None` for an empty sequence
    #[must_use]
    pub fn percentage(&self, base: Base) -> Option<f64> {
        let len = self.len();
        if len == 0 {
            return None;
        }
        Some(round_to(self.get(base) as f64 / len as f64 * 100.0, 4))
    }
}

/// Nucleotide percentages of one mate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Composition {
    pub a: Option<f64>,
    pub t: Option<f64>,
    pub g: Option<f64>,
    pub c: Option<f64>,
}
impl Composition {
    /// Percentages of an optional sequence; every field is `None` when the sequence is
    /// absent or empty
    #[must_use]
    pub fn from_sequence(sequence: Option<&str>) -> Self {
        let Some(sequence) = sequence else {
            return Self::default();
        };
        let counts = NucleotideCounts::from_sequence(sequence);
        Self {
            a: counts.percentage(Base::A),
            t: counts.percentage(Base::T),
            g: counts.percentage(Base::G),
            c: counts.percentage(Base::C),
        }
    }

    #[must_use]
    pub fn get(&self, base: Base) -> Option<f64> {
        match base {
            Base::A => self.a,
            Base::T => self.t,
            Base::G => self.g,
            Base::C => self.c,
        }
    }

    pub(crate) fn set(&mut self, base: Base, value: Option<f64>) {
        match base {
            Base::A => self.a = value,
            Base::T => self.t = value,
            Base::G => self.g = value,
            Base::C => self.c = value,
        }
    }
}

/// Rounds half away from zero to `decimals` places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Fills the derived columns of a single row
pub fn extend_row(row: &mut Row) {
    row.paired = row.fw_seq.is_some() && row.rv_seq.is_some();
    row.fw_seq_length = row.fw_seq.as_deref().map_or(0, str::len);
    row.rv_seq_length = row.rv_seq.as_deref().map_or(0, str::len);
    row.fw_perc = Composition::from_sequence(row.fw_seq.as_deref());
    row.rv_perc = Composition::from_sequence(row.rv_seq.as_deref());
}

/// Computes pairing, lengths and nucleotide percentages for every row of the table
pub fn extend_table(table: &mut Table) {
    table.update_rows(extend_row);
    table.mark_extended();
    info!(
        "derived statistics for {} rows ({} paired)",
        table.len(),
        table.rows().iter().filter(|r| r.paired).count()
    );
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_counts_add_up_to_length() {
        for seq in ["ACGT", "NNNN", "acgtnyp", "AAAAAAAAAAGC", ""] {
            let counts = NucleotideCounts::from_sequence(seq);
            assert_eq!(counts.a + counts.t + counts.g + counts.c, seq.len() - counts.other);
            assert_eq!(counts.len(), seq.len());
        }
    }

    #[test]
    fn test_balanced_composition() {
        let comp = Composition::from_sequence(Some("ATGC"));
        for base in Base::ALL {
            assert_eq!(comp.get(base), Some(25.0));
        }
    }

    #[test]
    fn test_ambiguous_bases_count_in_denominator() {
        let comp = Composition::from_sequence(Some("AANN"));
        assert_eq!(comp.a, Some(50.0));
        assert_eq!(comp.t, Some(0.0));
    }

    #[test]
    fn test_case_insensitive() {
        let comp = Composition::from_sequence(Some("aTgC"));
        assert_eq!(comp.a, Some(25.0));
        assert_eq!(comp.g, Some(25.0));
    }

    #[test]
    fn test_rounding_to_four_decimals() {
        let comp = Composition::from_sequence(Some("AGG"));
        assert_eq!(comp.a, Some(33.3333));
        assert_eq!(comp.g, Some(66.6667));
    }

    #[test]
    fn test_empty_and_missing_sequences_are_null() {
        assert_eq!(Composition::from_sequence(Some("")), Composition::default());
        assert_eq!(Composition::from_sequence(None), Composition::default());
    }

    #[test]
    fn test_extend_row() {
        let mut row = Row::new("r1");
        row.fw_seq = Some("ATGCAT".to_string());
        extend_row(&mut row);
        assert!(!row.paired);
        assert_eq!(row.fw_seq_length, 6);
        assert_eq!(row.rv_seq_length, 0);
        assert_eq!(row.rv_perc, Composition::default());

        row.rv_seq = Some("GG".to_string());
        extend_row(&mut row);
        assert!(row.paired);
        assert_eq!(row.rv_seq_length, 2);
        assert_eq!(row.rv_perc.g, Some(100.0));
    }
}
