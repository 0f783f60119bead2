//! Criteria bundle applied to a table in one call
//!
//! [`FilterSettings`] groups the thresholds of every criterion (sequence length,
//! nucleotide composition, pairing and overlap identity) with the defaults used when a
//! criterion is left open. Each `apply_*` method recomputes the flag columns of one
//! criterion; [`FilterSettings::apply`] runs all of them and then folds the flags into
//! `flagged`.

use std::fmt;

use log::info;

use crate::error::Result;
use crate::stats::Base;
use crate::table::{Column, FlagColumn, FlagUpdate, Table, Value};

/// Default lower sequence length bound
pub const DEFAULT_MIN_LENGTH: usize = 0;

/// Default upper sequence length bound
pub const DEFAULT_MAX_LENGTH: usize = 10_000;

/// Default lower nucleotide percentage bound
pub const DEFAULT_MIN_PERC: f64 = 0.0;

/// Default upper nucleotide percentage bound
pub const DEFAULT_MAX_PERC: f64 = 100.0;

/// Inclusive bounds on the share of one nucleotide, in percent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentBounds {
    pub min: f64,
    pub max: f64,
}
impl Default for PercentBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_PERC,
            max: DEFAULT_MAX_PERC,
        }
    }
}

/// Thresholds of every filter criterion
///
/// Length and nucleotide bounds apply to both mates. With `require_paired` set, reads
/// missing a mate are rejected; unset, the pairing criterion rejects nothing.
/// Identity is only applied once the table carries identity scores.
///
/// # Examples
///
/// ```rust
/// use pairflag::filter::FilterSettings;
/// use pairflag::stats::Base;
///
/// let settings = FilterSettings::default()
///     .with_lengths(50, 300)
///     .with_nucleotide(Base::G, 10.0, 40.0)
///     .with_min_identity(90.0);
/// assert_eq!(settings.nucleotide(Base::G).max, 40.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSettings {
    pub min_length: usize,
    pub max_length: usize,
    pub nucleotides: [PercentBounds; 4],
    pub require_paired: bool,
    pub min_identity: f64,
}
impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            nucleotides: [PercentBounds::default(); 4],
            require_paired: true,
            min_identity: 0.0,
        }
    }
}
impl FilterSettings {
    #[must_use]
    pub fn with_lengths(mut self, min: usize, max: usize) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    #[must_use]
    pub fn with_nucleotide(mut self, base: Base, min: f64, max: f64) -> Self {
        self.nucleotides[base_index(base)] = PercentBounds { min, max };
        self
    }

    #[must_use]
    pub fn with_require_paired(mut self, require_paired: bool) -> Self {
        self.require_paired = require_paired;
        self
    }

    #[must_use]
    pub fn with_min_identity(mut self, min_identity: f64) -> Self {
        self.min_identity = min_identity;
        self
    }

    #[must_use]
    pub fn nucleotide(&self, base: Base) -> PercentBounds {
        self.nucleotides[base_index(base)]
    }

    /// Flags reads of either mate whose length lies outside the length bounds
    pub fn apply_lengths(&self, table: &mut Table) -> Result<Vec<FlagUpdate>> {
        let (lo, hi) = (self.min_length as f64, self.max_length as f64);
        Ok(vec![
            table.flag_between(Column::FwSeqLength, lo, hi, FlagColumn::FwSeqLen)?,
            table.flag_between(Column::RvSeqLength, lo, hi, FlagColumn::RvSeqLen)?,
        ])
    }

    /// Flags reads of either mate whose nucleotide shares lie outside their bounds
    pub fn apply_nucleotides(&self, table: &mut Table) -> Result<Vec<FlagUpdate>> {
        let mut updates = Vec::with_capacity(8);
        for base in Base::ALL {
            let PercentBounds { min, max } = self.nucleotide(base);
            updates.push(table.flag_between(
                Column::FwPerc(base),
                min,
                max,
                FlagColumn::forward_base(base),
            )?);
            updates.push(table.flag_between(
                Column::RvPerc(base),
                min,
                max,
                FlagColumn::reverse_base(base),
            )?);
        }
        Ok(updates)
    }

    /// Flags unpaired reads, or clears the pairing criterion when pairing is not required
    pub fn apply_pairing(&self, table: &mut Table) -> Result<FlagUpdate> {
        if self.require_paired {
            table.flag_equals(Column::Paired, Value::Bool(true), FlagColumn::Paired)
        } else {
            Ok(table.clear_flag(FlagColumn::Paired))
        }
    }

    /// Flags reads whose overlap identity is below the minimum or unknown
    pub fn apply_identity(&self, table: &mut Table) -> Result<FlagUpdate> {
        table.flag_greater_than(
            Column::OverlapIdentityPerc,
            self.min_identity,
            FlagColumn::Identity,
        )
    }

    /// Applies every criterion and recomputes `flagged`
    ///
    /// The identity criterion is skipped for tables that have not been scored.
    pub fn apply(&self, table: &mut Table) -> Result<FlagUpdate> {
        self.apply_lengths(table)?;
        self.apply_nucleotides(table)?;
        self.apply_pairing(table)?;
        if table.has_identity() {
            self.apply_identity(table)?;
        }
        let update = table.flag_any();
        info!(
            "{} of {} reads accepted",
            table.len() - update.marked,
            table.len()
        );
        Ok(update)
    }

    /// The commented lines written above an exported table
    #[must_use]
    pub fn preamble(&self) -> String {
        format!("#{self}\n#column flagged; True means it's filtered, False means it's a good sequence\n")
    }
}
impl fmt::Display for FilterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min_seq_len:{} | max_seq_len:{} | filter_paired:{}",
            self.min_length,
            self.max_length,
            if self.require_paired { "True" } else { "False" }
        )?;
        for base in Base::ALL {
            let bounds = self.nucleotide(base);
            let letter = base.letter();
            write!(
                f,
                " | min_{letter}_perc:{} | max_{letter}_perc:{}",
                bounds.min, bounds.max
            )?;
        }
        write!(f, " | paired_read_percentages:{}", self.min_identity)
    }
}

fn base_index(base: Base) -> usize {
    match base {
        Base::A => 0,
        Base::T => 1,
        Base::G => 2,
        Base::C => 3,
    }
}

#[cfg(test)]
mod testing {
    use std::collections::HashMap;

    use super::*;
    use crate::table::Row;

    fn table() -> Table {
        let mut table = Table::new();
        for (id, fw, rv) in [
            ("short", Some("ACG"), Some("ACG")),
            ("good", Some("ACGTACGT"), Some("ACGTACGT")),
            ("gc_rich", Some("GGGGCCCC"), Some("ACGTACGT")),
            ("single", Some("ACGTACGT"), None),
        ] {
            let mut row = Row::new(id);
            row.fw_seq = fw.map(str::to_string);
            row.rv_seq = rv.map(str::to_string);
            table.push(row).unwrap();
        }
        crate::stats::extend_table(&mut table);
        table
    }

    #[test]
    fn test_defaults_keep_paired_reads() {
        let mut table = table();
        FilterSettings::default().apply(&mut table).unwrap();
        assert_eq!(table.accepted().ids(), vec!["short", "good", "gc_rich"]);
    }

    #[test]
    fn test_every_criterion() {
        let mut table = table();
        let settings = FilterSettings::default()
            .with_lengths(5, 100)
            .with_nucleotide(Base::G, 0.0, 40.0);
        let update = settings.apply(&mut table).unwrap();
        assert_eq!(table.accepted().ids(), vec!["good"]);
        assert_eq!(update.marked, 3);
    }

    #[test]
    fn test_pairing_can_be_relaxed() {
        let mut table = table();
        FilterSettings::default().apply(&mut table).unwrap();
        assert!(!table.accepted().contains("single"));

        FilterSettings::default()
            .with_require_paired(false)
            .apply_pairing(&mut table)
            .unwrap();
        assert!(!table.get("single").unwrap().flag(FlagColumn::Paired));
        // the missing reverse mate still fails the nucleotide bounds
        table.flag_any();
        assert!(!table.accepted().contains("single"));
    }

    #[test]
    fn test_identity_applied_once_scored() {
        let mut table = table();
        let settings = FilterSettings::default().with_min_identity(90.0);
        settings.apply(&mut table).unwrap();
        assert_eq!(table.accepted().len(), 3);

        let scores = HashMap::from([("good".to_string(), 95.0), ("short".to_string(), 50.0)]);
        table.set_identity_scores(&scores);
        settings.apply(&mut table).unwrap();
        assert_eq!(table.accepted().ids(), vec!["good"]);
    }

    #[test]
    fn test_preamble() {
        let preamble = FilterSettings::default().preamble();
        assert!(preamble.starts_with(
            "#min_seq_len:0 | max_seq_len:10000 | filter_paired:True | min_A_perc:0 | max_A_perc:100"
        ));
        assert!(preamble.contains("| paired_read_percentages:0\n#column flagged;"));
        assert!(preamble.ends_with("good sequence\n"));
    }
}
