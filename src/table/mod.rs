//! # table
//!
//! The flag/filter table.
//!
//! A [`Table`] holds one [`Row`] per read pair, keyed by read id. On top of the data
//! columns it owns twelve boolean flag columns ([`FlagColumn`]), one per filter criterion,
//! and a combined `flagged` column. A flag set to `true` means the criterion rejects the
//! row. Each flagging operation recomputes exactly one flag column, so criteria can be
//! applied, re-applied and relaxed in any order; [`Table::flag_any`] then folds them into
//! `flagged`.
//!
//! The available columns grow with the processing stage: a freshly joined table only
//! carries sequences and qualities, [`stats::extend_table`](crate::stats::extend_table)
//! adds lengths, nucleotide percentages and pairing, and the identity scorer adds
//! `overlap_identity_perc`. Reading a column the table has not reached yet is a
//! [`TableError::MissingColumn`].
//!
//! Every mutation bumps [`Table::version`] and returns a [`FlagUpdate`] describing it.
//!
//! ## Usage
//!
//! ```rust
//! use pairflag::table::{Column, FlagColumn, Row, Table};
//!
//! let mut table = Table::default();
//! for (id, len) in [("a", 3), ("b", 7), ("c", 12)] {
//!     let mut row = Row::new(id);
//!     row.fw_seq = Some("A".repeat(len));
//!     table.push(row).unwrap();
//! }
//! pairflag::stats::extend_table(&mut table);
//!
//! table
//!     .flag_between(Column::FwSeqLength, 5.0, 10.0, FlagColumn::FwSeqLen)
//!     .unwrap();
//! table.flag_any();
//! assert_eq!(table.accepted().ids(), vec!["b"]);
//! ```

mod column;
pub mod export;
mod row;
pub mod store;
mod view;

use std::collections::{HashMap, HashSet};

use log::debug;

pub use column::{Column, ColumnKind, FlagColumn, Stage};
pub use row::{Row, Value};
pub use view::{Projection, TableView};

use crate::error::{ParseError, Result, StoreError, TableError};
use crate::fastq::{SequenceRecord, Strand};

/// Description of a single table mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagUpdate {
    /// The column that was recomputed
    pub column: Column,
    /// Table version after the mutation
    pub version: u64,
    /// Number of rows whose value changed
    pub changed: usize,
    /// Number of rows where the column is now set (`true`, or non-null for scores)
    pub marked: usize,
}

/// Ordered read pairs unique by id, with their flag columns
#[derive(Debug, Clone, Default)]
pub struct Table {
    rows: Vec<Row>,
    index: HashMap<String, usize>,
    statistics: bool,
    identity: bool,
    version: u64,
}
impl Table {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the records of both mates on their read id
    ///
    /// Rows follow the forward file order; ids only present in the reverse file are
    /// appended afterwards in reverse file order. Fields of a missing mate stay `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::DuplicateId`] if an id appears twice in the same file.
    pub fn from_records(forward: Vec<SequenceRecord>, reverse: Vec<SequenceRecord>) -> Result<Self> {
        let mut table = Self::default();

        for record in forward {
            if table.index.contains_key(&record.id) {
                return Err(duplicate(record.id, Strand::Forward));
            }
            let mut row = Row::new(record.id);
            row.fw_seq = Some(record.sequence);
            row.fw_seq_score = Some(record.quality);
            table.insert(row);
        }

        let mut seen = HashSet::with_capacity(reverse.len());
        for record in reverse {
            if !seen.insert(record.id.clone()) {
                return Err(duplicate(record.id, Strand::Reverse));
            }
            let pos = match table.index.get(&record.id) {
                Some(&pos) => pos,
                None => table.insert(Row::new(record.id)),
            };
            let row = &mut table.rows[pos];
            row.rv_seq = Some(record.sequence);
            row.rv_seq_score = Some(record.quality);
            row.rvc_seq = record.complement;
        }

        debug!("joined {} read pairs", table.len());
        Ok(table)
    }

    /// Rebuilds a table from stored parts
    pub(crate) fn from_parts(
        rows: Vec<Row>,
        statistics: bool,
        identity: bool,
        version: u64,
    ) -> Result<Self> {
        let mut table = Self {
            rows: Vec::with_capacity(rows.len()),
            index: HashMap::with_capacity(rows.len()),
            statistics,
            identity,
            version,
        };
        for row in rows {
            if table.index.contains_key(&row.id) {
                return Err(StoreError::DuplicateRow(row.id).into());
            }
            table.insert(row);
        }
        Ok(table)
    }

    fn insert(&mut self, row: Row) -> usize {
        let pos = self.rows.len();
        self.index.insert(row.id.clone(), pos);
        self.rows.push(row);
        pos
    }

    /// Appends a row
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateRow`] if a row with the same id already exists.
    pub fn push(&mut self, row: Row) -> Result<()> {
        if self.index.contains_key(&row.id) {
            return Err(TableError::DuplicateRow(row.id).into());
        }
        self.insert(row);
        self.version += 1;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Row> {
        self.index.get(id).map(|&pos| &self.rows[pos])
    }

    /// Monotonic mutation counter
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn has_statistics(&self) -> bool {
        self.statistics
    }

    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.identity
    }

    /// The furthest processing stage the table has reached
    #[must_use]
    pub fn stage(&self) -> Stage {
        if self.identity {
            Stage::Scored
        } else if self.statistics {
            Stage::Extended
        } else {
            Stage::Ingested
        }
    }

    /// Whether the table carries `column` at its current stage
    #[must_use]
    pub fn has_column(&self, column: Column) -> bool {
        match column.stage() {
            Stage::Ingested => true,
            Stage::Extended => self.statistics,
            Stage::Scored => self.identity,
        }
    }

    /// Columns the table currently carries, in schema order
    #[must_use]
    pub fn columns(&self) -> Vec<Column> {
        Column::all()
            .into_iter()
            .filter(|&c| self.has_column(c))
            .collect()
    }

    fn require(&self, column: Column) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(TableError::MissingColumn(column.name()).into())
        }
    }

    fn require_numeric(&self, column: Column) -> Result<()> {
        self.require(column)?;
        if column.is_numeric() {
            Ok(())
        } else {
            Err(TableError::NotNumeric(column.name()).into())
        }
    }

    /// Every value of a column in row order
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MissingColumn`] if the table has not reached the stage that
    /// adds the column.
    pub fn column_values(&self, column: Column) -> Result<Vec<Value<'_>>> {
        self.require(column)?;
        Ok(self.rows.iter().map(|row| row.get(column)).collect())
    }

    /// Applies `update` to every row
    pub(crate) fn update_rows<F: FnMut(&mut Row)>(&mut self, update: F) {
        self.rows.iter_mut().for_each(update);
        self.version += 1;
    }

    /// Records that the derived statistics columns are filled
    pub(crate) fn mark_extended(&mut self) {
        self.statistics = true;
        self.version += 1;
    }

    /// Recomputes one flag column from a per-row rejection predicate
    fn set_flag<F: Fn(&Row) -> bool>(&mut self, target: FlagColumn, reject: F) -> FlagUpdate {
        let mut changed = 0;
        let mut marked = 0;
        for row in &mut self.rows {
            let flag = reject(&*row);
            let slot = &mut row.flags[target.index()];
            if *slot != flag {
                changed += 1;
            }
            *slot = flag;
            marked += usize::from(flag);
        }
        self.version += 1;
        debug!("{target}: {marked} of {} rows rejected", self.rows.len());
        FlagUpdate {
            column: Column::Flag(target),
            version: self.version,
            changed,
            marked,
        }
    }

    /// Rejects rows whose `source` value is outside `[lo, hi]` or null
    ///
    /// # Arguments
    ///
    /// * `source` - A numeric column
    /// * `lo` - Inclusive lower bound
    /// * `hi` - Inclusive upper bound
    /// * `target` - The flag column to recompute
    ///
    /// # Errors
    ///
    /// Returns an error if `source` is missing at the current stage or not numeric.
    pub fn flag_between(
        &mut self,
        source: Column,
        lo: f64,
        hi: f64,
        target: FlagColumn,
    ) -> Result<FlagUpdate> {
        self.require_numeric(source)?;
        Ok(self.set_flag(target, |row| {
            row.get(source).as_f64().is_none_or(|v| v < lo || v > hi)
        }))
    }

    /// Rejects rows whose `source` value is below `threshold` or null
    pub fn flag_greater_than(
        &mut self,
        source: Column,
        threshold: f64,
        target: FlagColumn,
    ) -> Result<FlagUpdate> {
        self.require_numeric(source)?;
        Ok(self.set_flag(target, |row| {
            row.get(source).as_f64().is_none_or(|v| v < threshold)
        }))
    }

    /// Rejects rows whose `source` value is above `threshold` or null
    pub fn flag_smaller_than(
        &mut self,
        source: Column,
        threshold: f64,
        target: FlagColumn,
    ) -> Result<FlagUpdate> {
        self.require_numeric(source)?;
        Ok(self.set_flag(target, |row| {
            row.get(source).as_f64().is_none_or(|v| v > threshold)
        }))
    }

    /// Rejects rows whose `source` value does not equal `expected`
    ///
    /// A null value never equals anything and is always rejected.
    pub fn flag_equals(
        &mut self,
        source: Column,
        expected: Value<'_>,
        target: FlagColumn,
    ) -> Result<FlagUpdate> {
        self.require(source)?;
        Ok(self.set_flag(target, |row| !row.get(source).matches(&expected)))
    }

    /// Clears one flag column so that its criterion rejects nothing
    pub fn clear_flag(&mut self, target: FlagColumn) -> FlagUpdate {
        self.set_flag(target, |_| false)
    }

    /// Recomputes `flagged` as the OR of all twelve flag columns
    pub fn flag_any(&mut self) -> FlagUpdate {
        let mut changed = 0;
        let mut marked = 0;
        for row in &mut self.rows {
            let flagged = row.flags.iter().any(|&f| f);
            if row.flagged != flagged {
                changed += 1;
            }
            row.flagged = flagged;
            marked += usize::from(flagged);
        }
        self.version += 1;
        debug!("flagged {marked} of {} rows", self.rows.len());
        FlagUpdate {
            column: Column::Flagged,
            version: self.version,
            changed,
            marked,
        }
    }

    /// Left joins identity scores onto the table by read id
    ///
    /// Rows without a score get a null `overlap_identity_perc`.
    pub fn set_identity_scores(&mut self, scores: &HashMap<String, f64>) -> FlagUpdate {
        let mut changed = 0;
        let mut marked = 0;
        for row in &mut self.rows {
            let score = scores.get(&row.id).copied();
            if row.overlap_identity_perc != score {
                changed += 1;
            }
            row.overlap_identity_perc = score;
            marked += usize::from(score.is_some());
        }
        self.identity = true;
        self.version += 1;
        FlagUpdate {
            column: Column::OverlapIdentityPerc,
            version: self.version,
            changed,
            marked,
        }
    }

    fn select<F: Fn(&Row) -> bool>(&self, keep: F) -> TableView<'_> {
        let indices = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| keep(row))
            .map(|(i, _)| i)
            .collect();
        TableView::new(self, indices)
    }

    /// Rows where every column in `columns` equals `value`
    ///
    /// # Errors
    ///
    /// Returns an error if any column is missing at the current stage.
    pub fn filter_equals(&self, value: Value<'_>, columns: &[Column]) -> Result<TableView<'_>> {
        for &column in columns {
            self.require(column)?;
        }
        Ok(self.select(|row| columns.iter().all(|&c| row.get(c).matches(&value))))
    }

    /// Rows where every column in `columns` lies within `[lo, hi]`
    pub fn filter_between(&self, lo: f64, hi: f64, columns: &[Column]) -> Result<TableView<'_>> {
        self.filter_numeric(columns, |v| v >= lo && v <= hi)
    }

    /// Rows where every column in `columns` is strictly greater than `value`
    pub fn filter_greater_than(&self, value: f64, columns: &[Column]) -> Result<TableView<'_>> {
        self.filter_numeric(columns, |v| v > value)
    }

    /// Rows where every column in `columns` is strictly smaller than `value`
    pub fn filter_smaller_than(&self, value: f64, columns: &[Column]) -> Result<TableView<'_>> {
        self.filter_numeric(columns, |v| v < value)
    }

    fn filter_numeric<F: Fn(f64) -> bool>(
        &self,
        columns: &[Column],
        keep: F,
    ) -> Result<TableView<'_>> {
        for &column in columns {
            self.require_numeric(column)?;
        }
        Ok(self.select(|row| {
            columns
                .iter()
                .all(|&c| row.get(c).as_f64().is_some_and(&keep))
        }))
    }

    /// Rows not rejected as of the last [`Table::flag_any`]
    #[must_use]
    pub fn accepted(&self) -> TableView<'_> {
        self.select(Row::is_accepted)
    }

    /// A view of selected columns over every row
    ///
    /// # Errors
    ///
    /// Returns an error if any column is missing at the current stage.
    pub fn project(&self, columns: &[Column]) -> Result<Projection<'_>> {
        for &column in columns {
            self.require(column)?;
        }
        Ok(Projection::new(columns.to_vec(), &self.rows))
    }
}

fn duplicate(id: String, strand: Strand) -> crate::Error {
    ParseError::DuplicateId {
        id,
        strand: strand.name(),
    }
    .into()
}
