use std::fmt;

use super::column::{Column, FlagColumn};
use crate::stats::Composition;

/// A single cell value borrowed from a [`Row`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Int(u64),
    Float(f64),
    Text(&'a str),
}
impl<'a> Value<'a> {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value; `None` for null, boolean and text values
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Equality as used by the equality predicates
    ///
    /// Null never matches anything, itself included. Integers and floats are
    /// compared numerically.
    #[must_use]
    pub fn matches(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Self::Null, _) | (_, Value::Null) => false,
            (Self::Bool(a), Value::Bool(b)) => a == b,
            (Self::Text(a), Value::Text(b)) => a == b,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
                _ => false,
            },
        }
    }
}
impl From<bool> for Value<'_> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}
impl From<u64> for Value<'_> {
    fn from(value: u64) -> Self {
        Self::Int(value)
    }
}
impl From<f64> for Value<'_> {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
impl<'a> From<&'a str> for Value<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(value)
    }
}
impl From<Option<f64>> for Value<'_> {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Float)
    }
}
impl<'a> From<Option<&'a str>> for Value<'a> {
    fn from(value: Option<&'a str>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}
impl fmt::Display for Value<'_> {
    /// Null is written as an empty string
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Int(v) => write!(f, "{v}"),
            // integral floats keep their decimal point: 25.0, not 25
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One read pair of the table, keyed by its read id
///
/// Data fields are public; flag columns are only written through the flagging
/// operations of [`Table`](super::Table) so that `flagged` stays consistent with them.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,

    pub fw_seq: Option<String>,
    pub fw_seq_score: Option<String>,
    pub fw_seq_length: usize,
    pub fw_perc: Composition,

    pub rv_seq: Option<String>,
    pub rvc_seq: Option<String>,
    pub rv_seq_score: Option<String>,
    pub rv_seq_length: usize,
    pub rv_perc: Composition,

    pub paired: bool,
    pub overlap_identity_perc: Option<f64>,

    pub(crate) flags: [bool; 12],
    pub(crate) flagged: bool,
}
impl Row {
    /// An empty row with every flag cleared
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fw_seq: None,
            fw_seq_score: None,
            fw_seq_length: 0,
            fw_perc: Composition::default(),
            rv_seq: None,
            rvc_seq: None,
            rv_seq_score: None,
            rv_seq_length: 0,
            rv_perc: Composition::default(),
            paired: false,
            overlap_identity_perc: None,
            flags: [false; 12],
            flagged: false,
        }
    }

    /// Reads a cell without checking the table stage
    #[must_use]
    pub fn get(&self, column: Column) -> Value<'_> {
        match column {
            Column::FwSeq => self.fw_seq.as_deref().into(),
            Column::FwSeqScore => self.fw_seq_score.as_deref().into(),
            Column::FwSeqLength => Value::Int(self.fw_seq_length as u64),
            Column::FwPerc(base) => self.fw_perc.get(base).into(),
            Column::RvSeq => self.rv_seq.as_deref().into(),
            Column::RvcSeq => self.rvc_seq.as_deref().into(),
            Column::RvSeqScore => self.rv_seq_score.as_deref().into(),
            Column::RvSeqLength => Value::Int(self.rv_seq_length as u64),
            Column::RvPerc(base) => self.rv_perc.get(base).into(),
            Column::Paired => Value::Bool(self.paired),
            Column::OverlapIdentityPerc => self.overlap_identity_perc.into(),
            Column::Flag(flag) => Value::Bool(self.flag(flag)),
            Column::Flagged => Value::Bool(self.flagged),
        }
    }

    /// Whether the criterion `flag` rejects this row
    #[must_use]
    pub fn flag(&self, flag: FlagColumn) -> bool {
        self.flags[flag.index()]
    }

    /// The combined decision as of the last `flag_any`
    #[must_use]
    pub fn flagged(&self) -> bool {
        self.flagged
    }

    #[must_use]
    pub fn is_accepted(&self) -> bool {
        !self.flagged
    }
}
