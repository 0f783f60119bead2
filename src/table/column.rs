use std::fmt;
use std::str::FromStr;

use crate::error::{Error, TableError};
use crate::stats::Base;

/// Processing stage that adds a column to a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Sequences, qualities, complements and every flag column
    Ingested,
    /// Lengths, nucleotide percentages and pairing
    Extended,
    /// Overlap identity of mate pairs
    Scored,
}

/// Value type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Boolean,
}

/// The twelve independent filter criteria, one boolean column each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagColumn {
    Paired,
    FwAPerc,
    FwTPerc,
    FwGPerc,
    FwCPerc,
    RvAPerc,
    RvTPerc,
    RvGPerc,
    RvCPerc,
    FwSeqLen,
    RvSeqLen,
    Identity,
}
impl FlagColumn {
    pub const ALL: [FlagColumn; 12] = [
        FlagColumn::Paired,
        FlagColumn::FwAPerc,
        FlagColumn::FwTPerc,
        FlagColumn::FwGPerc,
        FlagColumn::FwCPerc,
        FlagColumn::RvAPerc,
        FlagColumn::RvTPerc,
        FlagColumn::RvGPerc,
        FlagColumn::RvCPerc,
        FlagColumn::FwSeqLen,
        FlagColumn::RvSeqLen,
        FlagColumn::Identity,
    ];

    /// Position of the flag in a row's flag array
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Paired => "paired_flag",
            Self::FwAPerc => "fw_a_perc_flag",
            Self::FwTPerc => "fw_t_perc_flag",
            Self::FwGPerc => "fw_g_perc_flag",
            Self::FwCPerc => "fw_c_perc_flag",
            Self::RvAPerc => "rv_a_perc_flag",
            Self::RvTPerc => "rv_t_perc_flag",
            Self::RvGPerc => "rv_g_perc_flag",
            Self::RvCPerc => "rv_c_perc_flag",
            Self::FwSeqLen => "fw_seq_len_flag",
            Self::RvSeqLen => "rv_seq_len_flag",
            Self::Identity => "identity_flag",
        }
    }

    /// The data column this criterion is normally computed from
    #[must_use]
    pub fn criterion(self) -> Column {
        match self {
            Self::Paired => Column::Paired,
            Self::FwAPerc => Column::FwPerc(Base::A),
            Self::FwTPerc => Column::FwPerc(Base::T),
            Self::FwGPerc => Column::FwPerc(Base::G),
            Self::FwCPerc => Column::FwPerc(Base::C),
            Self::RvAPerc => Column::RvPerc(Base::A),
            Self::RvTPerc => Column::RvPerc(Base::T),
            Self::RvGPerc => Column::RvPerc(Base::G),
            Self::RvCPerc => Column::RvPerc(Base::C),
            Self::FwSeqLen => Column::FwSeqLength,
            Self::RvSeqLen => Column::RvSeqLength,
            Self::Identity => Column::OverlapIdentityPerc,
        }
    }

    /// Flag column of the forward nucleotide criterion for `base`
    #[must_use]
    pub fn forward_base(base: Base) -> Self {
        match base {
            Base::A => Self::FwAPerc,
            Base::T => Self::FwTPerc,
            Base::G => Self::FwGPerc,
            Base::C => Self::FwCPerc,
        }
    }

    /// Flag column of the reverse nucleotide criterion for `base`
    #[must_use]
    pub fn reverse_base(base: Base) -> Self {
        match base {
            Base::A => Self::RvAPerc,
            Base::T => Self::RvTPerc,
            Base::G => Self::RvGPerc,
            Base::C => Self::RvCPerc,
        }
    }
}
impl fmt::Display for FlagColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
impl FromStr for FlagColumn {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|flag| flag.name() == s)
            .ok_or_else(|| TableError::InvalidFlagTarget(s.to_string()).into())
    }
}

/// A column of the read table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    FwSeq,
    FwSeqScore,
    FwSeqLength,
    FwPerc(Base),
    RvSeq,
    RvcSeq,
    RvSeqScore,
    RvSeqLength,
    RvPerc(Base),
    Paired,
    OverlapIdentityPerc,
    Flag(FlagColumn),
    Flagged,
}
impl Column {
    /// Every data (non-flag) column in schema order
    pub const DATA: [Column; 17] = [
        Column::FwSeq,
        Column::FwSeqScore,
        Column::FwSeqLength,
        Column::FwPerc(Base::A),
        Column::FwPerc(Base::T),
        Column::FwPerc(Base::G),
        Column::FwPerc(Base::C),
        Column::RvSeq,
        Column::RvcSeq,
        Column::RvSeqScore,
        Column::RvSeqLength,
        Column::RvPerc(Base::A),
        Column::RvPerc(Base::T),
        Column::RvPerc(Base::G),
        Column::RvPerc(Base::C),
        Column::Paired,
        Column::OverlapIdentityPerc,
    ];

    /// Every column of the schema: data columns, the twelve flags, then `flagged`
    #[must_use]
    pub fn all() -> Vec<Column> {
        Self::DATA
            .into_iter()
            .chain(FlagColumn::ALL.into_iter().map(Column::Flag))
            .chain(std::iter::once(Column::Flagged))
            .collect()
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::FwSeq => "fw_seq",
            Self::FwSeqScore => "fw_seq_score",
            Self::FwSeqLength => "fw_seq_length",
            Self::FwPerc(Base::A) => "fw_A_perc",
            Self::FwPerc(Base::T) => "fw_T_perc",
            Self::FwPerc(Base::G) => "fw_G_perc",
            Self::FwPerc(Base::C) => "fw_C_perc",
            Self::RvSeq => "rv_seq",
            Self::RvcSeq => "rvc_seq",
            Self::RvSeqScore => "rv_seq_score",
            Self::RvSeqLength => "rv_seq_length",
            Self::RvPerc(Base::A) => "rv_A_perc",
            Self::RvPerc(Base::T) => "rv_T_perc",
            Self::RvPerc(Base::G) => "rv_G_perc",
            Self::RvPerc(Base::C) => "rv_C_perc",
            Self::Paired => "paired",
            Self::OverlapIdentityPerc => "overlap_identity_perc",
            Self::Flag(flag) => flag.name(),
            Self::Flagged => "flagged",
        }
    }

    #[must_use]
    pub fn kind(self) -> ColumnKind {
        match self {
            Self::FwSeq | Self::FwSeqScore | Self::RvSeq | Self::RvcSeq | Self::RvSeqScore => {
                ColumnKind::Text
            }
            Self::FwSeqLength | Self::RvSeqLength => ColumnKind::Integer,
            Self::FwPerc(_) | Self::RvPerc(_) | Self::OverlapIdentityPerc => ColumnKind::Float,
            Self::Paired | Self::Flag(_) | Self::Flagged => ColumnKind::Boolean,
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self.kind(), ColumnKind::Integer | ColumnKind::Float)
    }

    #[must_use]
    pub fn is_flag(self) -> bool {
        matches!(self, Self::Flag(_))
    }

    /// The stage at which the column becomes available
    #[must_use]
    pub fn stage(self) -> Stage {
        match self {
            Self::FwSeqLength
            | Self::RvSeqLength
            | Self::FwPerc(_)
            | Self::RvPerc(_)
            | Self::Paired => Stage::Extended,
            Self::OverlapIdentityPerc => Stage::Scored,
            _ => Stage::Ingested,
        }
    }
}
impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
impl FromStr for Column {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|column| column.name() == s)
            .ok_or_else(|| TableError::UnknownColumn(s.to_string()).into())
    }
}
