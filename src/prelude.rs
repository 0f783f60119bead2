pub use crate::fastq::{FastqFile, ParsedChunk, SequenceRecord, Strand};
pub use crate::filter::FilterSettings;
pub use crate::identity::{score_file, IdentityScorer};
pub use crate::ingest::{IngestConfig, Ingestor};
pub use crate::stats::Base;
pub use crate::table::{Column, FlagColumn, FlagUpdate, Row, Table, TableView, Value};
