/// Custom Result type for pairflag operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the pairflag library, encompassing all possible error cases
/// that can occur while ingesting, flagging, scoring, storing or exporting a read table.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors that occur while parsing FASTQ chunks
    ParseError(#[from] ParseError),
    /// Errors raised by table column access and flagging
    TableError(#[from] TableError),
    /// Errors raised while reading or writing a persisted table
    StoreError(#[from] StoreError),
    /// Errors raised while scanning aligner output
    ScoreError(#[from] ScoreError),
    /// Errors raised by the TSV and FASTA exporters
    ExportError(#[from] ExportError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
    /// UTF-8 encoding/decoding errors
    Utf8Error(#[from] std::str::Utf8Error),
    /// Generic errors that can occur in any part of the system
    AnyhowError(#[from] anyhow::Error),
}

/// Errors that can occur while turning FASTQ bytes into records
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// The input path is not a regular file (e.g., it might be a directory or special file)
    #[error("File is not regular: {0}")]
    IncompatibleFile(String),

    /// A chunk range reaches past the end of the mapped file
    #[error("Chunk {start}..{end} is out of the file range ({len} bytes)")]
    OutOfRange { start: usize, end: usize, len: usize },

    /// The parsed lists do not line up into complete records
    ///
    /// # Arguments
    /// * `String` - Description of what is missing
    #[error("Fastq data is incomplete: {0}")]
    MissingData(String),

    /// A reverse strand sequence contains characters that cannot be complemented
    ///
    /// # Arguments
    /// * `String` - The offending sequence
    #[error("Non-DNA sequence cannot be reverse complemented: {0}")]
    NonDnaSequence(String),

    /// The same read id appeared twice on one strand
    #[error("Duplicate read id '{id}' on the {strand} strand")]
    DuplicateId { id: String, strand: &'static str },

    /// A chunk worker thread panicked before returning its result
    #[error("Chunk worker panicked while parsing chunk {0}")]
    WorkerPanicked(usize),
}

/// Errors raised by the flag/filter table
#[derive(thiserror::Error, Debug)]
pub enum TableError {
    /// The column exists in the schema but the table has not reached the stage that adds it
    ///
    /// # Arguments
    /// * `&'static str` - The column name
    #[error("Column '{0}' is not available at the current processing stage")]
    MissingColumn(&'static str),

    /// The column name is not part of the schema
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A numeric predicate was applied to a non-numeric column
    #[error("Column '{0}' is not numeric")]
    NotNumeric(&'static str),

    /// A row with the same read id is already in the table
    #[error("Table already holds a row with id '{0}'")]
    DuplicateRow(String),

    /// The named column is not one of the twelve flag columns
    #[error("Column '{0}' is not a flag column")]
    InvalidFlagTarget(String),
}

/// Errors specific to reading and writing persisted tables
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The magic number in the header does not match the expected value
    ///
    /// # Arguments
    /// * `u32` - The invalid magic number that was found
    #[error("Invalid magic number: {0}")]
    InvalidMagicNumber(u32),

    /// The format version in the header is not supported
    ///
    /// # Arguments
    /// * `u8` - The unsupported version number that was found
    #[error("Invalid format version: {0}")]
    InvalidFormatVersion(u8),

    /// The buffer is too small to contain a header
    ///
    /// # Arguments
    /// * First `usize` - The actual number of bytes provided
    /// * Second `usize` - The expected number of bytes
    #[error("Invalid number of bytes provided: {0}. Expected: {1}")]
    InvalidSize(usize, usize),

    /// The body holds a different number of rows than the header announced
    #[error("Stored table holds {found} rows but the header announced {expected}")]
    RowCountMismatch { expected: u64, found: u64 },

    /// Two stored rows share a read id
    #[error("Stored table holds read id '{0}' more than once")]
    DuplicateRow(String),

    /// A body line could not be decoded into a row
    ///
    /// # Arguments
    /// * `usize` - 1-based line number in the decompressed body
    /// * `String` - Reason
    #[error("Malformed stored row at line {0}: {1}")]
    MalformedRow(usize, String),
}

/// Errors that can occur while scanning aligner output
#[derive(thiserror::Error, Debug)]
pub enum ScoreError {
    /// A line does not follow the positional tab-delimited contract
    ///
    /// # Arguments
    /// * `usize` - 1-based line number
    /// * `String` - Reason
    #[error("Malformed alignment record at line {0}: {1}")]
    MalformedRecord(usize, String),

    /// The output ended on a forward mate without its reverse mate
    #[error("Alignment record at line {0} has no mate line")]
    UnpairedRecord(usize),
}

/// Errors raised by exporters
#[derive(thiserror::Error, Debug)]
pub enum ExportError {
    /// The output path already exists and will not be overwritten
    #[error("Output file already exists: {0}")]
    FileExists(String),
}
