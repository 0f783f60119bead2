//! On-disk container for a [`Table`]
//!
//! A stored table is a fixed 32-byte little-endian [`TableHeader`] followed by a single
//! checksummed zstd frame. The frame decompresses to tab-separated text: one header line
//! naming `id` and every schema column, then one line per row. Missing values are empty
//! fields, booleans are `0`/`1`, and tabs or backslashes inside text are escaped.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info};
use zstd::{Decoder, Encoder};

use super::column::{Column, ColumnKind};
use super::{Row, Table, Value};
use crate::error::{Result, StoreError};

/// Current magic number: "PFTB" in ASCII (in little-endian byte order)
#[allow(clippy::unreadable_literal)]
const MAGIC: u32 = 0x42544650;

/// Current format version of the stored table
const FORMAT: u8 = 1;

/// Size of the header in bytes
pub const SIZE_HEADER: usize = 32;

/// Reserved bytes in the header
pub const RESERVED: [u8; 10] = [42; 10];

/// Compression level of the body
const LEVEL: i32 = 3;

/// Stage bit: derived statistics are filled
const STAGE_STATISTICS: u8 = 1;

/// Stage bit: identity scores are joined
const STAGE_IDENTITY: u8 = 1 << 1;

/// Header of a stored table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    /// Magic number to identify the file format
    ///
    /// 4 bytes
    pub magic: u32,

    /// Version of the file format
    ///
    /// 1 byte
    pub format: u8,

    /// Processing stage bits of the table
    ///
    /// 1 byte
    pub stage: u8,

    /// Number of rows in the body
    ///
    /// 8 bytes
    pub rows: u64,

    /// Mutation counter of the table at the time it was saved
    ///
    /// 8 bytes
    pub version: u64,

    /// Reserve remaining bytes for future use
    ///
    /// 10 bytes
    pub reserved: [u8; 10],
}
impl TableHeader {
    /// Creates the header describing `table`
    #[must_use]
    pub fn new(table: &Table) -> Self {
        let mut stage = 0;
        if table.has_statistics() {
            stage |= STAGE_STATISTICS;
        }
        if table.has_identity() {
            stage |= STAGE_IDENTITY;
        }
        Self {
            magic: MAGIC,
            format: FORMAT,
            stage,
            rows: table.len() as u64,
            version: table.version(),
            reserved: RESERVED,
        }
    }

    #[must_use]
    pub fn has_statistics(&self) -> bool {
        self.stage & STAGE_STATISTICS != 0
    }

    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.stage & STAGE_IDENTITY != 0
    }

    /// Parses a header from a fixed-size byte array
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic number is incorrect
    /// * The format version is unsupported
    pub fn from_bytes(buffer: &[u8; SIZE_HEADER]) -> Result<Self> {
        let magic = LittleEndian::read_u32(&buffer[0..4]);
        if magic != MAGIC {
            return Err(StoreError::InvalidMagicNumber(magic).into());
        }
        let format = buffer[4];
        if format != FORMAT {
            return Err(StoreError::InvalidFormatVersion(format).into());
        }
        let stage = buffer[5];
        let rows = LittleEndian::read_u64(&buffer[6..14]);
        let version = LittleEndian::read_u64(&buffer[14..22]);
        let mut reserved = [0u8; 10];
        reserved.copy_from_slice(&buffer[22..32]);
        Ok(Self {
            magic,
            format,
            stage,
            rows,
            version,
            reserved,
        })
    }

    /// Parses a header from the start of an arbitrarily sized buffer
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is smaller than [`SIZE_HEADER`] or the header is
    /// invalid (see [`TableHeader::from_bytes`]).
    pub fn from_buffer(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < SIZE_HEADER {
            return Err(StoreError::InvalidSize(buffer.len(), SIZE_HEADER).into());
        }
        let mut bytes = [0u8; SIZE_HEADER];
        bytes.copy_from_slice(&buffer[..SIZE_HEADER]);
        Self::from_bytes(&bytes)
    }

    /// Writes the header to a writer
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_HEADER];
        LittleEndian::write_u32(&mut buffer[0..4], self.magic);
        buffer[4] = self.format;
        buffer[5] = self.stage;
        LittleEndian::write_u64(&mut buffer[6..14], self.rows);
        LittleEndian::write_u64(&mut buffer[14..22], self.version);
        buffer[22..32].copy_from_slice(&self.reserved);
        writer.write_all(&buffer)?;
        Ok(())
    }

    /// Reads exactly [`SIZE_HEADER`] bytes from a reader and parses them
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_HEADER];
        let mut filled = 0;
        while filled < SIZE_HEADER {
            match reader.read(&mut buffer[filled..])? {
                0 => return Err(StoreError::InvalidSize(filled, SIZE_HEADER).into()),
                n => filled += n,
            }
        }
        Self::from_bytes(&buffer)
    }
}

impl Table {
    /// Writes the table to `path`, replacing any existing file
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use pairflag::table::Table;
    ///
    /// let table = Table::load("reads.pft").unwrap();
    /// table.save("reads.copy.pft").unwrap();
    /// ```
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = File::create(path).map(BufWriter::new)?;
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(
            "saved {} rows (version {}) to {}",
            self.len(),
            self.version(),
            path.display()
        );
        Ok(())
    }

    /// Reads a table written by [`Table::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = File::open(path).map(BufReader::new)?;
        let table = Self::read_from(&mut reader)?;
        info!(
            "loaded {} rows (version {}) from {}",
            table.len(),
            table.version(),
            path.display()
        );
        Ok(table)
    }

    /// Serializes the header and the compressed body to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        TableHeader::new(self).write_bytes(writer)?;

        let mut encoder = Encoder::new(writer, LEVEL)?;
        encoder.include_checksum(true)?;
        encoder.multithread(num_cpus::get() as u32)?;

        let columns = Column::all();
        let mut line = String::new();
        line.push_str("id");
        for column in &columns {
            line.push('\t');
            line.push_str(column.name());
        }
        line.push('\n');
        encoder.write_all(line.as_bytes())?;

        let mut ibuf = itoa::Buffer::new();
        for row in self.rows() {
            line.clear();
            escape_into(&row.id, &mut line);
            for &column in &columns {
                line.push('\t');
                encode_field(row, column, &mut line, &mut ibuf);
            }
            line.push('\n');
            encoder.write_all(line.as_bytes())?;
        }
        encoder.finish()?;
        Ok(())
    }

    /// Deserializes a table from a reader positioned at the header
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let header = TableHeader::from_reader(reader)?;
        let body = {
            let mut body = String::new();
            let mut decoder = Decoder::new(reader)?;
            decoder.read_to_string(&mut body)?;
            body
        };

        let columns = Column::all();
        let mut lines = body.lines();
        let expected: Vec<&str> = std::iter::once("id")
            .chain(columns.iter().map(|c| c.name()))
            .collect();
        match lines.next() {
            Some(names) if names.split('\t').eq(expected.iter().copied()) => {}
            _ => return Err(StoreError::MalformedRow(1, "unexpected column header".into()).into()),
        }

        // the announced row count is untrusted until the body has been decoded
        let mut rows = Vec::new();
        for (i, line) in lines.enumerate() {
            // line 1 is the column header
            rows.push(decode_row(line, &columns, i + 2)?);
        }
        if rows.len() as u64 != header.rows {
            return Err(StoreError::RowCountMismatch {
                expected: header.rows,
                found: rows.len() as u64,
            }
            .into());
        }

        debug!("decoded {} stored rows", rows.len());
        Table::from_parts(
            rows,
            header.has_statistics(),
            header.has_identity(),
            header.version,
        )
    }
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
}

fn unescape(text: &str) -> String {
    if !text.contains('\\') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn encode_field(row: &Row, column: Column, out: &mut String, ibuf: &mut itoa::Buffer) {
    match row.get(column) {
        Value::Null => {}
        Value::Bool(b) => out.push(if b { '1' } else { '0' }),
        Value::Int(v) => out.push_str(ibuf.format(v)),
        Value::Float(v) => out.push_str(&v.to_string()),
        Value::Text(s) => escape_into(s, out),
    }
}

fn decode_row(line: &str, columns: &[Column], lineno: usize) -> Result<Row> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != columns.len() + 1 {
        return Err(StoreError::MalformedRow(
            lineno,
            format!("expected {} fields, found {}", columns.len() + 1, fields.len()),
        )
        .into());
    }

    let malformed = |column: Column, field: &str| -> crate::Error {
        StoreError::MalformedRow(lineno, format!("invalid {} value '{field}'", column.name())).into()
    };

    let mut row = Row::new(unescape(fields[0]));
    for (&column, &field) in columns.iter().zip(&fields[1..]) {
        match column.kind() {
            ColumnKind::Text => {
                let text = (!field.is_empty()).then(|| unescape(field));
                match column {
                    Column::FwSeq => row.fw_seq = text,
                    Column::FwSeqScore => row.fw_seq_score = text,
                    Column::RvSeq => row.rv_seq = text,
                    Column::RvcSeq => row.rvc_seq = text,
                    Column::RvSeqScore => row.rv_seq_score = text,
                    _ => unreachable!("text columns are listed above"),
                }
            }
            ColumnKind::Integer => {
                let value: usize = field.parse().map_err(|_| malformed(column, field))?;
                match column {
                    Column::FwSeqLength => row.fw_seq_length = value,
                    Column::RvSeqLength => row.rv_seq_length = value,
                    _ => unreachable!("integer columns are listed above"),
                }
            }
            ColumnKind::Float => {
                let value = if field.is_empty() {
                    None
                } else {
                    Some(field.parse::<f64>().map_err(|_| malformed(column, field))?)
                };
                match column {
                    Column::FwPerc(base) => row.fw_perc.set(base, value),
                    Column::RvPerc(base) => row.rv_perc.set(base, value),
                    Column::OverlapIdentityPerc => row.overlap_identity_perc = value,
                    _ => unreachable!("float columns are listed above"),
                }
            }
            ColumnKind::Boolean => {
                let value = match field {
                    "1" => true,
                    "0" => false,
                    _ => return Err(malformed(column, field)),
                };
                match column {
                    Column::Paired => row.paired = value,
                    Column::Flag(flag) => row.flags[flag.index()] = value,
                    Column::Flagged => row.flagged = value,
                    _ => unreachable!("boolean columns are listed above"),
                }
            }
        }
    }
    Ok(row)
}
