//! Text exports of a table
//!
//! Both exporters refuse to replace an existing file and fail with
//! [`ExportError::FileExists`] instead.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::info;

use super::{Column, Table};
use crate::error::{ExportError, Result};
use crate::filter::FilterSettings;

/// Creates `path` for writing, failing if it already exists
fn create_new(path: &Path) -> Result<BufWriter<File>> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(BufWriter::new(file)),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            Err(ExportError::FileExists(path.display().to_string()).into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Columns written by the TSV export: every carried column except the per-criterion flags
#[must_use]
pub fn tsv_columns(table: &Table) -> Vec<Column> {
    table
        .columns()
        .into_iter()
        .filter(|c| !c.is_flag())
        .collect()
}

/// Writes the table as tab-separated text
///
/// The output starts with the [`FilterSettings::preamble`] comment lines, followed by a
/// header row and one line per read. Missing values are empty fields.
pub fn write_tsv<W: Write>(table: &Table, settings: &FilterSettings, writer: &mut W) -> Result<()> {
    writer.write_all(settings.preamble().as_bytes())?;

    let projection = table.project(&tsv_columns(table))?;
    writeln!(writer, "{}", projection.header().join("\t"))?;
    for (id, values) in projection.rows() {
        write!(writer, "{id}")?;
        for value in values {
            write!(writer, "\t{value}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Writes the table as TSV to a new file at `path`
pub fn export_tsv<P: AsRef<Path>>(table: &Table, settings: &FilterSettings, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = create_new(path)?;
    write_tsv(table, settings, &mut writer)?;
    writer.flush()?;
    info!("exported {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Writes the accepted reads as FASTA
///
/// Each accepted read yields `>{id} /1` with its forward sequence and `>{id} /2` with the
/// reverse complement of its reverse sequence, skipping whichever mate is missing.
///
/// # Returns
///
/// The number of FASTA records written
pub fn write_fasta<W: Write>(table: &Table, writer: &mut W) -> Result<usize> {
    let mut written = 0;
    for row in table.accepted().iter() {
        if let Some(seq) = &row.fw_seq {
            writeln!(writer, ">{} /1\n{seq}", row.id)?;
            written += 1;
        }
        if let Some(seq) = &row.rvc_seq {
            writeln!(writer, ">{} /2\n{seq}", row.id)?;
            written += 1;
        }
    }
    Ok(written)
}

/// Writes the accepted reads as FASTA to a new file at `path`
pub fn export_fasta<P: AsRef<Path>>(table: &Table, path: P) -> Result<usize> {
    let path = path.as_ref();
    let mut writer = create_new(path)?;
    let written = write_fasta(table, &mut writer)?;
    writer.flush()?;
    info!("exported {written} FASTA records to {}", path.display());
    Ok(written)
}

#[cfg(test)]
mod testing {
    use anyhow::Result;

    use super::*;
    use crate::fastq::{SequenceRecord, Strand};
    use crate::stats::extend_table;
    use crate::Error;

    fn record(id: &str, sequence: &str, strand: Strand) -> SequenceRecord {
        SequenceRecord {
            id: id.to_string(),
            sequence: sequence.to_string(),
            quality: "I".repeat(sequence.len()),
            complement: strand
                .is_reverse()
                .then(|| crate::fastq::reverse_complement(sequence).unwrap()),
            strand,
        }
    }

    fn table() -> Table {
        let forward = vec![
            record("a", "ATGC", Strand::Forward),
            record("b", "GGGA", Strand::Forward),
        ];
        let reverse = vec![record("a", "AACC", Strand::Reverse)];
        let mut table = Table::from_records(forward, reverse).unwrap();
        extend_table(&mut table);
        FilterSettings::default().apply(&mut table).unwrap();
        table
    }

    #[test]
    fn test_tsv_layout() -> Result<()> {
        let table = table();
        let mut out = Vec::new();
        write_tsv(&table, &FilterSettings::default(), &mut out)?;
        let text = String::from_utf8(out)?;
        let lines: Vec<_> = text.lines().collect();

        assert!(lines[0].starts_with("#min_seq_len:0"));
        assert!(lines[1].starts_with("#column flagged"));
        let header: Vec<_> = lines[2].split('\t').collect();
        assert_eq!(header[0], "id");
        assert_eq!(header.last(), Some(&"flagged"));
        assert!(!header.iter().any(|h| h.ends_with("_flag")));
        assert!(!header.contains(&"overlap_identity_perc"));
        assert_eq!(header.len(), 1 + 16 + 1);

        // integral percentages keep their decimal point
        let a: Vec<_> = lines[3].split('\t').collect();
        assert_eq!(a[0], "a");
        let fw_a = header.iter().position(|&h| h == "fw_A_perc").unwrap();
        assert_eq!(a[fw_a], "25.0");

        let b: Vec<_> = lines[4].split('\t').collect();
        assert_eq!(b.len(), header.len());
        assert_eq!(b[0], "b");
        // missing reverse sequence
        assert_eq!(b[header.iter().position(|&h| h == "rv_seq").unwrap()], "");
        assert_eq!(b.last(), Some(&"True"));
        Ok(())
    }

    #[test]
    fn test_fasta_accepted_only() -> Result<()> {
        let table = table();
        let mut out = Vec::new();
        let written = write_fasta(&table, &mut out)?;
        assert_eq!(written, 2);
        assert_eq!(String::from_utf8(out)?, ">a /1\nATGC\n>a /2\nGGTT\n");
        Ok(())
    }

    #[test]
    fn test_refuses_to_overwrite() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.fasta");
        let table = table();
        assert_eq!(export_fasta(&table, &path)?, 2);
        assert!(matches!(
            export_fasta(&table, &path),
            Err(Error::ExportError(ExportError::FileExists(_)))
        ));
        assert!(matches!(
            export_tsv(&table, &FilterSettings::default(), &path),
            Err(Error::ExportError(ExportError::FileExists(_)))
        ));
        Ok(())
    }
}
