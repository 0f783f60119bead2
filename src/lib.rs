//! # pairflag
//!
//! Paired-end FASTQ ingestion with cumulative, per-read quality flagging.
//!
//! A forward/reverse FASTQ pair is parsed in parallel ([`ingest`]) into a [`Table`] with
//! one row per read pair, extended with lengths, pairing and nucleotide composition
//! ([`stats`]). Filter criteria each own one flag column of the table and can be applied
//! in any order ([`table`], [`filter`]); overlap identity scores computed from aligner
//! output ([`identity`]) add a further criterion. Tables are persisted between steps
//! ([`table::store`]) and exported as TSV or FASTA ([`table::export`]).

mod error;
pub mod fastq;
pub mod filter;
pub mod identity;
pub mod ingest;
pub mod parallel;
pub mod prelude;
pub mod stats;
pub mod table;

pub use error::{Error, ExportError, ParseError, Result, ScoreError, StoreError, TableError};
pub use filter::FilterSettings;
pub use identity::IdentityScorer;
pub use ingest::{IngestConfig, Ingestor};
pub use table::{Column, FlagColumn, FlagUpdate, Row, Table, Value};

#[cfg(test)]
mod testing {

    use super::*;
    use anyhow::Result;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    const FORWARD: &str = "\
@HWI-ST1:8:1101:1:1#0/1
AAAACCGGTTA
+
IIIIIIIIIII
@HWI-ST1:8:1101:1:2#0/1
GGGGGGGGGGG
+
IIIIIIIIIII
@HWI-ST1:8:1101:1:3#0/1
ACG
+
III
";

    const REVERSE: &str = "\
@HWI-ST1:8:1101:1:1#0/2
TTTTACCGG
+
IIIIIIIII
@HWI-ST1:8:1101:1:2#0/2
CCCCCCCCC
+
IIIIIIIII
@HWI-ST1:8:1101:1:3#0/2
CGT
+
III
";

    fn alignment_output() -> String {
        let line = |name: &str, pos: u64, seq: &str| {
            format!("{name}\t99\tref\t1\t42\t*\t=\t{pos}\t0\t{seq}\t*\n")
        };
        let mut out = String::from("@HD\tVN:1.6\n");
        out.push_str(&line("HWI-ST1:8:1101:1:1#0", 5, "AAAACCGGTTA"));
        out.push_str(&line("HWI-ST1:8:1101:1:1#0", 3, "CCGGTAAAA"));
        out.push_str(&line("HWI-ST1:8:1101:1:2#0", 5, "GGGGGGGGGGG"));
        out.push_str(&line("HWI-ST1:8:1101:1:2#0", 3, "CCCCCCCCC"));
        out
    }

    fn fastq(text: &str) -> Result<NamedTempFile> {
        let mut handle = NamedTempFile::new()?;
        handle.write_all(text.as_bytes())?;
        handle.flush()?;
        Ok(handle)
    }

    #[test]
    fn test_ingest_filter_score_store() -> Result<()> {
        let fw = fastq(FORWARD)?;
        let rv = fastq(REVERSE)?;
        let config = IngestConfig::builder().chunk_size(20).threads(2).build();
        let mut table = Ingestor::new(config).ingest(fw.path(), rv.path())?;
        assert_eq!(table.len(), 3);
        assert!(table.rows().iter().all(|r| r.paired));

        let settings = FilterSettings::default().with_lengths(5, 100);
        settings.apply(&mut table)?;
        assert_eq!(table.accepted().len(), 2);

        let mut scorer = IdentityScorer::new();
        scorer.scan(Cursor::new(alignment_output()))?;
        scorer.join_into(&mut table);
        let scores = table.column_values(Column::OverlapIdentityPerc)?;
        assert_eq!(scores, vec![Value::Float(100.0), Value::Float(0.0), Value::Null]);

        let settings = settings.with_min_identity(90.0);
        settings.apply(&mut table)?;
        assert_eq!(table.accepted().ids(), vec!["HWI-ST1:8:1101:1:1#0"]);

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("reads.pft");
        table.save(&path)?;
        let loaded = Table::load(&path)?;
        assert_eq!(loaded.rows(), table.rows());
        assert_eq!(loaded.version(), table.version());

        let fasta = dir.path().join("accepted.fasta");
        assert_eq!(crate::table::export::export_fasta(&loaded, &fasta)?, 2);
        let text = std::fs::read_to_string(&fasta)?;
        assert_eq!(
            text,
            ">HWI-ST1:8:1101:1:1#0 /1\nAAAACCGGTTA\n>HWI-ST1:8:1101:1:1#0 /2\nCCGGTAAAA\n"
        );
        Ok(())
    }

    #[test]
    fn test_flagging_is_cumulative_across_saves() -> Result<()> {
        let fw = fastq(FORWARD)?;
        let rv = fastq(REVERSE)?;
        let mut table = Ingestor::default().ingest(fw.path(), rv.path())?;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("reads.pft");

        table.flag_between(Column::FwSeqLength, 5.0, 100.0, FlagColumn::FwSeqLen)?;
        table.flag_any();
        table.save(&path)?;

        let mut table = Table::load(&path)?;
        table.flag_smaller_than(
            Column::FwPerc(stats::Base::G),
            50.0,
            FlagColumn::FwGPerc,
        )?;
        table.flag_any();
        assert_eq!(table.accepted().ids(), vec!["HWI-ST1:8:1101:1:1#0"]);
        Ok(())
    }
}
