//! Parallel ingestion of a forward/reverse FASTQ pair into a [`Table`]

use std::path::Path;
use std::time::Instant;

use log::{debug, info};

use crate::error::Result;
use crate::fastq::{FastqFile, ParsedChunk, Strand, DEFAULT_CHUNK_SIZE};
use crate::parallel::{TaskHandle, WorkerPool};
use crate::stats;
use crate::table::Table;

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestConfigBuilder {
    chunk_size: Option<usize>,
    threads: Option<usize>,
}
impl IngestConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }
    #[must_use]
    pub fn build(self) -> IngestConfig {
        IngestConfig {
            chunk_size: self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            threads: self.threads.unwrap_or(0),
        }
    }
}

/// Settings of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    /// Target size of a chunk in bytes
    pub chunk_size: usize,

    /// Worker threads per file; `0` picks half the logical cores
    pub threads: usize,
}
impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfigBuilder::default().build()
    }
}
impl IngestConfig {
    #[must_use]
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::new()
    }
}

/// Turns a pair of FASTQ files into a table of read pairs
///
/// Both files are cut into chunks and every chunk is handed to one of two worker pools,
/// one per file. All chunks are queued before any result is awaited; results are then
/// collected in file order, zipped into records, joined on the read id and extended
/// with the derived statistics.
///
/// # Examples
///
/// ```rust,no_run
/// use pairflag::ingest::{IngestConfig, Ingestor};
///
/// let config = IngestConfig::builder().chunk_size(4 << 20).threads(4).build();
/// let table = Ingestor::new(config)
///     .ingest("reads_R1.fastq", "reads_R2.fastq")
///     .unwrap();
/// println!("{} read pairs", table.len());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Ingestor {
    config: IngestConfig,
}
impl Ingestor {
    #[must_use]
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Parses both files and builds the extended table
    ///
    /// # Errors
    ///
    /// Returns the first error in chunk order of either file, or a join error. No partial
    /// table is produced.
    pub fn ingest<P, Q>(&self, forward: P, reverse: Q) -> Result<Table>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let start = Instant::now();
        let fw_file = FastqFile::new(forward)?;
        let rv_file = FastqFile::new(reverse)?;

        let (fw_parsed, rv_parsed) = {
            let mut fw_pool = WorkerPool::new(self.config.threads);
            let mut rv_pool = WorkerPool::new(self.config.threads);
            let fw_tasks = self.submit(&mut fw_pool, &fw_file, Strand::Forward);
            let rv_tasks = self.submit(&mut rv_pool, &rv_file, Strand::Reverse);
            (collect(fw_tasks)?, collect(rv_tasks)?)
        };

        let forward = fw_parsed.into_records(Strand::Forward)?;
        let reverse = rv_parsed.into_records(Strand::Reverse)?;
        info!(
            "parsed {} forward and {} reverse reads",
            forward.len(),
            reverse.len()
        );

        let mut table = Table::from_records(forward, reverse)?;
        stats::extend_table(&mut table);
        info!(
            "ingested {} read pairs in {:.2?}",
            table.len(),
            start.elapsed()
        );
        Ok(table)
    }

    fn submit(
        &self,
        pool: &mut WorkerPool,
        file: &FastqFile,
        strand: Strand,
    ) -> Vec<TaskHandle<Result<ParsedChunk>>> {
        let tasks: Vec<_> = file
            .chunks(self.config.chunk_size)
            .map(|range| {
                let file = file.clone();
                pool.submit(move || file.parse_range(range, strand))
            })
            .collect();
        debug!(
            "queued {} chunks of {} on {} threads",
            tasks.len(),
            file.path().display(),
            pool.num_threads()
        );
        tasks
    }
}

/// Awaits every task in submission order and concatenates the chunks
fn collect(tasks: Vec<TaskHandle<Result<ParsedChunk>>>) -> Result<ParsedChunk> {
    let mut parsed = ParsedChunk::default();
    for task in tasks {
        parsed.extend(task.wait()??);
    }
    Ok(parsed)
}
