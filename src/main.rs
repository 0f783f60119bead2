use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;

use pairflag::filter::{DEFAULT_MAX_LENGTH, DEFAULT_MAX_PERC, DEFAULT_MIN_LENGTH, DEFAULT_MIN_PERC};
use pairflag::stats::Base;
use pairflag::table::export;
use pairflag::{identity, FilterSettings, FlagColumn, IngestConfig, Ingestor, Table};

/// Paired-end FASTQ ingestion with cumulative per-read quality flagging
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a forward/reverse FASTQ pair into a new table
    #[command(display_order = 1)]
    Ingest(IngestArgs),

    /// Recompute the flags of one criterion (or all of them) and save the table
    #[command(display_order = 2)]
    Filter(FilterCommand),

    /// Join overlap identity scores from aligner output onto the table
    #[command(display_order = 3)]
    Score(ScoreArgs),

    /// Write the table as TSV or its accepted reads as FASTA
    #[command(display_order = 4)]
    Export(ExportArgs),

    /// Print row, pairing and flag counts of a table
    #[command(display_order = 5)]
    Summary(SummaryArgs),
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Forward (R1) FASTQ file
    #[arg(short = '1', long)]
    forward: PathBuf,

    /// Reverse (R2) FASTQ file
    #[arg(short = '2', long)]
    reverse: PathBuf,

    /// Output table path
    #[arg(short, long)]
    output: PathBuf,

    /// Target chunk size in bytes
    #[arg(long, default_value_t = pairflag::fastq::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Worker threads per file (0: half the logical cores)
    #[arg(short = 'T', long, default_value_t = 0)]
    threads: usize,
}

#[derive(Args, Debug)]
struct FilterCommand {
    /// Table to update in place
    #[arg(short, long)]
    table: PathBuf,

    #[clap(subcommand)]
    criterion: Criterion,
}

#[derive(Subcommand, Debug)]
enum Criterion {
    /// Sequence length bounds on both mates
    Length {
        #[arg(long, default_value_t = DEFAULT_MIN_LENGTH)]
        min: usize,
        #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
        max: usize,
    },

    /// Nucleotide percentage bounds on both mates
    Nucleotide(NucleotideArgs),

    /// Reject reads without a mate
    Paired {
        /// Set to false to stop rejecting unpaired reads
        #[arg(long, default_value_t = true, action = ArgAction::Set)]
        require: bool,
    },

    /// Minimum overlap identity of scored reads
    Identity {
        #[arg(long, default_value_t = 0.0)]
        min: f64,
    },

    /// Every criterion at once
    All(FilterArgs),
}

#[derive(Args, Debug, Clone)]
struct NucleotideArgs {
    #[arg(long, default_value_t = DEFAULT_MIN_PERC)]
    min_a: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_PERC)]
    max_a: f64,
    #[arg(long, default_value_t = DEFAULT_MIN_PERC)]
    min_t: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_PERC)]
    max_t: f64,
    #[arg(long, default_value_t = DEFAULT_MIN_PERC)]
    min_g: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_PERC)]
    max_g: f64,
    #[arg(long, default_value_t = DEFAULT_MIN_PERC)]
    min_c: f64,
    #[arg(long, default_value_t = DEFAULT_MAX_PERC)]
    max_c: f64,
}
impl NucleotideArgs {
    fn apply_to(&self, settings: FilterSettings) -> FilterSettings {
        settings
            .with_nucleotide(Base::A, self.min_a, self.max_a)
            .with_nucleotide(Base::T, self.min_t, self.max_t)
            .with_nucleotide(Base::G, self.min_g, self.max_g)
            .with_nucleotide(Base::C, self.min_c, self.max_c)
    }
}

#[derive(Args, Debug, Clone)]
struct FilterArgs {
    #[arg(long, default_value_t = DEFAULT_MIN_LENGTH)]
    min_length: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    #[clap(flatten)]
    nucleotides: NucleotideArgs,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    require_paired: bool,

    #[arg(long, default_value_t = 0.0)]
    min_identity: f64,
}
impl From<&FilterArgs> for FilterSettings {
    fn from(args: &FilterArgs) -> Self {
        let settings = FilterSettings::default()
            .with_lengths(args.min_length, args.max_length)
            .with_require_paired(args.require_paired)
            .with_min_identity(args.min_identity);
        args.nucleotides.apply_to(settings)
    }
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Table to update in place
    #[arg(short, long)]
    table: PathBuf,

    /// Tab-delimited aligner output (SAM)
    #[arg(short, long)]
    alignment: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ExportFormat {
    Tsv,
    Fasta,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[arg(short, long)]
    table: PathBuf,

    /// Output path (must not exist)
    #[arg(short, long)]
    output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = ExportFormat::Tsv)]
    format: ExportFormat,

    /// Settings recorded in the TSV preamble
    #[clap(flatten)]
    settings: FilterArgs,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[arg(short, long)]
    table: PathBuf,
}

fn ingest(args: &IngestArgs) -> Result<()> {
    let config = IngestConfig::builder()
        .chunk_size(args.chunk_size)
        .threads(args.threads)
        .build();
    let table = Ingestor::new(config).ingest(&args.forward, &args.reverse)?;
    table.save(&args.output)?;
    Ok(())
}

fn filter(args: &FilterCommand) -> Result<()> {
    let mut table = Table::load(&args.table)?;
    let settings = FilterSettings::default();
    match &args.criterion {
        Criterion::Length { min, max } => {
            settings.with_lengths(*min, *max).apply_lengths(&mut table)?;
        }
        Criterion::Nucleotide(bounds) => {
            bounds.apply_to(settings).apply_nucleotides(&mut table)?;
        }
        Criterion::Paired { require } => {
            settings
                .with_require_paired(*require)
                .apply_pairing(&mut table)?;
        }
        Criterion::Identity { min } => {
            settings
                .with_min_identity(*min)
                .apply_identity(&mut table)?;
        }
        Criterion::All(all) => {
            FilterSettings::from(all).apply(&mut table)?;
        }
    }
    let update = table.flag_any();
    info!(
        "{} of {} reads accepted (version {})",
        table.len() - update.marked,
        table.len(),
        update.version
    );
    table.save(&args.table)?;
    Ok(())
}

fn score(args: &ScoreArgs) -> Result<()> {
    let mut table = Table::load(&args.table)?;
    identity::score_file(&args.alignment, &mut table)?;
    table.save(&args.table)?;
    Ok(())
}

fn export_table(args: &ExportArgs) -> Result<()> {
    let table = Table::load(&args.table)?;
    match args.format {
        ExportFormat::Tsv => {
            export::export_tsv(&table, &FilterSettings::from(&args.settings), &args.output)?;
        }
        ExportFormat::Fasta => {
            export::export_fasta(&table, &args.output)?;
        }
    }
    Ok(())
}

fn summary(args: &SummaryArgs) -> Result<()> {
    let table = Table::load(&args.table)?;
    let paired = table.rows().iter().filter(|r| r.paired).count();
    let accepted = table.accepted().len();

    println!("rows\t{}", table.len());
    println!("stage\t{:?}", table.stage());
    println!("version\t{}", table.version());
    println!("paired\t{paired}");
    println!("accepted\t{accepted}");
    println!("flagged\t{}", table.len() - accepted);
    for flag in FlagColumn::ALL {
        let count = table.rows().iter().filter(|r| r.flag(flag)).count();
        println!("{flag}\t{count}");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Ingest(args) => ingest(args),
        Command::Filter(args) => filter(args),
        Command::Score(args) => score(args),
        Command::Export(args) => export_table(args),
        Command::Summary(args) => summary(args),
    }
}
