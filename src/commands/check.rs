//! Validation of a variant set against read alignments.

use anyhow::Result;
use log::info;
use pilevar_lib::check::{check_variants, AlignmentCounts, CheckConfig, VariantIndex};
use pilevar_lib::core::prelude::*;
use pilevar_lib::genome::Genome;
use std::io::Write;
use std::path::PathBuf;
use structopt::StructOpt;

/// CLI arguments for the `check` subcommand.
#[derive(Debug, StructOpt)]
#[structopt(author, name = "check")]
pub struct CheckArgs {
    /// SAM file with the read alignments.
    #[structopt(long, short = "s")]
    pub sam: PathBuf,

    /// Variant file with the calls to validate.
    #[structopt(long, short = "v")]
    pub variants: PathBuf,

    /// Reference genome FASTA.
    #[structopt(long, short = "g")]
    pub genome: PathBuf,

    /// Output path for findings (`-` or omitted writes stdout).
    #[structopt(long, short = "o")]
    pub output: Option<PathBuf>,

    /// Minimum base-call coverage before a position is examined.
    #[structopt(long, default_value = "20")]
    pub coverage_threshold: u32,

    /// Flag a missed variant when the reference proportion drops below this.
    #[structopt(long, default_value = "0.6")]
    pub missed_variant_freq: f64,

    /// Flag a false positive when the reference proportion exceeds this.
    #[structopt(long, default_value = "0.4")]
    pub fp_freq: f64,

    /// Upper bound on contig length when sizing count tables.
    #[structopt(long, default_value = "31000")]
    pub max_genome_len: usize,
}

impl From<&CheckArgs> for CheckConfig {
    fn from(args: &CheckArgs) -> CheckConfig {
        CheckConfig {
            coverage_threshold: args.coverage_threshold,
            missed_variant_freq: args.missed_variant_freq,
            false_positive_freq: args.fp_freq,
            max_genome_len: args.max_genome_len,
        }
    }
}

/// Execute the `check` command end-to-end.
pub fn run_check(args: CheckArgs) -> Result<()> {
    let config = CheckConfig::from(&args);

    info!("Reading variants");
    let reader = get_line_reader(&Some(&args.variants), is_gzipped(&args.variants))?;
    let (index, mut findings) = VariantIndex::from_reader(reader)?;

    info!("Reading genome");
    let genome = Genome::from_reader(get_line_reader(
        &Some(&args.genome),
        is_gzipped(&args.genome),
    )?)?;

    info!("Counting coverage from alignments");
    let reader = get_line_reader(&Some(&args.sam), is_gzipped(&args.sam))?;
    let counts = AlignmentCounts::from_sam_reader(reader, config.max_genome_len)?;

    info!("Validating variants");
    findings.extend(check_variants(&counts, &genome, &index, &config));

    if let Some(path) = &args.output {
        make_parent_dirs(path)?;
    }
    let mut writer = get_writer(&args.output, false, 1, 6)?;
    for finding in &findings {
        writeln!(writer, "{}", finding)?;
    }
    writer.flush()?;
    info!("Reported {} findings", findings.len());
    Ok(())
}
