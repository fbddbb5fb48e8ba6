//! Threshold-based variant calling from pileup text.

use anyhow::Result;
use log::info;
use pilevar_lib::call::caller::{call_variants, CallerConfig};
use pilevar_lib::call::pileup::{Pileup, PileupConfig};
use pilevar_lib::core::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use structopt::StructOpt;

/// CLI arguments for the `call` subcommand.
#[derive(Debug, StructOpt)]
#[structopt(author, name = "call")]
pub struct CallArgs {
    /// Input pileup file (`-` or omitted reads stdin).
    #[structopt(long, short = "p")]
    pub pileup: Option<PathBuf>,

    /// Output path for called variants (`-` or omitted writes stdout).
    #[structopt(long, short = "o")]
    pub output: Option<PathBuf>,

    /// Minimum coverage needed to examine a position.
    #[structopt(long, default_value = "20")]
    pub coverage_threshold: u32,

    /// Call an ambiguous N when the reference allele frequency drops below
    /// this value and nothing else qualifies.
    #[structopt(long, default_value = "0.6")]
    pub ref_threshold: f64,

    /// Call a substitution when an alt allele frequency reaches this value.
    #[structopt(long, default_value = "0.15")]
    pub alt_threshold: f64,

    /// Call an indel when its presence frequency reaches this value.
    #[structopt(long, default_value = "0.4")]
    pub indel_threshold: f64,

    /// Prefix added to the AF and STRANDAF info field names.
    #[structopt(long, default_value = "")]
    pub flag_prefix: String,

    /// Upper bound on contig length when sizing count tables.
    #[structopt(long, default_value = "31000")]
    pub max_genome_len: usize,
}

impl From<&CallArgs> for CallerConfig {
    fn from(args: &CallArgs) -> CallerConfig {
        CallerConfig {
            coverage_threshold: args.coverage_threshold,
            ref_threshold: args.ref_threshold,
            alt_threshold: args.alt_threshold,
            indel_threshold: args.indel_threshold,
            flag_prefix: args.flag_prefix.clone(),
        }
    }
}

/// Execute the `call` command end-to-end.
pub fn run_call(args: CallArgs) -> Result<()> {
    let config = CallerConfig::from(&args);
    let pileup_config = PileupConfig {
        max_genome_len: args.max_genome_len,
    };

    let gzipped = args.pileup.as_ref().map_or(false, is_gzipped);
    let reader = get_line_reader(&args.pileup, gzipped)?;
    info!("Reading pileup");
    let pileup = Pileup::from_reader(reader, &pileup_config, true)?;

    info!("Calling variants");
    let records = call_variants(&pileup, &config)?;
    info!("Called {} variants", records.len());

    if let Some(path) = &args.output {
        make_parent_dirs(path)?;
    }
    let mut writer = get_writer(&args.output, false, 1, 6)?;
    for record in &records {
        writeln!(writer, "{}", record.to_line())?;
    }
    writer.flush()?;
    Ok(())
}
