//! Allele-frequency annotation of merged variants from pileup evidence.

use anyhow::Result;
use log::info;
use pilevar_lib::annotate::{Annotator, DEFAULT_AUX_PREFIX};
use pilevar_lib::call::pileup::{Pileup, PileupConfig};
use pilevar_lib::core::prelude::*;
use pilevar_lib::variant::record::VariantRecord;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use structopt::StructOpt;

/// CLI arguments for the `annotate` subcommand.
#[derive(Debug, StructOpt)]
#[structopt(author, name = "annotate")]
pub struct AnnotateArgs {
    /// Input variant file (`-` or omitted reads stdin).
    #[structopt(long, short = "i")]
    pub input: Option<PathBuf>,

    /// Output path (`-` or omitted writes stdout).
    #[structopt(long, short = "o")]
    pub output: Option<PathBuf>,

    /// Pileup whose evidence fills the unprefixed frequency fields.
    #[structopt(long, short = "p")]
    pub pileup: Option<PathBuf>,

    /// Second pileup whose fields carry the auxiliary prefix.
    #[structopt(long)]
    pub aux_pileup: Option<PathBuf>,

    /// Prefix for the auxiliary pileup's field names.
    #[structopt(long, default_value = DEFAULT_AUX_PREFIX)]
    pub aux_prefix: String,

    /// Upper bound on contig length when sizing count tables.
    #[structopt(long, default_value = "31000")]
    pub max_genome_len: usize,
}

fn load_pileup(path: &Option<PathBuf>, config: &PileupConfig) -> Result<Option<Pileup>> {
    match path {
        Some(path) => {
            let reader = get_line_reader(&Some(path), is_gzipped(path))?;
            Ok(Some(Pileup::from_reader(reader, config, false)?))
        }
        None => Ok(None),
    }
}

/// Execute the `annotate` command end-to-end.
pub fn run_annotate(args: AnnotateArgs) -> Result<()> {
    if args.pileup.is_none() && args.aux_pileup.is_none() {
        return Err(
            PilevarError::InvalidInput("At least one pileup is required".to_string()).into(),
        );
    }
    let pileup_config = PileupConfig {
        max_genome_len: args.max_genome_len,
    };
    let primary = load_pileup(&args.pileup, &pileup_config)?;
    let aux = load_pileup(&args.aux_pileup, &pileup_config)?;

    let mut annotator = Annotator::new().aux_prefix(&args.aux_prefix);
    if let Some(primary) = &primary {
        annotator = annotator.with_primary(primary);
    }
    if let Some(aux) = &aux {
        annotator = annotator.with_aux(aux);
    }

    let reader = get_line_reader(&args.input, args.input.as_ref().map_or(false, is_gzipped))?;
    if let Some(path) = &args.output {
        make_parent_dirs(path)?;
    }
    let mut writer = get_writer(&args.output, false, 1, 6)?;

    let mut annotated = 0usize;
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            writeln!(writer, "{}", line)?;
            continue;
        }
        let mut record = VariantRecord::parse(&line)?;
        annotator.annotate(&mut record);
        writeln!(writer, "{}", record.to_line())?;
        annotated += 1;
    }
    writer.flush()?;
    info!("Annotated {} records", annotated);
    Ok(())
}
