//! Re-grouping of adjacent substitutions in a merged variant file.

use anyhow::Result;
use log::info;
use pilevar_lib::combine::{AdjacencyCombiner, OrfIndex};
use pilevar_lib::core::prelude::*;
use pilevar_lib::genome::Genome;
use pilevar_lib::variant::record::VariantRecord;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use structopt::StructOpt;

/// CLI arguments for the `combine` subcommand.
#[derive(Debug, StructOpt)]
#[structopt(author, name = "combine")]
pub struct CombineArgs {
    /// Input merged variant file (`-` or omitted reads stdin).
    #[structopt(long, short = "i")]
    pub input: Option<PathBuf>,

    /// Output path (`-` or omitted writes stdout).
    #[structopt(long, short = "o")]
    pub output: Option<PathBuf>,

    /// Reference genome FASTA used to verify reference bases across runs.
    #[structopt(long, short = "g")]
    pub genome: Option<PathBuf>,

    /// GFF annotation; when given, substitutions only combine within a
    /// shared codon of an annotated coding region.
    #[structopt(long)]
    pub gff: Option<PathBuf>,
}

/// Execute the `combine` command end-to-end.
pub fn run_combine(args: CombineArgs) -> Result<()> {
    let genome = match &args.genome {
        Some(path) => Some(Genome::from_reader(get_line_reader(
            &Some(path),
            is_gzipped(path),
        )?)?),
        None => None,
    };
    let orf = match &args.gff {
        Some(path) => {
            let index = OrfIndex::from_reader(get_line_reader(&Some(path), is_gzipped(path))?)?;
            info!("Loaded {} codon starts from annotation", index.len());
            Some(index)
        }
        None => None,
    };

    let reader = get_line_reader(&args.input, args.input.as_ref().map_or(false, is_gzipped))?;
    let mut headers = Vec::new();
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            headers.push(line);
            continue;
        }
        records.push(VariantRecord::parse(&line)?);
    }
    info!("Combining {} records", records.len());

    let mut combiner = AdjacencyCombiner::new();
    if let Some(genome) = &genome {
        combiner = combiner.with_genome(genome);
    }
    if let Some(orf) = &orf {
        combiner = combiner.with_orf(orf);
    }
    let combined = combiner.combine(records);
    info!("Emitting {} records", combined.len());

    if let Some(path) = &args.output {
        make_parent_dirs(path)?;
    }
    let mut writer = get_writer(&args.output, false, 1, 6)?;
    for header in &headers {
        writeln!(writer, "{}", header)?;
    }
    for record in &combined {
        writeln!(writer, "{}", record.to_line())?;
    }
    writer.flush()?;
    Ok(())
}
