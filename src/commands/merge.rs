//! Cross-sample merging of per-sample variant call files.

use anyhow::{Context, Result};
use log::info;
use pilevar_lib::core::prelude::*;
use pilevar_lib::merge::{read_source, CrossSampleMerger};
use pilevar_lib::variant::record::VariantRecord;
use rayon::prelude::*;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use structopt::StructOpt;

/// CLI arguments for the `merge` subcommand.
#[derive(Debug, StructOpt)]
#[structopt(author, name = "merge")]
pub struct MergeArgs {
    /// Text file listing one variant file path per line, in sample order.
    #[structopt(long, short = "f")]
    pub file_list: PathBuf,

    /// Output path for merged variants (`-` or omitted writes stdout).
    #[structopt(long, short = "o")]
    pub output: Option<PathBuf>,

    /// Alignment file name recorded in the output header for downstream
    /// annotation.
    #[structopt(long)]
    pub illumina_bam: Option<String>,

    /// Number of worker threads for parsing the per-sample inputs.
    #[structopt(long, short = "t", default_value = "4")]
    pub threads: usize,
}

/// Execute the `merge` command end-to-end.
pub fn run_merge(args: MergeArgs) -> Result<()> {
    let list_reader = get_line_reader(&Some(&args.file_list), is_gzipped(&args.file_list))?;
    let files: Vec<String> = list_reader
        .lines()
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|l| !l.trim().is_empty())
        .collect();
    if files.is_empty() {
        return Err(PilevarError::EmptyData(format!(
            "No input files listed in {}",
            args.file_list.display()
        ))
        .into());
    }
    info!("Merging {} sources", files.len());

    let threads = determine_allowed_cpus(args.threads)?;
    set_rayon_global_pools_size(threads)?;

    // Sources parse in parallel; merging stays sequential so support indices
    // follow the listed sample order.
    let sources: Vec<Vec<VariantRecord>> = files
        .par_iter()
        .map(|file| {
            let reader = get_line_reader(&Some(file), is_gzipped(file))?;
            read_source(reader).map_err(anyhow::Error::from)
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("Failed to parse inputs from {}", args.file_list.display()))?;

    let mut merger = CrossSampleMerger::new();
    for records in sources {
        merger.add_source(records);
    }
    let merged = merger.finish();
    info!("Merged into {} records", merged.len());

    if let Some(path) = &args.output {
        make_parent_dirs(path)?;
    }
    let mut writer = get_writer(&args.output, false, 1, 6)?;
    writeln!(writer, "##filelist={}", files.join(","))?;
    if let Some(bam) = &args.illumina_bam {
        writeln!(writer, "##ILLUMINABAM={}", bam)?;
    }
    writeln!(writer, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO")?;
    for record in &merged {
        writeln!(writer, "{}", record.to_core_line())?;
    }
    writer.flush()?;
    Ok(())
}
