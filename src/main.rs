//! PILEVAR - pileup-driven variant calling and cross-sample merging
//!
//! Pilevar calls variants from pileup text and carries them through merging,
//! combining, annotation, validation, and format conversion.
//!
//! # Tools
//!
//! - `call`: call variants from a pileup with frequency thresholds
//! - `merge`: merge per-sample call files with support tracking
//! - `combine`: re-group adjacent substitutions into multi-base records
//! - `annotate`: add allele-frequency fields from pileup evidence
//! - `check`: validate a variant set against read alignments
//! - `ivar2vcf` / `table2vcf`: convert tabular variant reports
//!
//! # Usage
//!
//! ```bash
//! # Call variants from a samtools mpileup
//! pilevar call --pileup sample.mpileup --output sample.vcf
//!
//! # Merge calls across samples
//! pilevar merge --file-list vcflist.txt --output merged.vcf
//!
//! # Combine adjacent substitutions within coding frames
//! pilevar combine --input merged.vcf --gff genes.gff --output combined.vcf
//!
//! # Annotate with frequencies from two pileups
//! pilevar annotate --input merged.vcf --pileup ont.mpileup --aux-pileup illumina.mpileup
//! ```
//!
//! For more detailed usage information, see the documentation for each subcommand.

extern crate pilevar_lib;
pub mod commands;
use anyhow::Result;
use env_logger::Env;
use log::*;
use pilevar_lib::core::errors;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case", author, about)]
/// Commands for pileup-driven variant calling with PILEVAR
struct Args {
    #[structopt(subcommand)]
    subcommand: Subcommand,
}

#[derive(StructOpt)]
enum Subcommand {
    /// Call variants from pileup text with frequency thresholds
    Call(commands::CallArgs),
    /// Merge per-sample variant files with support tracking
    Merge(commands::MergeArgs),
    /// Re-group adjacent substitutions into multi-base records
    Combine(commands::CombineArgs),
    /// Add allele-frequency fields from pileup evidence
    Annotate(commands::AnnotateArgs),
    /// Validate a variant set against read alignments
    Check(commands::CheckArgs),
    /// Convert an iVar caller TSV to a variant file
    Ivar2vcf(commands::Ivar2VcfArgs),
    /// Convert a post-filtering summary table to variant files
    Table2vcf(commands::Table2VcfArgs),
}

impl Subcommand {
    fn run(self) -> Result<()> {
        match self {
            Subcommand::Call(args) => commands::run_call(args)?,
            Subcommand::Merge(args) => commands::run_merge(args)?,
            Subcommand::Combine(args) => commands::run_combine(args)?,
            Subcommand::Annotate(args) => commands::run_annotate(args)?,
            Subcommand::Check(args) => commands::run_check(args)?,
            Subcommand::Ivar2vcf(args) => commands::run_ivar2vcf(args)?,
            Subcommand::Table2vcf(args) => commands::run_table2vcf(args)?,
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    if let Err(err) = Args::from_args().subcommand.run() {
        if errors::is_broken_pipe(&err) {
            std::process::exit(0);
        }
        error!("{}", err);
        std::process::exit(1);
    }
    Ok(())
}
