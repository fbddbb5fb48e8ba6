//! Conversion of tabular variant reports into variant files.

use anyhow::Result;
use log::info;
use pilevar_lib::convert::{ivar_records, table_records, VariantTable, VCF_HEADER};
use pilevar_lib::core::prelude::*;
use pilevar_lib::variant::record::VariantRecord;
use std::io::Write;
use std::path::{Path, PathBuf};
use structopt::StructOpt;

/// CLI arguments for the `ivar2vcf` subcommand.
#[derive(Debug, StructOpt)]
#[structopt(author, name = "ivar2vcf")]
pub struct Ivar2VcfArgs {
    /// TSV output of the iVar variant caller.
    #[structopt(long, short = "t")]
    pub table: PathBuf,

    /// Output path (`-` or omitted writes stdout).
    #[structopt(long, short = "o")]
    pub output: Option<PathBuf>,
}

/// CLI arguments for the `table2vcf` subcommand.
#[derive(Debug, StructOpt)]
#[structopt(author, name = "table2vcf")]
pub struct Table2VcfArgs {
    /// Post-filtering summary table with an in_consensus column.
    #[structopt(long, short = "t")]
    pub table: PathBuf,

    /// Output path for all variants.
    #[structopt(long)]
    pub all: PathBuf,

    /// Output path for consensus variants only.
    #[structopt(long)]
    pub consensus: PathBuf,
}

fn load_table(path: &Path) -> Result<VariantTable> {
    let reader = get_line_reader(&Some(path), is_gzipped(path))?;
    Ok(VariantTable::from_reader(reader)?)
}

fn write_records(path: &Option<PathBuf>, records: &[VariantRecord]) -> Result<()> {
    if let Some(path) = path {
        make_parent_dirs(path)?;
    }
    let mut writer = get_writer(path, false, 1, 6)?;
    writeln!(writer, "{}", VCF_HEADER)?;
    for record in records {
        writeln!(writer, "{}", record.to_line())?;
    }
    writer.flush()?;
    Ok(())
}

/// Execute the `ivar2vcf` command end-to-end.
pub fn run_ivar2vcf(args: Ivar2VcfArgs) -> Result<()> {
    let table = load_table(&args.table)?;
    let records = ivar_records(&table)?;
    info!("Converted {} rows", records.len());
    write_records(&args.output, &records)
}

/// Execute the `table2vcf` command end-to-end.
pub fn run_table2vcf(args: Table2VcfArgs) -> Result<()> {
    let table = load_table(&args.table)?;
    let all = table_records(&table, false)?;
    let consensus = table_records(&table, true)?;
    info!(
        "Converted {} rows, {} in consensus",
        all.len(),
        consensus.len()
    );
    write_records(&Some(args.all.clone()), &all)?;
    write_records(&Some(args.consensus.clone()), &consensus)?;
    Ok(())
}
