//! Conversion of tabular variant reports into the record format the rest of
//! the pipeline consumes.
//!
//! Two layouts are supported: the iVar variant-caller TSV, whose quality and
//! depth columns are preserved as `IVAR_`-prefixed INFO fields, and the
//! post-filtering summary table, which carries an `in_consensus` column used
//! to optionally restrict output to consensus variants. Both are header-keyed
//! so column order never matters; a missing required column is fatal.

use crate::core::error::{PilevarError, Result};
use crate::variant::record::VariantRecord;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::io::Read;

/// The column header written ahead of converted records.
pub const VCF_HEADER: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";

/// A tab-delimited table with case-insensitive header lookup.
pub struct VariantTable {
    columns: FxHashMap<String, usize>,
    rows: Vec<csv::StringRecord>,
}

impl VariantTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<VariantTable> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let mut columns = FxHashMap::default();
        for (i, name) in rdr.headers()?.iter().enumerate() {
            columns.insert(name.to_lowercase(), i);
        }
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            rows.push(record);
        }
        Ok(VariantTable { columns, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn field<'a>(&self, row: &'a csv::StringRecord, name: &str) -> Result<&'a str> {
        let i = *self
            .columns
            .get(&name.to_lowercase())
            .ok_or_else(|| PilevarError::InvalidInput(format!("Missing column: {}", name)))?;
        row.get(i).ok_or_else(|| {
            PilevarError::format(format!("Row too short for column {}", name), join_row(row))
        })
    }

    fn position(&self, row: &csv::StringRecord) -> Result<u64> {
        self.field(row, "pos")?
            .parse::<u64>()
            .map_err(|_| PilevarError::format("Bad position", join_row(row)))
    }
}

fn join_row(row: &csv::StringRecord) -> String {
    row.iter().join("\t")
}

/// Convert an iVar caller table. Each row's depth, quality, frequency, and
/// p-value columns become `IVAR_`-prefixed INFO fields.
pub fn ivar_records(table: &VariantTable) -> Result<Vec<VariantRecord>> {
    let mut out = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let info = format!(
            "IVAR_REF_DP={};IVAR_REF_RV={};IVAR_REF_QUAL={};IVAR_ALT_DP={};IVAR_ALT_RV={};IVAR_ALT_QUAL={};IVAR_ALT_FREQ={};IVAR_TOTAL_DP={};IVAR_PVAL={}",
            table.field(row, "ref_dp")?,
            table.field(row, "ref_rv")?,
            table.field(row, "ref_qual")?,
            table.field(row, "alt_dp")?,
            table.field(row, "alt_rv")?,
            table.field(row, "alt_qual")?,
            table.field(row, "alt_freq")?,
            table.field(row, "total_dp")?,
            table.field(row, "pval")?,
        );
        out.push(VariantRecord::from_fields(
            table.field(row, "region")?,
            table.position(row)?,
            ".",
            table.field(row, "ref")?,
            table.field(row, "alt")?,
            &info,
        ));
    }
    Ok(out)
}

/// Convert a post-filtering summary table. With `consensus_only` set, rows
/// whose `in_consensus` column is not `true` are dropped.
pub fn table_records(table: &VariantTable, consensus_only: bool) -> Result<Vec<VariantRecord>> {
    let mut out = Vec::new();
    for row in &table.rows {
        if consensus_only && !table.field(row, "in_consensus")?.eq_ignore_ascii_case("true") {
            continue;
        }
        out.push(VariantRecord::from_fields(
            table.field(row, "chrom")?,
            table.position(row)?,
            ".",
            table.field(row, "ref")?,
            table.field(row, "alt")?,
            ".",
        ));
    }
    Ok(out)
}
