//! Cross-sample merging of normalized variant records.
//!
//! Sources are consumed in a fixed caller-supplied order. Each record is
//! normalized and split before insertion, then either added as a new variant
//! or merged into the existing record with the same composite key. At output
//! time every record gets a `SUPP_VEC` bitmap (one character per source) and
//! a `SUPP` count.

use crate::core::error::Result;
use crate::variant::record::{VariantKey, VariantRecord};
use crate::variant::{normalize, split};
use log::info;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::BufRead;

/// Parse one source's record lines into normalized, split records ready for
/// merging. Header/comment lines beginning with `#` and blank lines are
/// skipped.
pub fn read_source<R: BufRead>(reader: R) -> Result<Vec<VariantRecord>> {
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut record = VariantRecord::parse(&line)?;
        record.tidy_info();
        normalize(&mut record);
        records.extend(split(&record));
    }
    Ok(records)
}

/// Accumulates records from N sources into one sorted, deduplicated set.
#[derive(Debug, Default)]
pub struct CrossSampleMerger {
    vars: BTreeMap<VariantKey, VariantRecord>,
    num_sources: usize,
}

impl CrossSampleMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one source's prepared records, tagging each with the next
    /// source index.
    pub fn add_source(&mut self, records: Vec<VariantRecord>) {
        let source = self.num_sources;
        self.num_sources += 1;
        for mut record in records {
            record.add_support(source);
            match self.vars.entry(record.key()) {
                Entry::Occupied(mut existing) => existing.get_mut().merge(&record),
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }
    }

    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Finalize the merge: stamp `SUPP_VEC` and `SUPP` on every record and
    /// return them in sorted key order.
    pub fn finish(self) -> Vec<VariantRecord> {
        let num_sources = self.num_sources;
        info!(
            "Merged {} sources into {} variants",
            num_sources,
            self.vars.len()
        );
        self.vars
            .into_values()
            .map(|mut record| {
                record.set_info("SUPP_VEC", &record.support_vector(num_sources));
                record.set_info("SUPP", &record.support().len().to_string());
                record
            })
            .collect()
    }
}
