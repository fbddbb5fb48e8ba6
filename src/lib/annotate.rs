//! Allele-frequency annotation of merged variant records from one or two
//! pileup sources.
//!
//! A primary pileup contributes the unprefixed INFO fields (`AF`, `STRANDAF`,
//! `POSITIVE_STRAND_FREQUENCIES`, `NEGATIVE_STRAND_FREQUENCIES`); an optional
//! auxiliary pileup contributes the same fields under a configurable prefix.
//! Frequencies are computed over the five base slots only, so indel presence
//! markers never inflate the denominator. Indel records get all fields zeroed
//! since their per-base evidence is not positionally meaningful after
//! splitting.

use crate::call::alleles::{Allele, BaseCounts};
use crate::call::pileup::Pileup;
use crate::variant::record::VariantRecord;
use itertools::Itertools;

pub const DEFAULT_AUX_PREFIX: &str = "ILLUMINA_";

/// Writes per-source frequency INFO fields into variant records.
pub struct Annotator<'a> {
    primary: Option<&'a Pileup>,
    aux: Option<&'a Pileup>,
    aux_prefix: String,
}

impl<'a> Annotator<'a> {
    pub fn new() -> Self {
        Annotator {
            primary: None,
            aux: None,
            aux_prefix: DEFAULT_AUX_PREFIX.to_string(),
        }
    }

    pub fn with_primary(mut self, pileup: &'a Pileup) -> Self {
        self.primary = Some(pileup);
        self
    }

    pub fn with_aux(mut self, pileup: &'a Pileup) -> Self {
        self.aux = Some(pileup);
        self
    }

    pub fn aux_prefix(mut self, prefix: &str) -> Self {
        self.aux_prefix = prefix.to_string();
        self
    }

    /// Annotate one record in place. A contig or position absent from a
    /// source behaves as a zero count tensor, so the fields are always
    /// written for every configured source.
    pub fn annotate(&self, record: &mut VariantRecord) {
        let sources: [(Option<&Pileup>, &str); 2] =
            [(self.primary, ""), (self.aux, self.aux_prefix.as_str())];
        for (pileup, prefix) in sources {
            let Some(pileup) = pileup else {
                continue;
            };
            if record.is_snv() {
                let counts = lookup(pileup, record);
                annotate_snv(record, &counts, prefix);
            } else {
                zero_fields(record, prefix);
            }
        }
    }
}

impl Default for Annotator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup(pileup: &Pileup, record: &VariantRecord) -> BaseCounts {
    record
        .pos()
        .checked_sub(1)
        .and_then(|pos0| pileup.counts_at(record.chromosome(), pos0 as usize))
        .copied()
        .unwrap_or_default()
}

fn annotate_snv(record: &mut VariantRecord, counts: &BaseCounts, prefix: &str) {
    let alt = record
        .alt_allele()
        .chars()
        .next()
        .and_then(Allele::from_base)
        .unwrap_or(Allele::N);
    let i = alt.index();

    let depth = counts.base_depth();
    let af = if depth > 0 {
        f64::from(counts.total[i]) / f64::from(depth)
    } else {
        0.0
    };
    record.set_info(&format!("{}AF", prefix), &format!("{:.6}", af));

    let (fwd_depth, rev_depth) = counts.strand_base_depths();
    record.set_info(
        &format!("{}STRANDAF", prefix),
        &format!(
            "{},{},{},{}",
            counts.forward[i], fwd_depth, counts.reverse[i], rev_depth
        ),
    );

    record.set_info(
        &format!("{}POSITIVE_STRAND_FREQUENCIES", prefix),
        &join_narrow(&BaseCounts::narrow(&counts.forward)),
    );
    record.set_info(
        &format!("{}NEGATIVE_STRAND_FREQUENCIES", prefix),
        &join_narrow(&BaseCounts::narrow(&counts.reverse)),
    );
}

fn zero_fields(record: &mut VariantRecord, prefix: &str) {
    record.set_info(&format!("{}AF", prefix), "0");
    record.set_info(&format!("{}STRANDAF", prefix), "0,0,0,0");
    record.set_info(
        &format!("{}POSITIVE_STRAND_FREQUENCIES", prefix),
        "0,0,0,0,0,0",
    );
    record.set_info(
        &format!("{}NEGATIVE_STRAND_FREQUENCIES", prefix),
        "0,0,0,0,0,0",
    );
}

fn join_narrow(row: &[u32; Allele::NARROW_COUNT]) -> String {
    row.iter().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::pileup::PileupConfig;
    use std::io::Cursor;

    fn pileup(lines: &str) -> Pileup {
        Pileup::from_reader(Cursor::new(lines), &PileupConfig::default(), false).unwrap()
    }

    fn record(pos: u64, ref_allele: &str, alt_allele: &str) -> VariantRecord {
        VariantRecord::from_fields("ref1", pos, "var0", ref_allele, alt_allele, ".")
    }

    #[test]
    fn test_primary_fields() {
        // 6 reference A forward, 4 alt T forward at position 5.
        let pileup = pileup("ref1\t5\tA\t10\t......TTTT\tFFFFFFFFFF\n");
        let annotator = Annotator::new().with_primary(&pileup);
        let mut rec = record(5, "A", "T");
        annotator.annotate(&mut rec);
        assert_eq!(rec.info("AF"), "0.400000");
        assert_eq!(rec.info("STRANDAF"), "4,10,0,0");
        assert_eq!(rec.info("POSITIVE_STRAND_FREQUENCIES"), "6,0,0,4,0,0");
        assert_eq!(rec.info("NEGATIVE_STRAND_FREQUENCIES"), "0,0,0,0,0,0");
        assert!(!rec.has_info("ILLUMINA_AF"));
    }

    #[test]
    fn test_aux_prefix() {
        let primary = pileup("ref1\t5\tA\t4\t..TT\tFFFF\n");
        let aux = pileup("ref1\t5\tA\t4\tTTTT\tFFFF\n");
        let annotator = Annotator::new().with_primary(&primary).with_aux(&aux);
        let mut rec = record(5, "A", "T");
        annotator.annotate(&mut rec);
        assert_eq!(rec.info("AF"), "0.500000");
        assert_eq!(rec.info("ILLUMINA_AF"), "1.000000");
        assert_eq!(rec.info("ILLUMINA_STRANDAF"), "4,4,0,0");
    }

    #[test]
    fn test_missing_contig_zeroes() {
        let pileup = pileup("ref2\t5\tA\t4\t..TT\tFFFF\n");
        let annotator = Annotator::new().with_primary(&pileup);
        let mut rec = record(5, "A", "T");
        annotator.annotate(&mut rec);
        assert_eq!(rec.info("AF"), "0.000000");
        assert_eq!(rec.info("STRANDAF"), "0,0,0,0");
    }

    #[test]
    fn test_indel_fields_zeroed() {
        let pileup = pileup("ref1\t5\tA\t4\t..TT\tFFFF\n");
        let annotator = Annotator::new().with_primary(&pileup);
        let mut rec = record(5, "AT", "A");
        annotator.annotate(&mut rec);
        assert_eq!(rec.info("AF"), "0");
        assert_eq!(rec.info("STRANDAF"), "0,0,0,0");
        assert_eq!(rec.info("POSITIVE_STRAND_FREQUENCIES"), "0,0,0,0,0,0");
    }

    #[test]
    fn test_indel_markers_excluded_from_depth() {
        // 8 reads: 4 ref, 2 alt T, 2 also report an insertion. AF denominator
        // stays at the 8 base observations.
        let pileup = pileup("ref1\t5\tA\t8\t....TT.+2AC.+2AC\tFFFFFFFF\n");
        let annotator = Annotator::new().with_primary(&pileup);
        let mut rec = record(5, "A", "T");
        annotator.annotate(&mut rec);
        assert_eq!(rec.info("AF"), "0.250000");
    }
}
