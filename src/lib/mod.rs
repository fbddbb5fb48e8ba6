//! PILEVAR: pileup-driven variant calling and cross-sample merging
//!
//! Pilevar turns per-position pileup summaries into variant calls and carries
//! them through a small downstream pipeline. The library provides
//! functionality for:
//! 1. Threshold-based variant calling from pileup text
//! 2. Indel normalization and multi-base record splitting
//! 3. Merging calls across samples with per-sample support tracking
//! 4. Re-grouping adjacent substitutions into multi-base records
//! 5. Frequency annotation, alignment-based validation, and table conversion
//!
//! # Modules
//!
//! The main modules are:
//! - [`call`]: pileup parsing and threshold-based variant calling
//! - [`variant`]: the variant record model, normalization, and splitting
//! - [`merge`]: cross-sample merging with support vectors
//! - [`combine`]: adjacency-based re-grouping of substitutions
//! - [`annotate`]: per-source allele-frequency annotation
//! - [`check`]: validation of a variant set against read alignments
//! - [`convert`]: conversion of tabular variant reports
//! - [`genome`]: reference genome access
//! - [`core`]: I/O, error, and concurrency plumbing

pub mod annotate;
pub mod call;
pub mod check;
pub mod combine;
pub mod convert;
pub mod core;
pub mod genome;
pub mod merge;
pub mod variant;

pub mod prelude {
    pub use crate::call::alleles::{Allele, BaseCounts};
    pub use crate::call::caller::{call_variants, CallerConfig};
    pub use crate::call::pileup::{Pileup, PileupConfig};
    pub use crate::combine::{AdjacencyCombiner, OrfIndex};
    pub use crate::core::prelude::*;
    pub use crate::genome::Genome;
    pub use crate::merge::CrossSampleMerger;
    pub use crate::variant::record::{VariantKey, VariantRecord};
}

#[cfg(test)]
mod tests {
    use crate::annotate::Annotator;
    use crate::call::caller::{call_variants, CallerConfig};
    use crate::call::pileup::{Pileup, PileupConfig};
    use crate::combine::AdjacencyCombiner;
    use crate::merge::CrossSampleMerger;
    use std::io::Cursor;

    fn pileup(text: &str) -> Pileup {
        Pileup::from_reader(Cursor::new(text), &PileupConfig::default(), true).unwrap()
    }

    #[test]
    fn test_call_merge_annotate_combine_pipeline() {
        // Sample 1 carries substitutions at positions 10 and 11, sample 2
        // only the first.
        let sample1 = format!(
            "ref1\t10\tA\t100\t{}{}\nref1\t11\tT\t100\t{}{}\n",
            ".".repeat(80),
            "C".repeat(20),
            ".".repeat(70),
            "G".repeat(30)
        );
        let sample2 = format!("ref1\t10\tA\t100\t{}{}\n", ".".repeat(80), "C".repeat(20));
        let p1 = pileup(&sample1);
        let p2 = pileup(&sample2);

        let config = CallerConfig::default();
        let calls1 = call_variants(&p1, &config).unwrap();
        let calls2 = call_variants(&p2, &config).unwrap();
        assert_eq!(calls1.len(), 2);
        assert_eq!(calls2.len(), 1);

        let mut merger = CrossSampleMerger::new();
        merger.add_source(calls1);
        merger.add_source(calls2);
        let mut merged = merger.finish();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].info("SUPP_VEC"), "11");
        assert_eq!(merged[0].info("SUPP"), "2");
        assert_eq!(merged[1].info("SUPP_VEC"), "10");

        let annotator = Annotator::new().with_primary(&p1);
        for record in merged.iter_mut() {
            annotator.annotate(record);
        }
        assert_eq!(merged[0].info("AF"), "0.200000");
        assert_eq!(merged[1].info("AF"), "0.300000");

        let combined = AdjacencyCombiner::new().combine(merged);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined[0].ref_allele(), "AT");
        assert_eq!(combined[0].alt_allele(), "CG");
        assert_eq!(combined[0].info("SUPP_VEC"), "10");
        assert_eq!(combined[1].alt_allele(), "CT");
        assert_eq!(combined[1].info("SUPP_VEC"), "01");
    }
}
