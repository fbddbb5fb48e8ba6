//! The single-source calling path: allele model, pileup-encoding parsing, and
//! the threshold caller.

pub mod alleles;
pub mod caller;
pub mod pileup;

pub use alleles::{Allele, AlleleRow, BaseCounts};
pub use caller::{call_variants, CallerConfig};
pub use pileup::{allele_counts, consensus_indel, Pileup, PileupConfig};
