//! Re-grouping of adjacent single-base substitutions into multi-base,
//! haplotype-aware calls.
//!
//! The combiner walks the sorted merged set maintaining a run of adjacent
//! substitutions. Indels encountered mid-run are parked in a pending buffer
//! and flushed right after the run they interrupted. When a run is
//! finalized, each sample's ALT sequence across the run's span is
//! reconstructed from the records it supports, samples are grouped by
//! identical ALT sequence, and one combined record is emitted per distinct
//! non-reference ALT.

pub mod orf;

pub use orf::OrfIndex;

use crate::genome::Genome;
use crate::variant::record::VariantRecord;
use log::warn;
use std::collections::BTreeMap;

/// Combines adjacent substitution records, optionally constrained to shared
/// reading-frame windows and gap-filled from a reference genome.
#[derive(Debug, Default)]
pub struct AdjacencyCombiner<'a> {
    genome: Option<&'a Genome>,
    orf: Option<&'a OrfIndex>,
}

impl<'a> AdjacencyCombiner<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_genome(mut self, genome: &'a Genome) -> Self {
        self.genome = Some(genome);
        self
    }

    pub fn with_orf(mut self, orf: &'a OrfIndex) -> Self {
        self.orf = Some(orf);
        self
    }

    /// True when both positions fall inside the same codon window. Without
    /// gene annotation every pair passes.
    fn same_frame(&self, a: u64, b: u64) -> bool {
        let Some(orf) = self.orf else {
            return true;
        };
        match (orf.floor(a), orf.floor(b)) {
            (Some(fa), Some(fb)) => fa == fb && a <= fa + 2 && b <= fb + 2,
            _ => false,
        }
    }

    /// Whether `entry` is close enough to extend a run ending in `last`:
    /// same chromosome, position at most one past the run's last member.
    fn within_reach(last: &VariantRecord, entry: &VariantRecord) -> bool {
        entry.chromosome() == last.chromosome() && entry.pos() <= last.pos() + 1
    }

    fn extends_run(&self, last: &VariantRecord, entry: &VariantRecord) -> bool {
        Self::within_reach(last, entry) && self.same_frame(last.pos(), entry.pos())
    }

    /// Combine a record set. Input is sorted by composite key first, so the
    /// output order is deterministic for any input order.
    pub fn combine(&self, mut records: Vec<VariantRecord>) -> Vec<VariantRecord> {
        records.sort_by(|a, b| a.key().cmp(&b.key()));

        let mut out = Vec::new();
        let mut run: Vec<VariantRecord> = Vec::new();
        let mut pending: Vec<VariantRecord> = Vec::new();

        for entry in records {
            if entry.is_snv() {
                let extends = run.last().map_or(true, |last| self.extends_run(last, &entry));
                if !extends {
                    self.finalize_run(&mut run, &mut pending, &mut out);
                }
                run.push(entry);
            } else if run.last().map_or(false, |last| Self::within_reach(last, &entry)) {
                // An indel inside the current run: hold it until the run is
                // finalized so position order survives.
                pending.push(entry);
            } else {
                self.finalize_run(&mut run, &mut pending, &mut out);
                out.push(entry);
            }
        }
        self.finalize_run(&mut run, &mut pending, &mut out);
        out
    }

    fn finalize_run(
        &self,
        run: &mut Vec<VariantRecord>,
        pending: &mut Vec<VariantRecord>,
        out: &mut Vec<VariantRecord>,
    ) {
        if !run.is_empty() {
            self.process_run(run, out);
            run.clear();
        }
        out.append(pending);
    }

    /// Emit the combined record(s) for one run of adjacent substitutions.
    fn process_run(&self, entries: &[VariantRecord], out: &mut Vec<VariantRecord>) {
        let chrom = entries[0].chromosome().to_string();
        let min_pos = entries[0].pos();
        let max_pos = entries[entries.len() - 1].pos();
        let span = (max_pos - min_pos + 1) as usize;

        // Reference characters across the span: genome first where available,
        // then the explicit ref characters from the contributing records.
        let mut refs = vec![0u8; span];
        if let Some(genome) = self.genome {
            for (j, slot) in refs.iter_mut().enumerate() {
                if let Some(base) = genome.base(&chrom, min_pos + j as u64) {
                    *slot = base as u8;
                }
            }
        }
        for entry in entries {
            let off = (entry.pos() - min_pos) as usize;
            let ref_base = entry.ref_allele().as_bytes()[0];
            if refs[off] != 0 && refs[off] != ref_base {
                warn!(
                    "Reference disagreement at {}:{}: {} vs {}",
                    chrom,
                    entry.pos(),
                    refs[off] as char,
                    ref_base as char
                );
            }
            refs[off] = ref_base;
        }
        for slot in refs.iter_mut() {
            if *slot == 0 {
                *slot = b'N';
            }
        }

        let num_samples = entries[0].info("SUPP_VEC").len();

        if num_samples == 0 {
            // No per-sample attribution: emit one union record.
            let mut alt = refs.clone();
            for entry in entries {
                overlay(&mut alt, entry, min_pos);
            }
            if alt != refs {
                let mut copy = entries[0].clone();
                copy.set_ref_allele(&String::from_utf8_lossy(&refs));
                copy.set_alt_allele(&String::from_utf8_lossy(&alt));
                out.push(copy);
            }
            return;
        }

        // Reconstruct each sample's ALT sequence across the span.
        let mut alts = vec![refs.clone(); num_samples];
        for entry in entries {
            let supp_vec = entry.info("SUPP_VEC").to_string();
            for (sample, bit) in supp_vec.chars().enumerate().take(num_samples) {
                if bit == '0' {
                    continue;
                }
                overlay(&mut alts[sample], entry, min_pos);
            }
        }

        // Group samples by identical reconstructed ALT.
        let mut groups: BTreeMap<Vec<u8>, Vec<usize>> = BTreeMap::new();
        for (sample, alt) in alts.iter().enumerate() {
            groups.entry(alt.clone()).or_default().push(sample);
        }

        for (alt, samples) in groups {
            if alt == refs {
                continue;
            }
            let mut copy = entries[0].clone();
            copy.set_ref_allele(&String::from_utf8_lossy(&refs));
            copy.set_alt_allele(&String::from_utf8_lossy(&alt));
            let mut supp_vec = vec![b'0'; num_samples];
            for sample in samples {
                supp_vec[sample] = b'1';
            }
            copy.set_info("SUPP_VEC", &String::from_utf8_lossy(&supp_vec));
            out.push(copy);
        }
    }
}

/// Write an entry's ALT characters into a span-local sequence at the entry's
/// offset.
fn overlay(seq: &mut [u8], entry: &VariantRecord, min_pos: u64) {
    let off = (entry.pos() - min_pos) as usize;
    for (j, base) in entry.alt_allele().bytes().enumerate() {
        if off + j < seq.len() {
            seq[off + j] = base;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(pos: u64, ref_allele: &str, alt_allele: &str, supp_vec: &str) -> VariantRecord {
        let info = if supp_vec.is_empty() {
            ".".to_string()
        } else {
            format!("SUPP_VEC={};SUPP={}", supp_vec, supp_vec.matches('1').count())
        };
        VariantRecord::from_fields("ref1", pos, ".", ref_allele, alt_allele, &info)
    }

    #[test]
    fn test_adjacent_pair_combines() {
        let combiner = AdjacencyCombiner::new();
        let out = combiner.combine(vec![
            record(100, "A", "C", "1"),
            record(101, "T", "G", "1"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pos(), 100);
        assert_eq!(out[0].ref_allele(), "AT");
        assert_eq!(out[0].alt_allele(), "CG");
        assert_eq!(out[0].info("SUPP_VEC"), "1");
    }

    #[test]
    fn test_distant_records_stay_separate() {
        let combiner = AdjacencyCombiner::new();
        let out = combiner.combine(vec![
            record(100, "A", "C", "1"),
            record(105, "T", "G", "1"),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].ref_allele(), "A");
        assert_eq!(out[1].ref_allele(), "T");
    }

    #[test]
    fn test_orf_boundary_blocks_combination() {
        // Codons start at 99 and 102: positions 101 and 102 straddle the
        // boundary and must remain separate.
        let orf = OrfIndex::from_reader(Cursor::new("ref1\ts\tCDS\t99\t104\t.\t+\t0\t.\n"))
            .unwrap();
        let combiner = AdjacencyCombiner::new().with_orf(&orf);
        let out = combiner.combine(vec![
            record(101, "A", "C", "1"),
            record(102, "T", "G", "1"),
        ]);
        assert_eq!(out.len(), 2);

        // Positions 99 and 100 share the first codon and combine.
        let out = combiner.combine(vec![
            record(99, "A", "C", "1"),
            record(100, "T", "G", "1"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ref_allele(), "AT");
    }

    #[test]
    fn test_outside_any_orf_blocks_combination() {
        let orf = OrfIndex::from_reader(Cursor::new("ref1\ts\tCDS\t200\t205\t.\t+\t0\t.\n"))
            .unwrap();
        let combiner = AdjacencyCombiner::new().with_orf(&orf);
        let out = combiner.combine(vec![
            record(100, "A", "C", "1"),
            record(101, "T", "G", "1"),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_sample_grouping_by_alt_sequence() {
        // Sample 0 carries both substitutions, sample 1 only the first.
        let out = AdjacencyCombiner::new().combine(vec![
            record(100, "A", "C", "11"),
            record(101, "T", "G", "10"),
        ]);
        assert_eq!(out.len(), 2);
        // BTreeMap order: "CG" < "CT".
        assert_eq!(out[0].alt_allele(), "CG");
        assert_eq!(out[0].info("SUPP_VEC"), "10");
        assert_eq!(out[1].alt_allele(), "CT");
        assert_eq!(out[1].info("SUPP_VEC"), "01");
    }

    #[test]
    fn test_pending_indel_flushed_after_run() {
        let out = AdjacencyCombiner::new().combine(vec![
            record(100, "A", "C", "1"),
            record(101, "TCG", "T", "1"),
            record(101, "T", "G", "1"),
        ]);
        // The run 100-101 combines; the indel at 101 follows it.
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].ref_allele(), "AT");
        assert_eq!(out[0].alt_allele(), "CG");
        assert_eq!(out[1].ref_allele(), "TCG");
    }

    #[test]
    fn test_standalone_indel_passes_through() {
        let out = AdjacencyCombiner::new().combine(vec![record(100, "ACG", "A", "1")]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ref_allele(), "ACG");
    }

    #[test]
    fn test_genome_reference_agrees_with_records() {
        let genome = Genome::from_reader(Cursor::new(">ref1\nNNNNNNNNNAATT\n")).unwrap();
        let combiner = AdjacencyCombiner::new().with_genome(&genome);
        let out = combiner.combine(vec![
            record(10, "A", "C", "1"),
            record(11, "A", "G", "1"),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ref_allele(), "AA");
        assert_eq!(out[0].alt_allele(), "CG");
    }

    #[test]
    fn test_zero_sample_union() {
        let out = AdjacencyCombiner::new().combine(vec![
            record(100, "A", "C", ""),
            record(101, "T", "G", ""),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].ref_allele(), "AT");
        assert_eq!(out[0].alt_allele(), "CG");
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let combiner = AdjacencyCombiner::new();
        let first = combiner.combine(vec![
            record(100, "A", "C", "1"),
            record(101, "T", "G", "1"),
            record(200, "G", "A", "1"),
        ]);
        let lines: Vec<String> = first.iter().map(|r| r.to_line()).collect();
        let again = combiner.combine(first);
        let lines_again: Vec<String> = again.iter().map(|r| r.to_line()).collect();
        assert_eq!(lines, lines_again);
    }
}
