//! Consistency checking of a variant set against read alignments.
//!
//! Allele counts are rebuilt directly from SAM alignment records by walking
//! each read's CIGAR string, then every sufficiently covered position is
//! compared against the variant set. The checker reports three kinds of
//! disagreement: a position without a call where the reference allele is
//! rare, a called position where the reference allele is still common, and a
//! called position where the recorded ALT allele is rare.

use crate::call::alleles::{Allele, AlleleRow};
use crate::core::error::{PilevarError, Result};
use crate::genome::Genome;
use crate::variant::record::VariantRecord;
use log::warn;
use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;

/// Thresholds governing which positions are flagged.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// Minimum base-call coverage before a position is examined.
    pub coverage_threshold: u32,
    /// Flag a missed variant (or a wrong ALT) when the expected allele's
    /// proportion falls below this value.
    pub missed_variant_freq: f64,
    /// Flag a false positive when the reference proportion exceeds this
    /// value at a called position.
    pub false_positive_freq: f64,
    /// Upper bound on contig length when sizing count tables.
    pub max_genome_len: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            coverage_threshold: 20,
            missed_variant_freq: 0.6,
            false_positive_freq: 0.4,
            max_genome_len: 31_000,
        }
    }
}

/// One inconsistency found by the checker.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    DuplicatePosition {
        chrom: String,
        pos: u64,
    },
    MissedVariant {
        chrom: String,
        pos: u64,
        ref_base: char,
        ref_prop: f64,
        freqs: AlleleRow,
    },
    FalsePositive {
        chrom: String,
        pos: u64,
        ref_base: char,
        alt_base: char,
        ref_prop: f64,
        freqs: AlleleRow,
    },
    WrongAlt {
        chrom: String,
        pos: u64,
        alt_base: char,
        alt_prop: f64,
        freqs: AlleleRow,
    },
}

fn freqs_to_string(freqs: &AlleleRow) -> String {
    format!(
        "A:{}, C:{}, G:{}, T:{}, N:{}, INS:{}, DEL:{}",
        freqs[0], freqs[1], freqs[2], freqs[3], freqs[4], freqs[5], freqs[6]
    )
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Finding::DuplicatePosition { chrom, pos } => {
                write!(f, "Multiple variants at position: {}:{}", chrom, pos)
            }
            Finding::MissedVariant {
                chrom,
                pos,
                ref_base,
                ref_prop,
                freqs,
            } => write!(
                f,
                "Possible missed variant at {}:{}; Ref allele = {}; Ref proportion = {:.3}; Allele freqs = {}",
                chrom,
                pos,
                ref_base,
                ref_prop,
                freqs_to_string(freqs)
            ),
            Finding::FalsePositive {
                chrom,
                pos,
                ref_base,
                alt_base,
                ref_prop,
                freqs,
            } => write!(
                f,
                "Possible false positive at {}:{}; Ref allele = {}; Alt allele = {}; Ref proportion = {:.3}; Allele freqs = {}",
                chrom,
                pos,
                ref_base,
                alt_base,
                ref_prop,
                freqs_to_string(freqs)
            ),
            Finding::WrongAlt {
                chrom,
                pos,
                alt_base,
                alt_prop,
                freqs,
            } => write!(
                f,
                "Possible wrong ALT at {}:{}; Alt allele = {}; Alt proportion = {:.3}; Allele freqs = {}",
                chrom,
                pos,
                alt_base,
                alt_prop,
                freqs_to_string(freqs)
            ),
        }
    }
}

/// Per-contig allele counts recovered from read alignments.
#[derive(Debug, Default)]
pub struct AlignmentCounts {
    contigs: BTreeMap<String, Vec<AlleleRow>>,
}

impl AlignmentCounts {
    /// Accumulate counts from SAM text. Header lines and unmapped records
    /// (`*` RNAME or CIGAR) are skipped. Alignments reaching past
    /// `max_genome_len` are a fatal error.
    pub fn from_sam_reader<R: BufRead>(reader: R, max_genome_len: usize) -> Result<Self> {
        let mut counts = AlignmentCounts::default();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() || line.starts_with('@') {
                continue;
            }
            let tokens: Vec<&str> = line.split('\t').collect();
            if tokens.len() < 10 {
                warn!("Skipping short alignment line: {}", line);
                continue;
            }
            let chrom = tokens[2];
            let cigar = tokens[5];
            if chrom == "*" || cigar == "*" {
                continue;
            }
            let pos = match tokens[3].parse::<usize>() {
                Ok(p) if p > 0 => p,
                _ => {
                    warn!("Skipping alignment with bad position: {}", line);
                    continue;
                }
            };
            counts.add_alignment(chrom, pos, cigar, tokens[9], max_genome_len)?;
        }
        Ok(counts)
    }

    /// Walk one alignment's CIGAR and credit its observations.
    fn add_alignment(
        &mut self,
        chrom: &str,
        pos: usize,
        cigar: &str,
        seq: &str,
        max_genome_len: usize,
    ) -> Result<()> {
        let rows = self.contigs.entry(chrom.to_string()).or_default();
        let seq = seq.as_bytes();

        let mut ref_pos = pos;
        let mut query_pos = 0usize;
        let mut len = 0usize;
        for c in cigar.chars() {
            if let Some(d) = c.to_digit(10) {
                len = len * 10 + d as usize;
                continue;
            }
            let consumes_ref = matches!(c, 'M' | 'D' | 'N' | '=' | 'X');
            let consumes_query = matches!(c, 'M' | 'I' | 'S' | '=' | 'X');
            if consumes_ref && !consumes_query {
                // Deletion or reference skip: the span is covered with no
                // query base.
                Self::ensure(rows, chrom, ref_pos + len - 1, max_genome_len)?;
                for j in 0..len {
                    rows[ref_pos + j - 1][Allele::Del.index()] += 1;
                }
            } else if consumes_query && !consumes_ref {
                // Insertion or clip: recorded at the anchor position.
                Self::ensure(rows, chrom, ref_pos, max_genome_len)?;
                rows[ref_pos - 1][Allele::Ins.index()] += 1;
            } else if consumes_query && consumes_ref {
                Self::ensure(rows, chrom, ref_pos + len - 1, max_genome_len)?;
                for j in 0..len {
                    let allele = seq
                        .get(query_pos + j)
                        .and_then(|&b| Allele::from_base(b as char))
                        .unwrap_or(Allele::N);
                    rows[ref_pos + j - 1][allele.index()] += 1;
                }
            }
            if consumes_ref {
                ref_pos += len;
            }
            if consumes_query {
                query_pos += len;
            }
            len = 0;
        }
        Ok(())
    }

    fn ensure(
        rows: &mut Vec<AlleleRow>,
        chrom: &str,
        pos: usize,
        max_genome_len: usize,
    ) -> Result<()> {
        if pos > max_genome_len {
            return Err(PilevarError::Bounds {
                contig: chrom.to_string(),
                position: pos as u64,
                bound: max_genome_len,
            });
        }
        if rows.len() < pos {
            rows.resize(pos, [0u32; Allele::COUNT]);
        }
        Ok(())
    }

    pub fn contig(&self, name: &str) -> Option<&[AlleleRow]> {
        self.contigs.get(name).map(|r| r.as_slice())
    }
}

/// A variant set indexed by position for the consistency scan. Only the
/// first character of REF and ALT participates, matching the single-base
/// granularity of the count tables.
#[derive(Debug, Default)]
pub struct VariantIndex {
    by_pos: BTreeMap<(String, u64), (char, char)>,
}

impl VariantIndex {
    /// Load records from variant text, reporting duplicate positions as
    /// findings rather than errors.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<(VariantIndex, Vec<Finding>)> {
        let mut index = VariantIndex::default();
        let mut findings = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record = VariantRecord::parse(&line)?;
            let key = (record.chromosome().to_string(), record.pos());
            let ref_base = record.ref_allele().chars().next().unwrap_or('N');
            let alt_base = record.alt_allele().chars().next().unwrap_or('N');
            if index.by_pos.contains_key(&key) {
                findings.push(Finding::DuplicatePosition {
                    chrom: key.0,
                    pos: key.1,
                });
            } else {
                index.by_pos.insert(key, (ref_base, alt_base));
            }
        }
        Ok((index, findings))
    }

    pub fn get(&self, chrom: &str, pos: u64) -> Option<(char, char)> {
        self.by_pos.get(&(chrom.to_string(), pos)).copied()
    }

    pub fn len(&self) -> usize {
        self.by_pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pos.is_empty()
    }
}

/// Scan every covered position and report disagreements between the count
/// tables and the variant set.
pub fn check_variants(
    counts: &AlignmentCounts,
    genome: &Genome,
    variants: &VariantIndex,
    config: &CheckConfig,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (chrom, rows) in &counts.contigs {
        if genome.contig(chrom).is_none() {
            warn!("Alignments reference unknown contig {}", chrom);
            continue;
        }
        for (i, row) in rows.iter().enumerate() {
            let pos = i as u64 + 1;
            let total: u32 = row[..5].iter().sum();
            if total < config.coverage_threshold {
                continue;
            }
            let Some(ref_base) = genome.base(chrom, pos) else {
                continue;
            };
            let ref_allele = Allele::from_base(ref_base).unwrap_or(Allele::N);
            let ref_prop = f64::from(row[ref_allele.index()]) / f64::from(total);

            match variants.get(chrom, pos) {
                None => {
                    if ref_prop < config.missed_variant_freq {
                        findings.push(Finding::MissedVariant {
                            chrom: chrom.clone(),
                            pos,
                            ref_base,
                            ref_prop,
                            freqs: *row,
                        });
                    }
                }
                Some((_, alt_base)) => {
                    let alt_allele = Allele::from_base(alt_base).unwrap_or(Allele::N);
                    if ref_prop > config.false_positive_freq {
                        findings.push(Finding::FalsePositive {
                            chrom: chrom.clone(),
                            pos,
                            ref_base,
                            alt_base,
                            ref_prop,
                            freqs: *row,
                        });
                    } else if alt_allele.index() < 4 {
                        let alt_prop = f64::from(row[alt_allele.index()]) / f64::from(total);
                        if alt_prop < config.missed_variant_freq {
                            findings.push(Finding::WrongAlt {
                                chrom: chrom.clone(),
                                pos,
                                alt_base,
                                alt_prop,
                                freqs: *row,
                            });
                        }
                    }
                }
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sam_line(chrom: &str, pos: usize, cigar: &str, seq: &str) -> String {
        format!(
            "read\t0\t{}\t{}\t60\t{}\t*\t0\t0\t{}\t*\n",
            chrom, pos, cigar, seq
        )
    }

    fn counts_from(lines: &str) -> AlignmentCounts {
        AlignmentCounts::from_sam_reader(Cursor::new(lines), 31_000).unwrap()
    }

    #[test]
    fn test_match_counts() {
        let counts = counts_from(&sam_line("ref1", 5, "4M", "ACGT"));
        let rows = counts.contig("ref1").unwrap();
        assert_eq!(rows[4][Allele::A.index()], 1);
        assert_eq!(rows[5][Allele::C.index()], 1);
        assert_eq!(rows[6][Allele::G.index()], 1);
        assert_eq!(rows[7][Allele::T.index()], 1);
    }

    #[test]
    fn test_deletion_span_and_insertion_anchor() {
        let counts = counts_from(&sam_line("ref1", 5, "2M3D1M2I1M", "ACGTTA"));
        let rows = counts.contig("ref1").unwrap();
        // Deletion covers positions 7-9.
        assert_eq!(rows[6][Allele::Del.index()], 1);
        assert_eq!(rows[7][Allele::Del.index()], 1);
        assert_eq!(rows[8][Allele::Del.index()], 1);
        // Insertion anchored at position 11, just past the 1M.
        assert_eq!(rows[10][Allele::Ins.index()], 1);
        // The final match lands at position 11 with the base after the
        // inserted pair.
        assert_eq!(rows[10][Allele::A.index()], 1);
    }

    #[test]
    fn test_soft_clip_does_not_consume_reference() {
        let counts = counts_from(&sam_line("ref1", 10, "2S3M", "TTACG"));
        let rows = counts.contig("ref1").unwrap();
        assert_eq!(rows[9][Allele::A.index()], 1);
        assert_eq!(rows[10][Allele::C.index()], 1);
        assert_eq!(rows[11][Allele::G.index()], 1);
    }

    #[test]
    fn test_unmapped_records_skipped() {
        let counts = counts_from("read\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\t*\n");
        assert!(counts.contig("*").is_none());
    }

    #[test]
    fn test_alignment_past_bound_fails() {
        let err = AlignmentCounts::from_sam_reader(Cursor::new(sam_line("ref1", 99, "5M", "ACGTA")), 100)
            .unwrap_err();
        assert!(matches!(err, PilevarError::Bounds { .. }));
    }

    #[test]
    fn test_duplicate_position_finding() {
        let text = "ref1\t10\tvar0\tA\tC\t.\t.\t.\nref1\t10\tvar1\tA\tG\t.\t.\t.\n";
        let (index, findings) = VariantIndex::from_reader(Cursor::new(text)).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(
            findings,
            vec![Finding::DuplicatePosition {
                chrom: "ref1".to_string(),
                pos: 10
            }]
        );
    }

    #[test]
    fn test_missed_variant_and_false_positive() {
        // 30 reads at position 1: 10 ref A, 20 alt C. No call there, so the
        // low reference proportion is a possible missed variant. At position
        // 2 all 30 reads match the reference but a call exists, a possible
        // false positive.
        let mut sam = String::new();
        for _ in 0..10 {
            sam.push_str(&sam_line("ref1", 1, "2M", "AC"));
        }
        for _ in 0..20 {
            sam.push_str(&sam_line("ref1", 1, "2M", "CC"));
        }
        let counts = counts_from(&sam);
        let genome = Genome::from_reader(Cursor::new(">ref1\nAC\n")).unwrap();
        let (index, _) =
            VariantIndex::from_reader(Cursor::new("ref1\t2\tvar0\tC\tG\t.\t.\t.\n")).unwrap();

        let findings = check_variants(&counts, &genome, &index, &CheckConfig::default());
        assert_eq!(findings.len(), 2);
        assert!(matches!(
            findings[0],
            Finding::MissedVariant { pos: 1, ref_base: 'A', .. }
        ));
        assert!(matches!(
            findings[1],
            Finding::FalsePositive { pos: 2, alt_base: 'G', .. }
        ));
    }

    #[test]
    fn test_wrong_alt() {
        // Called C->G at position 1, but the reads support T.
        let mut sam = String::new();
        for _ in 0..25 {
            sam.push_str(&sam_line("ref1", 1, "1M", "T"));
        }
        let counts = counts_from(&sam);
        let genome = Genome::from_reader(Cursor::new(">ref1\nC\n")).unwrap();
        let (index, _) =
            VariantIndex::from_reader(Cursor::new("ref1\t1\tvar0\tC\tG\t.\t.\t.\n")).unwrap();

        let findings = check_variants(&counts, &genome, &index, &CheckConfig::default());
        assert_eq!(findings.len(), 1);
        assert!(matches!(
            findings[0],
            Finding::WrongAlt { pos: 1, alt_base: 'G', .. }
        ));
    }
}
