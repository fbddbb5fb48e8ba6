//! Pileup-encoding parsing.
//!
//! The samtools "read bases" field encodes every read's allele at one
//! reference position in a compact escape-heavy string. [`allele_counts`]
//! decodes one such field into a [`BaseCounts`] tensor in a single
//! left-to-right scan; [`Pileup`] holds the decoded tensors for a whole file,
//! one growth-checked vector per contig.

use crate::call::alleles::{Allele, BaseCounts};
use crate::core::error::{PilevarError, Result};
use log::warn;
use rustc_hash::FxHashMap;
use std::io::BufRead;

/// Bounds configuration for pileup-backed position arrays.
#[derive(Debug, Clone)]
pub struct PileupConfig {
    /// Upper bound on contig length. A position at or past this bound is a
    /// fatal [`PilevarError::Bounds`].
    pub max_genome_len: usize,
}

impl Default for PileupConfig {
    fn default() -> Self {
        PileupConfig {
            max_genome_len: 31_000,
        }
    }
}

/// Decode one read-bases field into per-allele, per-strand counts.
///
/// Escapes handled: `.`/`,` reference match (forward/reverse), `+`/`-`
/// length-prefixed indels (strand from the case of the character following
/// the digits, `*` counting as forward), `*`/`#` mid-deletion placeholders
/// (forward/reverse), `$` end-of-read, `^` start-of-read followed by one
/// mapping-quality character. Explicit base calls count by case; `>`/`<`
/// count as forward/reverse `N`. Anything else is dropped without comment.
pub fn allele_counts(ref_base: char, bases: &str) -> BaseCounts {
    let mut counts = BaseCounts::default();
    let ref_allele = Allele::from_base(ref_base).unwrap_or(Allele::N);
    let b = bases.as_bytes();

    let mut i = 0;
    while i < b.len() {
        let c = b[i] as char;
        match c {
            '.' | ',' => counts.add(ref_allele, c == '.'),
            '+' | '-' => {
                let mut end = i;
                let mut len = 0usize;
                while end + 1 < b.len() && b[end + 1].is_ascii_digit() {
                    end += 1;
                    len = len * 10 + (b[end] - b'0') as usize;
                }
                // Strand comes from the base immediately after the digits.
                let forward = b
                    .get(end + 1)
                    .map_or(true, |&x| x.is_ascii_uppercase() || x == b'*');
                let allele = if c == '+' { Allele::Ins } else { Allele::Del };
                counts.add(allele, forward);
                // Jump past the inserted/deleted bases; they are presence
                // signals here, not independent calls.
                i = end + len;
            }
            '*' => counts.add(Allele::Del, true),
            '#' => counts.add(Allele::Del, false),
            '$' => {}
            '^' => {
                // Skip the mapping-quality character that follows.
                i += 1;
            }
            other => {
                if let Some(allele) = Allele::from_base(other) {
                    let forward = other.is_ascii_uppercase() || other == '>';
                    counts.add(allele, forward);
                }
            }
        }
        i += 1;
    }
    counts
}

/// Collect the inserted/deleted sequences from every indel signal in a
/// read-bases field, case-normalized to uppercase.
pub fn indel_sequences(bases: &str) -> Vec<String> {
    let b = bases.as_bytes();
    let mut seqs = Vec::new();
    let mut i = 0;
    while i < b.len() {
        if b[i] == b'+' || b[i] == b'-' {
            let mut end = i;
            let mut len = 0usize;
            while end + 1 < b.len() && b[end + 1].is_ascii_digit() {
                end += 1;
                len = len * 10 + (b[end] - b'0') as usize;
            }
            let stop = (end + 1 + len).min(b.len());
            let seq = &bases[end + 1..stop];
            seqs.push(seq.to_ascii_uppercase());
            i = stop;
            continue;
        }
        i += 1;
    }
    seqs
}

/// The consensus indel sequence at a site: the sequence carried by more than
/// 80% of the reads signaling an indel, if any.
pub fn consensus_indel(bases: &str) -> Option<String> {
    let seqs = indel_sequences(bases);
    if seqs.is_empty() {
        return None;
    }
    let mut freq: FxHashMap<&str, usize> = FxHashMap::default();
    for seq in &seqs {
        *freq.entry(seq.as_str()).or_insert(0) += 1;
    }
    let cutoff = 0.8 * seqs.len() as f64;
    freq.iter()
        .find(|(seq, &count)| !seq.is_empty() && count as f64 > cutoff)
        .map(|(seq, _)| seq.to_string())
}

/// Decoded pileup data for one contig.
#[derive(Debug, Default)]
pub struct PileupContig {
    /// Per-position count tensors, index 0 = position 1.
    pub counts: Vec<BaseCounts>,
    /// Reference character per position; `N` where the pileup had no row.
    pub refs: Vec<u8>,
    /// Raw read-bases field per position, kept only when requested.
    bases: Vec<Option<String>>,
}

impl PileupContig {
    /// Grow the per-position vectors to cover `pos0`, failing fast past the
    /// configured bound.
    fn ensure(&mut self, contig: &str, pos0: usize, bound: usize) -> Result<()> {
        if pos0 >= bound {
            return Err(PilevarError::Bounds {
                contig: contig.to_string(),
                position: pos0 as u64 + 1,
                bound,
            });
        }
        if self.counts.len() <= pos0 {
            self.counts.resize(pos0 + 1, BaseCounts::default());
            self.refs.resize(pos0 + 1, b'N');
            self.bases.resize(pos0 + 1, None);
        }
        Ok(())
    }

    /// The raw read-bases field at a position, when it was retained.
    pub fn bases_at(&self, pos0: usize) -> Option<&str> {
        self.bases.get(pos0).and_then(|b| b.as_deref())
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// A parsed pileup file: per-contig position count tensors plus the reference
/// characters observed in the pileup itself. Read-only after construction.
#[derive(Debug, Default)]
pub struct Pileup {
    contigs: FxHashMap<String, PileupContig>,
}

impl Pileup {
    /// Parse pileup text: tab-delimited rows of (contig, 1-based position,
    /// reference character, depth, read bases, ...). Lines starting with `@`
    /// are skipped; rows with fewer than five fields or a non-numeric
    /// position are skipped with a warning, silently under-counting depth at
    /// those sites.
    ///
    /// When `keep_bases` is set, the raw read-bases field is retained per
    /// position for later consensus-indel extraction.
    pub fn from_reader<R: BufRead>(
        reader: R,
        config: &PileupConfig,
        keep_bases: bool,
    ) -> Result<Pileup> {
        let mut pileup = Pileup::default();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() || line.starts_with('@') {
                continue;
            }
            let tokens: Vec<&str> = line.split('\t').collect();
            if tokens.len() < 5 {
                warn!("Skipping short pileup line: {}", line);
                continue;
            }
            let chrom = tokens[0];
            let pos0 = match tokens[1].parse::<usize>() {
                Ok(p) if p > 0 => p - 1,
                _ => {
                    warn!("Skipping pileup line with bad position: {}", line);
                    continue;
                }
            };
            let ref_char = tokens[2].chars().next().unwrap_or('N');

            let contig = pileup.contigs.entry(chrom.to_string()).or_default();
            contig.ensure(chrom, pos0, config.max_genome_len)?;
            contig.counts[pos0] = allele_counts(ref_char, tokens[4]);
            contig.refs[pos0] = ref_char as u8;
            if keep_bases {
                contig.bases[pos0] = Some(tokens[4].to_string());
            }
        }
        Ok(pileup)
    }

    pub fn contig(&self, name: &str) -> Option<&PileupContig> {
        self.contigs.get(name)
    }

    /// Contig names in sorted order.
    pub fn contig_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contigs.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// The count tensor at a 0-based position, if the contig and position
    /// were covered.
    pub fn counts_at(&self, chrom: &str, pos0: usize) -> Option<&BaseCounts> {
        self.contigs.get(chrom).and_then(|c| c.counts.get(pos0))
    }

    pub fn is_empty(&self) -> bool {
        self.contigs.is_empty()
    }
}
