//! The canonical single-locus variant representation.
//!
//! A [`VariantRecord`] wraps one tab-delimited record line. The first eight
//! fields (chromosome, 1-based position, id, ref, alt, quality placeholder,
//! filter placeholder, `;`-joined info) are interpreted; any trailing
//! genotype columns ride along verbatim. Rendering a record back out
//! reproduces unmodified input byte-for-byte.
//!
//! The ordering key is derived on demand from the current field values and is
//! never cached, so mutating position/ref/alt cannot leave a stale key
//! behind.

use crate::core::error::{PilevarError, Result};
use std::collections::BTreeSet;

/// Composite identity of a variant: two records describe the same variant iff
/// all four components match. Orders by chromosome, then numeric position,
/// then ref, then alt.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariantKey {
    pub chrom: String,
    pub pos: u64,
    pub ref_allele: String,
    pub alt_allele: String,
}

/// One variant record plus the set of source indices supporting it.
#[derive(Debug, Clone)]
pub struct VariantRecord {
    tokens: Vec<String>,
    support: BTreeSet<usize>,
}

impl VariantRecord {
    /// Parse a tab-delimited record line. Fails when fewer than eight fields
    /// are present or the position field is non-numeric.
    pub fn parse(line: &str) -> Result<VariantRecord> {
        let tokens: Vec<String> = line.split('\t').map(|t| t.to_string()).collect();
        if tokens.len() < 8 {
            return Err(PilevarError::format("fewer than 8 fields", line));
        }
        tokens[1]
            .parse::<u64>()
            .map_err(|_| PilevarError::Parse(format!("Non-numeric position: {}", tokens[1])))?;
        Ok(VariantRecord {
            tokens,
            support: BTreeSet::new(),
        })
    }

    /// Build a record from the eight interpreted fields.
    pub fn from_fields(
        chrom: &str,
        pos: u64,
        id: &str,
        ref_allele: &str,
        alt_allele: &str,
        info: &str,
    ) -> VariantRecord {
        VariantRecord {
            tokens: vec![
                chrom.to_string(),
                pos.to_string(),
                id.to_string(),
                ref_allele.to_string(),
                alt_allele.to_string(),
                ".".to_string(),
                ".".to_string(),
                info.to_string(),
            ],
            support: BTreeSet::new(),
        }
    }

    /// Render the record as a tab-delimited line, trailing columns included.
    pub fn to_line(&self) -> String {
        self.tokens.join("\t")
    }

    /// Render only the eight interpreted fields, dropping trailing genotype
    /// columns. This is the merge output format.
    pub fn to_core_line(&self) -> String {
        self.tokens[..8].join("\t")
    }

    /// The derived ordering/equality key for the current field values.
    pub fn key(&self) -> VariantKey {
        VariantKey {
            chrom: self.chromosome().to_string(),
            pos: self.pos(),
            ref_allele: self.ref_allele().to_string(),
            alt_allele: self.alt_allele().to_string(),
        }
    }

    pub fn chromosome(&self) -> &str {
        &self.tokens[0]
    }

    pub fn set_chromosome(&mut self, chrom: &str) {
        self.tokens[0] = chrom.to_string();
    }

    /// 1-based position. The field is validated numeric at construction and
    /// only written through [`set_pos`](Self::set_pos).
    pub fn pos(&self) -> u64 {
        self.tokens[1]
            .parse()
            .expect("position field validated at construction")
    }

    pub fn set_pos(&mut self, pos: u64) {
        self.tokens[1] = pos.to_string();
    }

    pub fn id(&self) -> &str {
        &self.tokens[2]
    }

    pub fn set_id(&mut self, id: &str) {
        self.tokens[2] = id.to_string();
    }

    pub fn ref_allele(&self) -> &str {
        &self.tokens[3]
    }

    pub fn set_ref_allele(&mut self, seq: &str) {
        self.tokens[3] = seq.to_string();
    }

    pub fn alt_allele(&self) -> &str {
        &self.tokens[4]
    }

    pub fn set_alt_allele(&mut self, seq: &str) {
        self.tokens[4] = seq.to_string();
    }

    /// Whether this is a single-base substitution.
    pub fn is_snv(&self) -> bool {
        self.ref_allele().len() == 1 && self.alt_allele().len() == 1
    }

    /// The raw `;`-joined info field.
    pub fn raw_info(&self) -> &str {
        &self.tokens[7]
    }

    /// Collapse doubled `;;` separators left behind by upstream tools.
    pub fn tidy_info(&mut self) {
        while self.tokens[7].contains(";;") {
            self.tokens[7] = self.tokens[7].replace(";;", ";");
        }
    }

    /// The value of an info key, or the empty string when absent. Flag tokens
    /// without `=` are never matched.
    pub fn info(&self, key: &str) -> &str {
        for token in self.tokens[7].split(';') {
            if let Some(eq) = token.find('=') {
                if &token[..eq] == key {
                    return &token[eq + 1..];
                }
            }
        }
        ""
    }

    pub fn has_info(&self, key: &str) -> bool {
        self.tokens[7].split(';').any(|token| {
            token
                .find('=')
                .map_or(false, |eq| &token[..eq] == key)
        })
    }

    /// Update the first `key=value` token in place, preserving the order of
    /// all other tokens, or append a new token when the key is absent.
    pub fn set_info(&mut self, key: &str, val: &str) {
        if self.tokens[7] == "." {
            self.tokens[7] = format!("{}={}", key, val);
            return;
        }
        let mut segments: Vec<String> =
            self.tokens[7].split(';').map(|t| t.to_string()).collect();
        for segment in segments.iter_mut() {
            if let Some(eq) = segment.find('=') {
                if &segment[..eq] == key {
                    *segment = format!("{}={}", key, val);
                    self.tokens[7] = segments.join(";");
                    return;
                }
            }
        }
        self.tokens[7].push_str(&format!(";{}={}", key, val));
    }

    /// Merge another record for the same variant into this one: union the
    /// support sets and copy over info keys absent here. Existing keys are
    /// never overwritten.
    pub fn merge(&mut self, other: &VariantRecord) {
        for &sample in &other.support {
            self.support.insert(sample);
        }
        for token in other.tokens[7].split(';') {
            if let Some(eq) = token.find('=') {
                let (key, val) = (&token[..eq], &token[eq + 1..]);
                if !self.has_info(key) {
                    self.set_info(key, val);
                }
            }
        }
    }

    pub fn add_support(&mut self, source: usize) {
        self.support.insert(source);
    }

    pub fn support(&self) -> &BTreeSet<usize> {
        &self.support
    }

    /// Render the support set as a bitmap over `num_sources` sources.
    pub fn support_vector(&self, num_sources: usize) -> String {
        let mut vec = vec![b'0'; num_sources];
        for &source in &self.support {
            if source < num_sources {
                vec[source] = b'1';
            }
        }
        String::from_utf8(vec).expect("bitmap is ASCII")
    }
}
