//! Reading-frame start positions derived from gene annotation.
//!
//! Only `CDS` rows contribute. Each interval emits its codon start positions
//! (`start, start+3, ...` while a full codon remains); lookups return the
//! greatest start at or below a query position.

use crate::core::error::Result;
use log::warn;
use std::collections::BTreeSet;
use std::io::BufRead;

#[derive(Debug, Default)]
pub struct OrfIndex {
    starts: BTreeSet<u64>,
}

impl OrfIndex {
    /// Parse GFF-style tab-delimited interval rows. Rows with fewer than five
    /// columns or a feature type other than `CDS` are ignored; rows with
    /// non-numeric coordinates are skipped with a warning.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<OrfIndex> {
        let mut starts = BTreeSet::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens: Vec<&str> = line.split('\t').collect();
            if tokens.len() < 5 || tokens[2] != "CDS" {
                continue;
            }
            let (start, end) = match (tokens[3].parse::<u64>(), tokens[4].parse::<u64>()) {
                (Ok(start), Ok(end)) if start > 0 => (start, end),
                _ => {
                    warn!("Skipping CDS row with bad coordinates: {}", line);
                    continue;
                }
            };
            let mut pos = start;
            while pos + 2 <= end {
                starts.insert(pos);
                pos += 3;
            }
        }
        Ok(OrfIndex { starts })
    }

    /// The greatest codon start at or below `pos`.
    pub fn floor(&self, pos: u64) -> Option<u64> {
        self.starts.range(..=pos).next_back().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn index(gff: &str) -> OrfIndex {
        OrfIndex::from_reader(Cursor::new(gff)).unwrap()
    }

    #[test]
    fn test_codon_starts() {
        let orf = index("ref1\tsrc\tCDS\t21\t29\t.\t+\t0\tID=gene1\n");
        // 21..=29 holds exactly three codons.
        assert_eq!(orf.len(), 3);
        assert_eq!(orf.floor(20), None);
        assert_eq!(orf.floor(21), Some(21));
        assert_eq!(orf.floor(25), Some(24));
        assert_eq!(orf.floor(100), Some(27));
    }

    #[test]
    fn test_partial_codon_excluded() {
        // 10..=13 holds one full codon and one spare base.
        let orf = index("ref1\tsrc\tCDS\t10\t13\t.\t+\t0\t.\n");
        assert_eq!(orf.len(), 1);
        assert_eq!(orf.floor(13), Some(10));
    }

    #[test]
    fn test_non_cds_rows_ignored() {
        let orf = index(
            "# comment\n\
             ref1\tsrc\tgene\t1\t90\t.\t+\t0\t.\n\
             ref1\tsrc\texon\t1\t30\t.\t+\t0\t.\n",
        );
        assert!(orf.is_empty());
    }
}
