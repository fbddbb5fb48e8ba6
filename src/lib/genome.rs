//! Reference genome loading.
//!
//! Contig name is the FASTA header text up to the first space; sequence lines
//! are concatenated per contig. Read-only after construction.

use crate::core::error::{PilevarError, Result};
use bio::io::fasta;
use log::info;
use rustc_hash::FxHashMap;
use std::io::Read;

#[derive(Debug, Default)]
pub struct Genome {
    seqs: FxHashMap<String, Vec<u8>>,
}

impl Genome {
    /// Load FASTA text from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Genome> {
        let reader = fasta::Reader::new(reader);
        let mut seqs = FxHashMap::default();
        for record in reader.records() {
            let record = record.map_err(PilevarError::Io)?;
            seqs.insert(record.id().to_string(), record.seq().to_vec());
        }
        if seqs.is_empty() {
            return Err(PilevarError::EmptyData(
                "No sequences found in FASTA input".to_string(),
            ));
        }
        info!("Loaded reference genome with {} contigs", seqs.len());
        Ok(Genome { seqs })
    }

    pub fn contig(&self, name: &str) -> Option<&[u8]> {
        self.seqs.get(name).map(|s| s.as_slice())
    }

    /// The base at a 1-based position, if the contig covers it.
    pub fn base(&self, name: &str, pos: u64) -> Option<char> {
        if pos == 0 {
            return None;
        }
        self.seqs
            .get(name)
            .and_then(|s| s.get(pos as usize - 1))
            .map(|&b| b as char)
    }

    pub fn num_contigs(&self) -> usize {
        self.seqs.len()
    }
}
