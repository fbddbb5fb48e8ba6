//! Threshold-based variant calling over decoded pileup tensors.

use crate::call::alleles::Allele;
use crate::call::pileup::{consensus_indel, Pileup};
use crate::core::error::{PilevarError, Result};
use crate::variant::record::VariantRecord;
use log::debug;
use rustc_hash::FxHashSet;

/// Thresholds driving the caller. No process-wide state: one of these is
/// passed explicitly to [`call_variants`].
#[derive(Debug, Clone)]
pub struct CallerConfig {
    /// Minimum site depth to consider a position at all.
    pub coverage_threshold: u32,
    /// Below this reference-allele fraction an ambiguous `N` is called when
    /// nothing else qualifies.
    pub ref_threshold: f64,
    /// Minimum alt-allele fraction to call a substitution.
    pub alt_threshold: f64,
    /// Minimum insertion- or deletion-presence fraction to call an indel.
    pub indel_threshold: f64,
    /// Prefix applied to the `AF` and `STRANDAF` info field names.
    pub flag_prefix: String,
}

impl Default for CallerConfig {
    fn default() -> Self {
        CallerConfig {
            coverage_threshold: 20,
            ref_threshold: 0.6,
            alt_threshold: 0.15,
            indel_threshold: 0.4,
            flag_prefix: String::new(),
        }
    }
}

impl CallerConfig {
    pub fn validate(&self) -> Result<()> {
        self.validate_threshold("ref_threshold", self.ref_threshold)?;
        self.validate_threshold("alt_threshold", self.alt_threshold)?;
        self.validate_threshold("indel_threshold", self.indel_threshold)?;
        Ok(())
    }

    fn validate_threshold(&self, field: &str, value: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(PilevarError::ThresholdValidation {
                field: field.to_string(),
                min: 0.0,
                max: 1.0,
                value,
            });
        }
        Ok(())
    }
}

/// The call made at one position.
enum Call {
    Substitution(Allele),
    Ambiguous,
    Insertion(String),
    Deletion(String),
}

impl Call {
    /// The tensor slot whose counts feed the AF/STRANDAF fields.
    fn allele(&self) -> Allele {
        match self {
            Call::Substitution(allele) => *allele,
            Call::Ambiguous => Allele::N,
            Call::Insertion(_) => Allele::Ins,
            Call::Deletion(_) => Allele::Del,
        }
    }
}

/// Scan every covered position of every contig and emit a record wherever the
/// thresholds indicate a variant. Contigs are visited in sorted name order;
/// the pileup must have been loaded with its read-bases fields retained so
/// consensus indel sequences can be recovered.
pub fn call_variants(pileup: &Pileup, config: &CallerConfig) -> Result<Vec<VariantRecord>> {
    config.validate()?;
    let mut records = Vec::new();
    let mut var_id = 0usize;

    for name in pileup.contig_names() {
        let contig = pileup.contig(name).expect("name taken from this pileup");
        // Positions consumed by a called deletion; the ambiguous-N fallback
        // skips them.
        let mut deleted: FxHashSet<usize> = FxHashSet::default();

        for i in 0..contig.len() {
            let counts = &contig.counts[i];
            let total = counts.depth();
            if total < config.coverage_threshold || total == 0 {
                continue;
            }
            let ref_char = (contig.refs[i] as char).to_ascii_uppercase();
            let ref_allele = Allele::from_base(ref_char).unwrap_or(Allele::N);

            // Highest-count qualifying alt among the four bases; ties keep
            // the first allele in A<C<G<T scan order.
            let mut alt: Option<Allele> = None;
            for base in Allele::BASES {
                if base == ref_allele {
                    continue;
                }
                if counts.get(base) as f64 >= total as f64 * config.alt_threshold {
                    match alt {
                        Some(cur) if counts.get(base) <= counts.get(cur) => {}
                        _ => alt = Some(base),
                    }
                }
            }

            let mut call = alt.map(Call::Substitution);

            if call.is_none() {
                let indel_cutoff = total as f64 * config.indel_threshold;
                let ins_qualifies = counts.get(Allele::Ins) as f64 >= indel_cutoff;
                let del_qualifies = counts.get(Allele::Del) as f64 >= indel_cutoff;
                if ins_qualifies || del_qualifies {
                    if let Some(seq) =
                        contig.bases_at(i).and_then(consensus_indel)
                    {
                        debug!(
                            "Indel at {}:{}: {:?} depth {}",
                            name,
                            i + 1,
                            counts.total,
                            total
                        );
                        if ins_qualifies {
                            call = Some(Call::Insertion(seq));
                        } else {
                            // The deleted span is consumed and must not be
                            // re-evaluated as substitution sites.
                            for j in i + 1..=i + seq.len() {
                                deleted.insert(j);
                            }
                            call = Some(Call::Deletion(seq));
                        }
                    }
                }
            }

            if call.is_none()
                && (counts.get(ref_allele) as f64) < total as f64 * config.ref_threshold
                && !deleted.contains(&i)
            {
                debug!(
                    "Calling N at {}:{}: {:?} ref {}",
                    name,
                    i + 1,
                    counts.total,
                    ref_char
                );
                call = Some(Call::Ambiguous);
            }

            let Some(call) = call else {
                continue;
            };

            let (ref_string, alt_string) = match &call {
                Call::Substitution(allele) => (ref_char.to_string(), allele.to_base().to_string()),
                Call::Ambiguous => (ref_char.to_string(), "N".to_string()),
                Call::Insertion(seq) => {
                    (ref_char.to_string(), format!("{}{}", ref_char, seq))
                }
                Call::Deletion(seq) => {
                    (format!("{}{}", ref_char, seq), ref_char.to_string())
                }
            };

            let allele = call.allele();
            let (total_forward, total_reverse) = counts.strand_depths();
            let info = format!(
                "{prefix}AF={af:.6};{prefix}STRANDAF={af_fwd},{fwd},{af_rev},{rev}",
                prefix = config.flag_prefix,
                af = counts.get(allele) as f64 / total as f64,
                af_fwd = counts.forward[allele.index()],
                fwd = total_forward,
                af_rev = counts.reverse[allele.index()],
                rev = total_reverse,
            );
            records.push(VariantRecord::from_fields(
                name,
                i as u64 + 1,
                &format!("var{}", var_id),
                &ref_string,
                &alt_string,
                &info,
            ));
            var_id += 1;
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::pileup::PileupConfig;
    use std::io::Cursor;

    fn pileup_from(lines: &[String]) -> Pileup {
        let text = lines.join("\n");
        Pileup::from_reader(Cursor::new(text), &PileupConfig::default(), true).unwrap()
    }

    fn pileup_line(pos: u64, ref_char: char, bases: &str) -> String {
        format!("ref1\t{}\t{}\t{}\t{}", pos, ref_char, bases.len(), bases)
    }

    #[test]
    fn test_substitution_call() {
        // Depth 100, ref A, alt C at 20: AF=0.200000.
        let bases = format!("{}{}", ".".repeat(80), "C".repeat(20));
        let pileup = pileup_from(&[pileup_line(10, 'A', &bases)]);
        let records = call_variants(&pileup, &CallerConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.pos(), 10);
        assert_eq!(rec.id(), "var0");
        assert_eq!(rec.ref_allele(), "A");
        assert_eq!(rec.alt_allele(), "C");
        assert_eq!(rec.info("AF"), "0.200000");
        assert_eq!(rec.info("STRANDAF"), "20,100,0,0");
    }

    #[test]
    fn test_below_coverage_threshold() {
        let bases = format!("{}{}", ".".repeat(8), "C".repeat(8));
        let pileup = pileup_from(&[pileup_line(10, 'A', &bases)]);
        let records = call_variants(&pileup, &CallerConfig::default()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_alt_tie_break_prefers_higher_count() {
        // C at 5, G at 10, both over threshold: G wins.
        let bases = format!("{}{}{}", ".".repeat(15), "C".repeat(5), "G".repeat(10));
        let pileup = pileup_from(&[pileup_line(1, 'A', &bases)]);
        let records = call_variants(&pileup, &CallerConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].alt_allele(), "G");
    }

    #[test]
    fn test_alt_tie_break_first_seen_on_equal_counts() {
        // C and G tied at 10: scan order keeps C.
        let bases = format!("{}{}{}", ".".repeat(10), "G".repeat(10), "C".repeat(10));
        let pileup = pileup_from(&[pileup_line(1, 'A', &bases)]);
        let records = call_variants(&pileup, &CallerConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].alt_allele(), "C");
    }

    #[test]
    fn test_insertion_call() {
        // 5 plain matches and 20 reads with a consensus +AC insertion; the
        // insertion fraction is 20/45.
        let bases = format!("{}{}", ".".repeat(5), ".+2AC".repeat(20));
        let pileup = pileup_from(&[pileup_line(5, 'T', &bases)]);
        let config = CallerConfig::default();
        let records = call_variants(&pileup, &config).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.ref_allele(), "T");
        assert_eq!(rec.alt_allele(), "TAC");
        assert_eq!(rec.info("AF"), "0.444444");
    }

    #[test]
    fn test_deletion_call_consumes_span() {
        // Deletion of CG after position 5; positions 6-7 would otherwise be
        // called N but are consumed by the deletion span.
        let del_bases = format!("{}{}", ".".repeat(10), ".-2CG".repeat(20));
        let starved = format!("{}{}", ".".repeat(10), "*".repeat(15));
        let pileup = pileup_from(&[
            pileup_line(5, 'A', &del_bases),
            pileup_line(6, 'C', &starved),
            pileup_line(7, 'G', &starved),
        ]);
        let records = call_variants(&pileup, &CallerConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.pos(), 5);
        assert_eq!(rec.ref_allele(), "ACG");
        assert_eq!(rec.alt_allele(), "A");
    }

    #[test]
    fn test_ambiguous_n_call() {
        // Ref at 0.5, no alt over 0.15: N is called with the N-slot AF.
        let bases = format!(
            "{}{}{}{}{}",
            ".".repeat(50),
            "C".repeat(10),
            "G".repeat(10),
            "T".repeat(10),
            "N".repeat(20)
        );
        let pileup = pileup_from(&[pileup_line(3, 'A', &bases)]);
        let records = call_variants(&pileup, &CallerConfig::default()).unwrap();
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.alt_allele(), "N");
        assert_eq!(rec.info("AF"), "0.200000");
    }

    #[test]
    fn test_flag_prefix() {
        let bases = format!("{}{}", ".".repeat(80), "C".repeat(20));
        let pileup = pileup_from(&[pileup_line(10, 'A', &bases)]);
        let config = CallerConfig {
            flag_prefix: "ONT_".to_string(),
            ..CallerConfig::default()
        };
        let records = call_variants(&pileup, &config).unwrap();
        assert_eq!(records[0].info("ONT_AF"), "0.200000");
        assert_eq!(records[0].info("AF"), "");
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let config = CallerConfig {
            alt_threshold: 1.5,
            ..CallerConfig::default()
        };
        assert!(call_variants(&Pileup::default(), &config).is_err());
    }
}
