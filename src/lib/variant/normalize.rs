//! Indel canonicalization and compound-substitution splitting.
//!
//! Run on every record before cross-sample merging so that all sources agree
//! on one representation per variant: shorthand indel encodings are expanded,
//! shared prefix/suffix bases are trimmed to a minimal left-anchored form,
//! and any remaining multi-base substitution is decomposed into per-base
//! records.

use crate::variant::record::VariantRecord;

/// Canonicalize one record in place.
///
/// Legacy single-source shorthand is expanded first: an alt of `-SEQ` means
/// "SEQ deleted after ref" and becomes ref=`ref+SEQ`, alt=`ref`; an alt of
/// `+SEQ` means "SEQ inserted after ref" and becomes alt=`ref+SEQ`. Then,
/// while both alleles are longer than one base, matching trailing characters
/// are trimmed from the right, and matching leading characters are trimmed
/// from the left with the position advancing by one per base.
pub fn normalize(record: &mut VariantRecord) {
    let alt = record.alt_allele().to_string();
    if let Some(deleted) = alt.strip_prefix('-') {
        let old_ref = record.ref_allele().to_string();
        record.set_ref_allele(&format!("{}{}", old_ref, deleted));
        record.set_alt_allele(&old_ref);
    } else if let Some(inserted) = alt.strip_prefix('+') {
        let new_alt = format!("{}{}", record.ref_allele(), inserted);
        record.set_alt_allele(&new_alt);
    }

    loop {
        let ref_allele = record.ref_allele();
        let alt_allele = record.alt_allele();
        if ref_allele.len() <= 1 || alt_allele.len() <= 1 {
            break;
        }
        let rb = ref_allele.as_bytes();
        let ab = alt_allele.as_bytes();
        if rb[rb.len() - 1] == ab[ab.len() - 1] {
            let new_ref = ref_allele[..rb.len() - 1].to_string();
            let new_alt = alt_allele[..ab.len() - 1].to_string();
            record.set_ref_allele(&new_ref);
            record.set_alt_allele(&new_alt);
        } else if rb[0] == ab[0] {
            let new_ref = ref_allele[1..].to_string();
            let new_alt = alt_allele[1..].to_string();
            record.set_pos(record.pos() + 1);
            record.set_ref_allele(&new_ref);
            record.set_alt_allele(&new_alt);
        } else {
            break;
        }
    }
}

/// Decompose a normalized multi-base substitution into one record per aligned
/// base. Records where ref and alt are still of length one pass through
/// unchanged.
///
/// The walk emits a single-base substitution at `pos + i` for each aligned
/// pair; the final record absorbs any trailing excess of the longer allele.
/// Emitted records whose ref equals alt case-insensitively are dropped. Ids
/// other than `.` get an `_i` suffix per emitted record.
pub fn split(record: &VariantRecord) -> Vec<VariantRecord> {
    let ref_allele = record.ref_allele().to_string();
    let alt_allele = record.alt_allele().to_string();
    if ref_allele.len() == 1 || alt_allele.len() == 1 {
        return vec![record.clone()];
    }

    let mut out = Vec::new();
    let mut i = 0;
    while i < ref_allele.len() && i < alt_allele.len() {
        let mut cur = record.clone();
        cur.set_ref_allele(&ref_allele[i..i + 1]);
        cur.set_alt_allele(&alt_allele[i..i + 1]);
        if i == ref_allele.len() - 1 && alt_allele.len() > ref_allele.len() {
            cur.set_alt_allele(&alt_allele[i..]);
        }
        if i == alt_allele.len() - 1 && ref_allele.len() > alt_allele.len() {
            cur.set_ref_allele(&ref_allele[i..]);
        }
        cur.set_pos(record.pos() + i as u64);
        if record.id() != "." {
            cur.set_id(&format!("{}_{}", record.id(), i));
        }
        if !cur.ref_allele().eq_ignore_ascii_case(cur.alt_allele()) {
            out.push(cur);
        }
        i += 1;
    }
    out
}
