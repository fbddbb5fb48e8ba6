//! The allele universe shared by the pileup parser, the caller, and the
//! annotator.
//!
//! Historically two table widths were in circulation for per-position counts:
//! a 7-slot layout (A, C, G, T, N, insertion, deletion) on the calling path
//! and a 6-slot layout without the deletion slot on the annotation path. Here
//! a single [`Allele`] enum with [`Allele::COUNT`] slots is canonical
//! everywhere; [`BaseCounts::narrow`] converts to the legacy 6-slot layout
//! where that wire format is still required.

use std::fmt;

/// One slot of the per-position count tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Allele {
    A = 0,
    C = 1,
    G = 2,
    T = 3,
    /// Ambiguous base. `<` and `>` (reference skips in pileup encoding) are
    /// counted here as well.
    N = 4,
    /// Insertion presence marker. Counts reads signaling an insertion, not
    /// the inserted bases themselves.
    Ins = 5,
    /// Deletion presence marker.
    Del = 6,
}

impl Allele {
    /// Number of canonical allele slots.
    pub const COUNT: usize = 7;

    /// Number of slots in the legacy annotation-path layout (no deletion).
    pub const NARROW_COUNT: usize = 6;

    /// Map a pileup/base character to its allele, case-insensitively.
    /// `<` and `>` map to `N`. Returns `None` for unrecognized characters.
    pub fn from_base(c: char) -> Option<Allele> {
        match c {
            'a' | 'A' => Some(Allele::A),
            'c' | 'C' => Some(Allele::C),
            'g' | 'G' => Some(Allele::G),
            't' | 'T' => Some(Allele::T),
            'n' | 'N' | '<' | '>' => Some(Allele::N),
            _ => None,
        }
    }

    /// The character emitted for this allele in a substitution call.
    pub fn to_base(self) -> char {
        match self {
            Allele::A => 'A',
            Allele::C => 'C',
            Allele::G => 'G',
            Allele::T => 'T',
            _ => 'N',
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The four substitution alleles in scan order.
    pub const BASES: [Allele; 4] = [Allele::A, Allele::C, Allele::G, Allele::T];
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Allele::Ins => write!(f, "INS"),
            Allele::Del => write!(f, "DEL"),
            other => write!(f, "{}", other.to_base()),
        }
    }
}

/// Per-position counts for one strand axis, indexed by [`Allele`].
pub type AlleleRow = [u32; Allele::COUNT];

/// The `[3][K]` count tensor for one position: total, forward strand, and
/// reverse strand rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BaseCounts {
    pub total: AlleleRow,
    pub forward: AlleleRow,
    pub reverse: AlleleRow,
}

impl BaseCounts {
    #[inline]
    pub fn add(&mut self, allele: Allele, forward: bool) {
        let i = allele.index();
        self.total[i] += 1;
        if forward {
            self.forward[i] += 1;
        } else {
            self.reverse[i] += 1;
        }
    }

    /// Site depth over every slot, indel presence markers included. This is
    /// the depth the threshold caller gates and divides by.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.total.iter().sum()
    }

    /// Depth over the five base slots only (A, C, G, T, N).
    #[inline]
    pub fn base_depth(&self) -> u32 {
        self.total[..5].iter().sum()
    }

    /// Per-strand totals over every slot, as `(forward, reverse)`.
    #[inline]
    pub fn strand_depths(&self) -> (u32, u32) {
        (self.forward.iter().sum(), self.reverse.iter().sum())
    }

    /// Per-strand totals over the five base slots only.
    #[inline]
    pub fn strand_base_depths(&self) -> (u32, u32) {
        (
            self.forward[..5].iter().sum(),
            self.reverse[..5].iter().sum(),
        )
    }

    #[inline]
    pub fn get(&self, allele: Allele) -> u32 {
        self.total[allele.index()]
    }

    /// Convert a strand row to the legacy 6-slot layout (A, C, G, T, N, INS),
    /// dropping the deletion slot.
    pub fn narrow(row: &AlleleRow) -> [u32; Allele::NARROW_COUNT] {
        let mut out = [0u32; Allele::NARROW_COUNT];
        out.copy_from_slice(&row[..Allele::NARROW_COUNT]);
        out
    }
}
