use strum_macros::{EnumIter, FromRepr};

/// The number of distinct symbols an observation can take.
pub const NUM_ALLELES: usize = 6;

/// A single observed symbol at a SNP site.
/// The ordering here is also the tie-breaking order anywhere alleles compete with identical scores.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, EnumIter, Eq, FromRepr, Hash, Ord, PartialEq, PartialOrd)]
pub enum Allele {
    A=0,
    C=1,
    G=2,
    T=3,
    N=4,
    /// A deletion in the read at the site; also used as the synthetic root of every path
    #[default]
    Gap=5
}

impl Allele {
    /// Converts a sequence base into an allele, anything that is not ACGT (ignoring case) is `N`
    pub fn from_base(base: u8) -> Allele {
        match base.to_ascii_uppercase() {
            b'A' => Allele::A,
            b'C' => Allele::C,
            b'G' => Allele::G,
            b'T' => Allele::T,
            b'-' | b'_' | b'*' => Allele::Gap,
            _ => Allele::N
        }
    }

    /// Returns the ASCII symbol for the allele, gaps are rendered as `_`
    pub fn to_base(self) -> u8 {
        match self {
            Allele::A => b'A',
            Allele::C => b'C',
            Allele::G => b'G',
            Allele::T => b'T',
            Allele::N => b'N',
            Allele::Gap => b'_'
        }
    }

    /// Returns the Watson-Crick complement, `N` and gaps map to themselves
    pub fn complement(self) -> Allele {
        match self {
            Allele::A => Allele::T,
            Allele::C => Allele::G,
            Allele::G => Allele::C,
            Allele::T => Allele::A,
            other => other
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Allele {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_base() as char)
    }
}

/// Per-allele evidence counts for one site (or one history/site pair).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AlleleCounts {
    counts: [u64; NUM_ALLELES]
}

impl AlleleCounts {
    pub fn new(counts: [u64; NUM_ALLELES]) -> AlleleCounts {
        AlleleCounts { counts }
    }

    pub fn get(&self, allele: Allele) -> u64 {
        self.counts[allele.index()]
    }

    pub fn add(&mut self, allele: Allele, amount: u64) {
        self.counts[allele.index()] += amount;
    }

    /// Removes up to `amount` from an allele, the count never drops below 0.
    /// Returns the amount that was actually removed.
    pub fn subtract(&mut self, allele: Allele, amount: u64) -> u64 {
        let slot = &mut self.counts[allele.index()];
        let removed = (*slot).min(amount);
        *slot -= removed;
        removed
    }

    /// Element-wise sum, used when merging partial tables
    pub fn merge(&mut self, other: &AlleleCounts) {
        for (l, &r) in self.counts.iter_mut().zip(other.counts.iter()) {
            *l += r;
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterates over the alleles with a non-zero count, in allele order
    pub fn iter_nonzero(&self) -> impl Iterator<Item=(Allele, u64)> + '_ {
        self.counts.iter().enumerate()
            .filter(|(_i, &c)| c > 0)
            .map(|(i, &c)| (Allele::from_repr(i as u8).unwrap_or_default(), c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_base_conversion() {
        for allele in Allele::iter() {
            assert_eq!(Allele::from_base(allele.to_base()), allele);
            assert_eq!(Allele::from_repr(allele as u8), Some(allele));
        }
        assert_eq!(Allele::from_base(b'a'), Allele::A);
        assert_eq!(Allele::from_base(b'R'), Allele::N);
        assert_eq!(Allele::from_base(b'*'), Allele::Gap);
        assert_eq!(Allele::G.complement(), Allele::C);
        assert_eq!(Allele::Gap.complement(), Allele::Gap);
        assert_eq!(format!("{}", Allele::Gap), "_");
    }

    #[test]
    fn test_clamped_subtraction() {
        let mut counts = AlleleCounts::new([3, 0, 5, 0, 0, 1]);
        assert_eq!(counts.total(), 9);
        assert_eq!(counts.subtract(Allele::A, 2), 2);
        assert_eq!(counts.get(Allele::A), 1);
        assert_eq!(counts.subtract(Allele::A, 10), 1);
        assert_eq!(counts.get(Allele::A), 0);
        assert_eq!(counts.subtract(Allele::C, 1), 0);
        assert_eq!(counts.get(Allele::C), 0);

        let nonzero: Vec<(Allele, u64)> = counts.iter_nonzero().collect();
        assert_eq!(nonzero, vec![(Allele::G, 5), (Allele::Gap, 1)]);
    }

    #[test]
    fn test_merge() {
        let mut lhs = AlleleCounts::new([1, 2, 3, 4, 5, 6]);
        let rhs = AlleleCounts::new([1; NUM_ALLELES]);
        lhs.merge(&rhs);
        assert_eq!(lhs, AlleleCounts::new([2, 3, 4, 5, 6, 7]));
        assert!(!lhs.is_empty());
        assert!(AlleleCounts::default().is_empty());
    }
}
