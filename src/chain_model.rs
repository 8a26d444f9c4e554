use crate::data_types::alleles::{Allele, AlleleCounts};
use crate::support_table::{History, SupportTable};

use log::trace;

/// Where the counts backing a prediction came from
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EvidenceSource {
    /// Counts conditioned on a history of the given length
    Transition(usize),
    /// Unconditioned per-site counts
    Marginal,
    /// The site never had read evidence, the distribution is uniform over the declared alleles
    Uninformative
}

/// One candidate allele in a prediction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Choice {
    pub allele: Allele,
    pub probability: f64,
    /// The raw count backing this allele, 0 for uninformative predictions
    pub count: u64
}

/// A normalized distribution over the allele at one site
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Candidates with a non-zero probability, in tie-breaking order
    choices: Vec<Choice>,
    /// Sum of the counts of all choices
    total: u64,
    source: EvidenceSource
}

impl Prediction {
    fn from_counts(counts: &AlleleCounts, source: EvidenceSource) -> Prediction {
        let total = counts.total();
        assert!(total > 0);
        let choices = counts.iter_nonzero()
            .map(|(allele, count)| Choice {
                allele,
                probability: count as f64 / total as f64,
                count
            })
            .collect();
        Prediction {
            choices,
            total,
            source
        }
    }

    fn uniform(candidates: &[Allele]) -> Prediction {
        assert!(!candidates.is_empty());
        let probability = 1.0 / candidates.len() as f64;
        Prediction {
            choices: candidates.iter()
                .map(|&allele| Choice { allele, probability, count: 0 })
                .collect(),
            total: 0,
            source: EvidenceSource::Uninformative
        }
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn source(&self) -> EvidenceSource {
        self.source
    }

    pub fn is_informative(&self) -> bool {
        self.source != EvidenceSource::Uninformative
    }

    /// Returns the choice for a given allele, if it has non-zero probability
    pub fn choice(&self, allele: Allele) -> Option<&Choice> {
        self.choices.iter().find(|c| c.allele == allele)
    }
}

/// Order-L Markov predictor over the support table.
/// Looks up the counts for the longest available history first, then backs off to shorter histories, then to the
/// site marginals. Sites that never had evidence give a uniform prediction over their declared alleles.
pub struct ChainModel<'a> {
    support_table: &'a SupportTable
}

/// Used for sites that declare nothing usable
const DEFAULT_CANDIDATES: [Allele; 4] = [Allele::A, Allele::C, Allele::G, Allele::T];

impl<'a> ChainModel<'a> {
    pub fn new(support_table: &'a SupportTable) -> ChainModel<'a> {
        ChainModel {
            support_table
        }
    }

    pub fn order(&self) -> usize {
        self.support_table.order()
    }

    pub fn num_sites(&self) -> usize {
        self.support_table.num_sites()
    }

    /// Predicts the allele at `site` given the alleles chosen at the preceding sites.
    /// Returns `None` when the site had evidence that has since been fully consumed, i.e. evidence is exhausted.
    /// # Arguments
    /// * `history` - the most recent chosen alleles, at most `order` long and ending at `site-1`
    /// * `site` - the site to predict, in `1..=N`
    /// # Panics
    /// * if `site` or `history` are out of bounds for the table
    pub fn predict(&self, history: &History, site: usize) -> Option<Prediction> {
        for k in (1..=history.len()).rev() {
            let sub_history = history.suffix(k);
            if let Some(counts) = self.support_table.transition(&sub_history, site) {
                if !counts.is_empty() {
                    trace!("site {} using history {:?}", site, sub_history.as_slice());
                    return Some(Prediction::from_counts(counts, EvidenceSource::Transition(k)));
                }
            }
        }

        let marginal = self.support_table.counts_at(site);
        if !marginal.is_empty() {
            trace!("site {} falling back to marginal counts", site);
            return Some(Prediction::from_counts(marginal, EvidenceSource::Marginal));
        }

        if self.support_table.was_covered(site) {
            // there was evidence here and it has all been used up
            None
        } else {
            let declared: Vec<Allele> = self.support_table.declared_alleles(site).iter()
                .copied()
                .filter(|&a| a != Allele::Gap)
                .collect();
            if declared.is_empty() {
                Some(Prediction::uniform(&DEFAULT_CANDIDATES))
            } else {
                Some(Prediction::uniform(&declared))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::read_observations::ReadObservation;
    use crate::data_types::variant_set::VariantSet;

    fn obs(first_site: usize, s: &str) -> ReadObservation {
        ReadObservation::new(
            "read".to_string(),
            first_site,
            s.bytes().map(|b| if b == b'.' { None } else { Some(Allele::from_base(b)) }).collect()
        )
    }

    fn get_table(num_sites: usize, order: usize, reads: &[(usize, &str)]) -> SupportTable {
        let variant_set = VariantSet::new(
            "contig".to_string(),
            (1..=num_sites as u64).collect(),
            vec![vec![Allele::G, Allele::T]; num_sites]
        );
        let mut table = SupportTable::new(&variant_set, order);
        for &(first_site, s) in reads.iter() {
            table.add_observation(&obs(first_site, s));
        }
        table
    }

    #[test]
    fn test_conditional_prediction() {
        let table = get_table(2, 1, &[(1, "AC"), (1, "AC"), (1, "AG"), (1, "TG")]);
        let model = ChainModel::new(&table);

        let prediction = model.predict(&History::from_slice(&[Allele::A]), 2).unwrap();
        assert_eq!(prediction.source(), EvidenceSource::Transition(1));
        assert_eq!(prediction.total(), 3);
        let c = prediction.choice(Allele::C).unwrap();
        assert_eq!(c.count, 2);
        assert!((c.probability - 2.0 / 3.0).abs() < 1e-12);
        assert!(prediction.choice(Allele::T).is_none());

        // the root has no history, so site 1 is always marginal
        let prediction = model.predict(&History::empty(), 1).unwrap();
        assert_eq!(prediction.source(), EvidenceSource::Marginal);
        assert_eq!(prediction.choice(Allele::A).unwrap().count, 3);
    }

    #[test]
    fn test_marginal_fallback() {
        // nothing links site 1 to site 2, but site 2 has marginal counts
        let table = get_table(2, 1, &[(1, "A"), (2, "C"), (2, "C"), (2, "G")]);
        let model = ChainModel::new(&table);
        let prediction = model.predict(&History::from_slice(&[Allele::A]), 2).unwrap();
        assert_eq!(prediction.source(), EvidenceSource::Marginal);
        assert!((prediction.choice(Allele::C).unwrap().probability - 2.0 / 3.0).abs() < 1e-12);
        assert!((prediction.choice(Allele::G).unwrap().probability - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_backoff_to_shorter_history() {
        // the order-2 history (T, C) was never seen, but C -> G was
        let table = get_table(3, 2, &[(1, "ACG"), (2, "CG"), (2, "CA")]);
        let model = ChainModel::new(&table);
        let prediction = model.predict(&History::from_slice(&[Allele::T, Allele::C]), 3).unwrap();
        assert_eq!(prediction.source(), EvidenceSource::Transition(1));
        assert_eq!(prediction.choice(Allele::G).unwrap().count, 2);
        assert_eq!(prediction.choice(Allele::A).unwrap().count, 1);

        let prediction = model.predict(&History::from_slice(&[Allele::A, Allele::C]), 3).unwrap();
        assert_eq!(prediction.source(), EvidenceSource::Transition(2));
        assert_eq!(prediction.total(), 1);
    }

    #[test]
    fn test_uninformative_and_exhausted() {
        let mut table = get_table(2, 1, &[(1, "A")]);

        // site 2 was never covered, so it's uniform over the declared alleles
        let model = ChainModel::new(&table);
        let prediction = model.predict(&History::from_slice(&[Allele::A]), 2).unwrap();
        assert_eq!(prediction.source(), EvidenceSource::Uninformative);
        assert!(!prediction.is_informative());
        assert_eq!(prediction.choices().len(), 2);
        assert_eq!(prediction.choices()[0].allele, Allele::G);
        assert_eq!(prediction.choices()[0].probability, 0.5);

        // site 1 was covered, consuming it means exhaustion
        table.subtract(&History::empty(), 1, Allele::A, 1);
        let model = ChainModel::new(&table);
        assert!(model.predict(&History::empty(), 1).is_none());
    }
}
