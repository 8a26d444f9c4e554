use crate::chain_model::{ChainModel, Choice, Prediction};
use crate::data_types::alleles::Allele;
use crate::support_table::{History, SupportTable};

use log::{debug, trace, warn};
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// Strategy for picking one allele out of a prediction
pub trait SelectionPolicy {
    /// Picks a choice from a prediction, which always has at least one choice
    fn select(&mut self, prediction: &Prediction) -> Choice;
}

/// Always picks the most probable allele; ties go to the earliest choice, making this fully deterministic
#[derive(Clone, Copy, Debug, Default)]
pub struct MaxProbability;

impl SelectionPolicy for MaxProbability {
    fn select(&mut self, prediction: &Prediction) -> Choice {
        let mut best: Choice = prediction.choices()[0];
        for &choice in prediction.choices()[1..].iter() {
            if choice.probability > best.probability {
                best = choice;
            }
        }
        best
    }
}

/// Samples an allele in proportion to its probability
pub struct WeightedSampling<R: Rng> {
    rng: R
}

impl<R: Rng> WeightedSampling<R> {
    pub fn new(rng: R) -> WeightedSampling<R> {
        WeightedSampling {
            rng
        }
    }
}

impl<R: Rng> SelectionPolicy for WeightedSampling<R> {
    fn select(&mut self, prediction: &Prediction) -> Choice {
        let choices = prediction.choices();
        match WeightedIndex::new(choices.iter().map(|c| c.probability)) {
            Ok(dist) => choices[dist.sample(&mut self.rng)],
            Err(e) => {
                warn!("Failed to sample from {:?}, falling back to {:?}: {}", prediction.source(), choices[0].allele, e);
                choices[0]
            }
        }
    }
}

/// The two likelihood scores of a path
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PathScores {
    /// Sum of the log probabilities of each chosen allele under the chain model
    pub weighted: f64,
    /// Sum of the log of each chosen allele's raw count over the site's total count, or over the counts that backed
    /// the choice when suppression has left those larger than the site total
    pub unweighted: f64
}

/// One reconstructed haplotype, immutable once built
#[derive(Clone, Debug, PartialEq)]
pub struct HaplotypePath {
    /// One allele per site, `alleles[0]` is the root
    alleles: Vec<Allele>,
    scores: PathScores,
    /// The smallest raw count backing any informative step
    min_support: u64,
    /// The site where `min_support` was observed
    weakest_site: usize,
    /// The number of sites filled without any evidence
    uninformative_sites: usize
}

impl HaplotypePath {
    pub fn new(alleles: Vec<Allele>, scores: PathScores, min_support: u64, weakest_site: usize, uninformative_sites: usize) -> HaplotypePath {
        assert!(!alleles.is_empty());
        assert!(weakest_site < alleles.len());
        HaplotypePath {
            alleles,
            scores,
            min_support,
            weakest_site,
            uninformative_sites
        }
    }

    /// All alleles including the root, length `N+1`
    pub fn alleles(&self) -> &[Allele] {
        &self.alleles
    }

    /// The allele chosen at a site
    pub fn allele(&self, site: usize) -> Allele {
        self.alleles[site]
    }

    pub fn num_sites(&self) -> usize {
        self.alleles.len() - 1
    }

    pub fn scores(&self) -> PathScores {
        self.scores
    }

    pub fn weighted_logprob(&self) -> f64 {
        self.scores.weighted
    }

    pub fn unweighted_logprob(&self) -> f64 {
        self.scores.unweighted
    }

    pub fn min_support(&self) -> u64 {
        self.min_support
    }

    pub fn weakest_site(&self) -> usize {
        self.weakest_site
    }

    pub fn uninformative_sites(&self) -> usize {
        self.uninformative_sites
    }

    /// The SNP alleles of sites `1..=N` as a string
    pub fn snp_string(&self) -> String {
        self.alleles[1..].iter()
            .map(|a| a.to_base() as char)
            .collect()
    }
}

/// Walks sites `1..=N` choosing one allele per site from the chain model, building a single haplotype path.
/// Returns `None` if evidence is exhausted at any site, or if no site had any evidence at all.
/// # Arguments
/// * `num_sites` - the number of sites, `N`; must match the table
/// * `support_table` - the current evidence
/// * `policy` - how to choose an allele from each prediction
/// # Panics
/// * if `num_sites` does not match the support table
pub fn establish_path(num_sites: usize, support_table: &SupportTable, policy: &mut dyn SelectionPolicy) -> Option<HaplotypePath> {
    assert_eq!(num_sites, support_table.num_sites(), "site count does not match the support table");
    let model = ChainModel::new(support_table);
    let order: usize = model.order();

    let mut alleles: Vec<Allele> = Vec::with_capacity(num_sites+1);
    alleles.push(Allele::Gap);
    let mut history = History::empty();
    let mut scores: PathScores = Default::default();
    let mut min_support: u64 = u64::MAX;
    let mut weakest_site: usize = 0;
    let mut uninformative_sites: usize = 0;

    for site in 1..=num_sites {
        let prediction = match model.predict(&history, site) {
            Some(p) => p,
            None => {
                debug!("Evidence exhausted at site {}", site);
                return None;
            }
        };
        let choice = policy.select(&prediction);
        trace!("site {}: {:?} from {:?}", site, choice, prediction.source());

        // choices always carry a strictly positive probability, so the logs below are finite
        scores.weighted += choice.probability.ln();
        if prediction.is_informative() {
            // suppression only drains the histories a path used, so other histories can outlive the marginal
            let site_total: u64 = support_table.counts_at(site).total().max(prediction.total());
            scores.unweighted += (choice.count as f64 / site_total as f64).ln();
            if choice.count < min_support {
                min_support = choice.count;
                weakest_site = site;
            }
        } else {
            uninformative_sites += 1;
        }

        alleles.push(choice.allele);
        history.push(choice.allele, order);
    }

    if min_support == u64::MAX {
        // nothing along the path had any evidence behind it
        debug!("No informative sites left to build a path from");
        return None;
    }

    Some(HaplotypePath::new(alleles, scores, min_support, weakest_site, uninformative_sites))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::read_observations::ReadObservation;
    use crate::data_types::variant_set::VariantSet;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn get_table(num_sites: usize, order: usize, reads: &[(usize, &str, usize)]) -> SupportTable {
        let variant_set = VariantSet::new(
            "contig".to_string(),
            (1..=num_sites as u64).map(|p| p * 100).collect(),
            vec![vec![Allele::C, Allele::A]; num_sites]
        );
        let mut table = SupportTable::new(&variant_set, order);
        for &(first_site, s, copies) in reads.iter() {
            let alleles: Vec<Option<Allele>> = s.bytes()
                .map(|b| if b == b'.' { None } else { Some(Allele::from_base(b)) })
                .collect();
            for _ in 0..copies {
                table.add_observation(&ReadObservation::new("read".to_string(), first_site, alleles.clone()));
            }
        }
        table
    }

    #[test]
    fn test_max_probability_path() {
        // two strains, AAAA (x5) and CCCC (x2)
        let table = get_table(4, 1, &[(1, "AAAA", 5), (1, "CCCC", 2)]);
        let path = establish_path(4, &table, &mut MaxProbability).unwrap();
        assert_eq!(path.alleles().len(), 5);
        assert_eq!(path.num_sites(), 4);
        assert_eq!(path.allele(0), Allele::Gap);
        assert_eq!(path.snp_string(), "AAAA");
        assert_eq!(path.min_support(), 5);
        assert_eq!(path.weakest_site(), 1);
        assert_eq!(path.uninformative_sites(), 0);

        // site 1 is marginal (5/7), every transition after is certain
        let expected = (5.0f64 / 7.0).ln();
        assert!((path.weighted_logprob() - expected).abs() < 1e-9);
        assert!((path.unweighted_logprob() - 4.0 * expected).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let table = get_table(5, 2, &[(1, "ACGTA", 3), (2, "CGTC", 3), (1, "TCG", 2), (3, "GAA", 4)]);
        let first = establish_path(5, &table, &mut MaxProbability).unwrap();
        for _ in 0..10 {
            let again = establish_path(5, &table, &mut MaxProbability).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_tie_breaking() {
        // A and C are equally supported, allele order puts A first
        let table = get_table(1, 1, &[(1, "C", 2), (1, "A", 2)]);
        let path = establish_path(1, &table, &mut MaxProbability).unwrap();
        assert_eq!(path.snp_string(), "A");
    }

    #[test]
    fn test_uninformative_sites() {
        // site 2 has no reads at all, it is filled from the declared alleles (C first)
        let table = get_table(3, 1, &[(1, "A", 3), (3, "G", 2)]);
        let path = establish_path(3, &table, &mut MaxProbability).unwrap();
        assert_eq!(path.snp_string(), "ACG");
        assert_eq!(path.uninformative_sites(), 1);
        assert_eq!(path.min_support(), 2);
        assert_eq!(path.weakest_site(), 3);
        assert!((path.weighted_logprob() - 0.5f64.ln()).abs() < 1e-9);
        assert_eq!(path.unweighted_logprob(), 0.0);

        // with no evidence anywhere, no path
        let empty = get_table(2, 1, &[]);
        assert!(establish_path(2, &empty, &mut MaxProbability).is_none());
    }

    #[test]
    fn test_exhausted() {
        let mut table = get_table(2, 1, &[(1, "AC", 1)]);
        table.subtract(&History::empty(), 2, Allele::C, 1);
        table.subtract(&History::from_slice(&[Allele::A]), 2, Allele::C, 1);
        assert!(establish_path(2, &table, &mut MaxProbability).is_none());
    }

    #[test]
    fn test_unweighted_after_marginal_drained() {
        // GAT claims all of the site 2 and 3 marginals, but (C, A) -> T survives at site 3
        let mut table = get_table(3, 2, &[(1, "CAT", 2), (2, "AT", 1), (1, "G", 3)]);
        let first = establish_path(3, &table, &mut MaxProbability).unwrap();
        assert_eq!(first.snp_string(), "GAT");
        assert_eq!(first.min_support(), 3);
        crate::suppression::suppress(&mut table, &first, 1.0);
        assert!(table.counts_at(2).is_empty());
        assert!(table.counts_at(3).is_empty());

        let second = establish_path(3, &table, &mut MaxProbability).unwrap();
        assert_eq!(second.snp_string(), "CAT");
        assert_eq!(second.min_support(), 2);
        assert!(second.unweighted_logprob().is_finite());
        assert!(second.unweighted_logprob() <= 0.0);
        assert_eq!(second.unweighted_logprob(), 0.0);
    }

    #[test]
    fn test_weighted_sampling() {
        let table = get_table(3, 1, &[(1, "AAA", 3), (1, "CCC", 1), (1, "GGG", 1)]);
        let mut policy = WeightedSampling::new(StdRng::seed_from_u64(42));
        let mut seen_other = false;
        for _ in 0..200 {
            let path = establish_path(3, &table, &mut policy).unwrap();
            assert_eq!(path.alleles().len(), 4);
            // each strain is fully linked, so sampling only decides at site 1
            let snps = path.snp_string();
            assert!(snps == "AAA" || snps == "CCC" || snps == "GGG");
            assert!(path.weighted_logprob() < 0.0);
            if snps != "AAA" {
                seen_other = true;
            }
        }
        assert!(seen_other);

        // the same seed reproduces the same paths
        let mut p1 = WeightedSampling::new(StdRng::seed_from_u64(7));
        let mut p2 = WeightedSampling::new(StdRng::seed_from_u64(7));
        for _ in 0..20 {
            assert_eq!(establish_path(3, &table, &mut p1), establish_path(3, &table, &mut p2));
        }
    }
}
