use crate::data_types::alleles::{Allele, AlleleCounts};
use crate::data_types::read_observations::ReadObservation;
use crate::data_types::variant_set::VariantSet;

use bit_vec::BitVec;
use log::{debug, info, warn};
use rustc_hash::FxHashMap as HashMap;
use std::sync::{Arc, mpsc};
use threadpool::ThreadPool;

/// The largest Markov order supported, histories are stored inline with this capacity
pub const MAX_ORDER: usize = 8;

/// The most recent alleles chosen (or observed) before a site, oldest first.
/// Unused slots are always `Allele::Gap` so that equality and hashing only see the used prefix.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct History {
    alleles: [Allele; MAX_ORDER],
    len: u8
}

impl History {
    pub fn empty() -> History {
        Default::default()
    }

    /// Builds a history from a slice of alleles, oldest first.
    /// # Panics
    /// * if `alleles.len() > MAX_ORDER`
    pub fn from_slice(alleles: &[Allele]) -> History {
        assert!(alleles.len() <= MAX_ORDER, "history length {} exceeds {}", alleles.len(), MAX_ORDER);
        let mut history = History::empty();
        history.alleles[..alleles.len()].copy_from_slice(alleles);
        history.len = alleles.len() as u8;
        history
    }

    /// Appends an allele, dropping the oldest one if the history already holds `order` entries
    pub fn push(&mut self, allele: Allele, order: usize) {
        assert!(order > 0 && order <= MAX_ORDER);
        if self.len() < order {
            self.alleles[self.len()] = allele;
            self.len += 1;
        } else {
            self.alleles.copy_within(1..order, 0);
            self.alleles[order-1] = allele;
            for slot in self.alleles[order..].iter_mut() {
                *slot = Allele::Gap;
            }
            self.len = order as u8;
        }
    }

    /// Returns the most recent `k` alleles as a new history
    pub fn suffix(&self, k: usize) -> History {
        assert!(k <= self.len());
        History::from_slice(&self.as_slice()[self.len()-k..])
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[Allele] {
        &self.alleles[..self.len()]
    }
}

/// The evidence pool that haplotype paths are assembled from.
/// Holds per-site marginal allele counts and, for every site, counts conditioned on the alleles at the preceding
/// `1..=order` sites, as observed together on single reads.
#[derive(Clone, Debug)]
pub struct SupportTable {
    /// The number of real sites, `N`
    num_sites: usize,
    /// The Markov order, `L`
    order: usize,
    /// Marginal counts, index 0 is the root and is always empty
    marginals: Vec<AlleleCounts>,
    /// Conditional counts keyed on (site, history of the alleles at the sites right before it)
    transitions: HashMap<(usize, History), AlleleCounts>,
    /// Sites that had any read evidence when the table was built
    covered: BitVec,
    /// Candidate alleles for each site when there is no evidence at all
    declared_alleles: Vec<Vec<Allele>>
}

impl SupportTable {
    /// Creates an empty table for a variant set.
    /// # Arguments
    /// * `variant_set` - defines the number of sites and their declared alleles
    /// * `order` - the Markov order, must be in `1..=MAX_ORDER`
    /// # Panics
    /// * if `order` is out of range
    pub fn new(variant_set: &VariantSet, order: usize) -> SupportTable {
        assert!((1..=MAX_ORDER).contains(&order), "order must be in 1..={MAX_ORDER}, got {order}");
        let num_sites = variant_set.num_sites();
        let declared_alleles: Vec<Vec<Allele>> = (0..=num_sites)
            .map(|site| variant_set.declared_alleles(site).to_vec())
            .collect();

        SupportTable {
            num_sites,
            order,
            marginals: vec![Default::default(); num_sites+1],
            transitions: Default::default(),
            covered: BitVec::from_elem(num_sites+1, false),
            declared_alleles
        }
    }

    /// Adds the evidence from one read.
    /// Every observed allele adds to the site marginal, and for each run of `k` observed sites directly before it
    /// (with `k <= order`) the allele also adds to the count conditioned on that run.
    /// # Panics
    /// * if the observation extends past the last site
    pub fn add_observation(&mut self, observation: &ReadObservation) {
        let region = observation.region().clone();
        assert!(region.is_empty() || region.end <= self.num_sites+1, "observation {region:?} is out of bounds");

        let mut run: Vec<Allele> = Vec::with_capacity(region.len());
        for site in region {
            let allele = match observation.allele(site) {
                Some(a) => a,
                None => {
                    // the chain of consecutive observations is broken
                    run.clear();
                    continue;
                }
            };

            self.marginals[site].add(allele, 1);
            self.covered.set(site, true);

            let max_history = run.len().min(self.order);
            for k in 1..=max_history {
                let history = History::from_slice(&run[run.len()-k..]);
                self.transitions.entry((site, history))
                    .or_default()
                    .add(allele, 1);
            }
            run.push(allele);
        }
    }

    /// Sums another table into this one, both must describe the same sites and order
    pub fn merge(&mut self, other: SupportTable) {
        assert_eq!(self.num_sites, other.num_sites);
        assert_eq!(self.order, other.order);
        for (l, r) in self.marginals.iter_mut().zip(other.marginals.iter()) {
            l.merge(r);
        }
        for (key, counts) in other.transitions.into_iter() {
            self.transitions.entry(key)
                .or_default()
                .merge(&counts);
        }
        self.covered.or(&other.covered);
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn order(&self) -> usize {
        self.order
    }

    fn check_site(&self, site: usize) {
        assert!(site >= 1 && site <= self.num_sites, "site {} is outside 1..={}", site, self.num_sites);
    }

    fn check_history(&self, history: &History, site: usize) {
        self.check_site(site);
        assert!(history.len() <= self.order, "history length {} exceeds order {}", history.len(), self.order);
        assert!(history.len() < site, "history of length {} cannot precede site {}", history.len(), site);
    }

    /// Returns the remaining marginal counts at a site.
    /// # Panics
    /// * if `site` is not in `1..=N`
    pub fn counts_at(&self, site: usize) -> &AlleleCounts {
        self.check_site(site);
        &self.marginals[site]
    }

    /// Returns the remaining counts at `site` conditioned on `history`, `None` if that history was never observed.
    /// # Panics
    /// * if `site` is not in `1..=N`, or `history` is longer than the order or reaches before site 1
    pub fn transition(&self, history: &History, site: usize) -> Option<&AlleleCounts> {
        self.check_history(history, site);
        if history.is_empty() {
            Some(&self.marginals[site])
        } else {
            self.transitions.get(&(site, *history))
        }
    }

    /// Removes evidence for `allele` at `site` following `history`, clamped at zero.
    /// An empty history removes from the marginal counts.
    /// Returns the amount actually removed.
    /// # Panics
    /// * same conditions as `transition(...)`
    pub fn subtract(&mut self, history: &History, site: usize, allele: Allele, amount: u64) -> u64 {
        self.check_history(history, site);
        if history.is_empty() {
            self.marginals[site].subtract(allele, amount)
        } else {
            match self.transitions.get_mut(&(site, *history)) {
                Some(counts) => counts.subtract(allele, amount),
                None => 0
            }
        }
    }

    /// Returns true if the site had any read evidence when the table was built, regardless of later suppression
    pub fn was_covered(&self, site: usize) -> bool {
        self.check_site(site);
        self.covered.get(site).unwrap_or(false)
    }

    /// Returns the declared candidate alleles for a site
    pub fn declared_alleles(&self, site: usize) -> &[Allele] {
        self.check_site(site);
        &self.declared_alleles[site]
    }

    /// Returns the number of distinct (site, history) keys stored
    pub fn num_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// Returns the total remaining marginal evidence over all sites
    pub fn total_marginal_support(&self) -> u64 {
        self.marginals.iter().map(|c| c.total()).sum()
    }
}

/// Builds the support table for a variant set from read observations.
/// With more than one thread, the observations are split into chunks that each fill a partial table, the partial
/// tables are then summed together.
/// # Arguments
/// * `variant_set` - the SNP sites
/// * `observations` - the reads converted into per-site alleles
/// * `order` - the Markov order to record
/// * `threads` - the number of worker threads to use
pub fn build_support_table(variant_set: &VariantSet, observations: Vec<ReadObservation>, order: usize, threads: usize) -> SupportTable {
    let mut support_table = SupportTable::new(variant_set, order);
    let num_observations = observations.len();

    if threads <= 1 || num_observations < 2 {
        for obs in observations.iter() {
            support_table.add_observation(obs);
        }
    } else {
        let chunk_size: usize = num_observations.div_ceil(threads);
        let pool = ThreadPool::new(threads);
        let (tx, rx) = mpsc::channel();
        let template: Arc<SupportTable> = Arc::new(support_table.clone());

        let mut jobs_queued: usize = 0;
        let mut observations = observations;
        while !observations.is_empty() {
            let split_at = observations.len().saturating_sub(chunk_size);
            let chunk: Vec<ReadObservation> = observations.split_off(split_at);
            let tx = tx.clone();
            let template = template.clone();
            pool.execute(move || {
                let mut partial: SupportTable = (*template).clone();
                for obs in chunk.iter() {
                    partial.add_observation(obs);
                }
                tx.send(partial).expect("channel will be there waiting for the pool");
            });
            jobs_queued += 1;
        }
        drop(tx);

        for partial in rx.iter().take(jobs_queued) {
            support_table.merge(partial);
        }
        assert_eq!(pool.panic_count(), 0, "a support table worker panicked");
    }

    let uncovered: usize = (1..=support_table.num_sites())
        .filter(|&site| !support_table.was_covered(site))
        .count();
    if uncovered > 0 {
        warn!("{} of {} SNP sites have no read evidence, they will be filled from declared alleles.", uncovered, support_table.num_sites());
    }
    debug!("Support table holds {} conditional entries.", support_table.num_transitions());
    info!("Built support table from {} reads over {} sites (order {}).", num_observations, support_table.num_sites(), order);
    support_table
}
