use crate::data_types::alleles::Allele;

use std::ops::Range;

/// Container for a read that has been converted into the alleles it shows at each SNP site
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReadObservation {
    /// the read name
    read_name: String,
    /// the observed allele for each site in `region`; `None` means the site was spanned but not usable
    alleles: Vec<Option<Allele>>,
    /// the site range (1-based site indices, exclusive end) stored in alleles
    region: Range<usize>
}

impl ReadObservation {
    /// Creates a new observation from the alleles seen over a contiguous run of sites.
    /// Leading and trailing unobserved sites are trimmed off the region.
    /// # Arguments
    /// * `read_name` - the read name
    /// * `first_site` - the site index of `alleles[0]`, must be >= 1 since site 0 is the root
    /// * `alleles` - the allele observed at each site starting at `first_site`
    /// # Panics
    /// * if `first_site == 0`
    pub fn new(read_name: String, first_site: usize, alleles: Vec<Option<Allele>>) -> ReadObservation {
        assert!(first_site > 0, "site 0 is reserved for the root");
        let first_set = alleles.iter().position(|a| a.is_some()).unwrap_or(alleles.len());
        let last_set = alleles.iter().rposition(|a| a.is_some())
            .map(|i| i+1)
            .unwrap_or(first_set);

        let alleles = alleles[first_set..last_set].to_vec();
        let region = (first_site+first_set)..(first_site+last_set);

        ReadObservation {
            read_name,
            alleles,
            region
        }
    }

    /// Given several alignments of the same read (e.g. mates or supplementary pieces), collapses them into one observation.
    /// Sites where the alignments disagree become unobserved.
    /// # Arguments
    /// * `observations` - the observations to collapse
    /// # Panics
    /// * if `observations` is empty
    /// * if the read names differ
    pub fn collapse(observations: &[ReadObservation]) -> ReadObservation {
        assert!(!observations.is_empty());
        if observations.len() == 1 {
            return observations[0].clone();
        }

        let read_name: String = observations[0].read_name().to_string();
        let non_empty = observations.iter().filter(|o| !o.is_empty());
        let min_start = non_empty.clone().map(|o| o.region().start).min();
        let max_end = non_empty.map(|o| o.region().end).max();
        let (min_start, max_end) = match (min_start, max_end) {
            (Some(s), Some(e)) => (s, e),
            // nothing observed anywhere
            _ => return ReadObservation::new(read_name, 1, vec![])
        };

        let mut alleles: Vec<Option<Allele>> = vec![None; max_end - min_start];
        let mut conflicted: Vec<bool> = vec![false; max_end - min_start];
        for obs in observations.iter() {
            assert_eq!(read_name, obs.read_name());
            for site in obs.region().clone() {
                let offset = site - min_start;
                if let Some(allele) = obs.allele(site) {
                    match alleles[offset] {
                        None => {
                            if !conflicted[offset] {
                                alleles[offset] = Some(allele);
                            }
                        },
                        Some(existing) if existing != allele => {
                            alleles[offset] = None;
                            conflicted[offset] = true;
                        },
                        Some(_) => {}
                    }
                }
            }
        }

        ReadObservation::new(read_name, min_start, alleles)
    }

    pub fn read_name(&self) -> &str {
        &self.read_name
    }

    /// Returns the observed allele at a site, `None` if it was not observed
    pub fn allele(&self, site: usize) -> Option<Allele> {
        if self.region.contains(&site) {
            self.alleles[site - self.region.start]
        } else {
            None
        }
    }

    /// Returns the site range of this observation
    pub fn region(&self) -> &Range<usize> {
        &self.region
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// Returns the number of sites with an observed allele
    pub fn get_num_set(&self) -> usize {
        self.alleles.iter().filter(|a| a.is_some()).count()
    }
}
