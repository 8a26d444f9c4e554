use crate::data_types::alleles::Allele;
use crate::data_types::hits::HitTable;
use crate::data_types::reference_genome::ReferenceGenome;
use crate::data_types::variant_set::VariantSet;
use crate::path_assembly::HaplotypePath;

use log::{debug, info, warn};

/// The alleles a known reference sequence carries at each SNP site, derived from its hits against the contig
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceProfile {
    /// The reference name
    name: String,
    /// The expected allele for each site, `None` where no hit covers the site; index 0 is the root and always `None`
    expected: Vec<Option<Allele>>,
    /// The number of covered sites where the reference agrees with the master sequence, if a master was provided
    master_agreement: Option<usize>
}

impl ReferenceProfile {
    /// Creates a profile directly.
    /// # Arguments
    /// * `name` - the reference name
    /// * `expected` - the expected allele for sites `0..=N`
    /// * `master_agreement` - optional count of sites agreeing with the master
    pub fn new(name: String, expected: Vec<Option<Allele>>, master_agreement: Option<usize>) -> ReferenceProfile {
        assert!(!expected.is_empty());
        assert!(expected[0].is_none(), "the root cannot be covered");
        ReferenceProfile {
            name,
            expected,
            master_agreement
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected(&self, site: usize) -> Option<Allele> {
        self.expected[site]
    }

    /// The sites covered by this reference, in order
    pub fn covered_sites(&self) -> impl Iterator<Item=usize> + '_ {
        self.expected.iter()
            .enumerate()
            .filter_map(|(site, e)| e.map(|_| site))
    }

    pub fn num_covered(&self) -> usize {
        self.expected.iter().filter(|e| e.is_some()).count()
    }

    pub fn master_agreement(&self) -> Option<usize> {
        self.master_agreement
    }

    /// Returns one flag per covered site, true where the path carries the expected allele
    pub fn match_map(&self, path: &HaplotypePath) -> Vec<bool> {
        assert_eq!(path.alleles().len(), self.expected.len(), "path does not match the profile sites");
        self.covered_sites()
            .map(|site| self.expected[site] == Some(path.allele(site)))
            .collect()
    }

    /// Percent identity of a path at the covered sites, `None` if nothing is covered
    pub fn identity(&self, path: &HaplotypePath) -> Option<f64> {
        let match_map = self.match_map(path);
        if match_map.is_empty() {
            None
        } else {
            let matches = match_map.iter().filter(|&&m| m).count();
            Some(100.0 * matches as f64 / match_map.len() as f64)
        }
    }
}

/// Builds the expected-allele profile of every reference in the hit table.
/// Only hits on the variant set's contig are used; where hits overlap, the first one in the table wins.
/// References missing from `references` are skipped with a warning.
/// # Arguments
/// * `variant_set` - the SNP sites
/// * `hits` - the hits of each reference against the contig
/// * `references` - the reference sequences
/// * `master` - the master contig sequence, used to count master agreement
pub fn build_profiles(
    variant_set: &VariantSet, hits: &HitTable, references: &ReferenceGenome, master: Option<&[u8]>
) -> Vec<ReferenceProfile> {
    let num_sites = variant_set.num_sites();
    let mut profiles: Vec<ReferenceProfile> = Vec::with_capacity(hits.reference_names().len());

    for reference_name in hits.reference_names().iter() {
        let sequence: &[u8] = match references.get_sequence(reference_name) {
            Some(s) => s,
            None => {
                warn!("Reference {:?} is in the hit table but not the reference sequences, ignoring it.", reference_name);
                continue;
            }
        };

        let mut expected: Vec<Option<Allele>> = vec![None; num_sites+1];
        for hit in hits.hits_for(reference_name).iter() {
            if hit.contig() != variant_set.contig() {
                debug!("Ignoring hit of {} on {}", reference_name, hit.contig());
                continue;
            }
            let contig_range = hit.contig_range();
            for site in variant_set.sites_within(contig_range.start, contig_range.end-1) {
                if expected[site].is_some() {
                    continue;
                }
                let reference_position = match hit.map_position(variant_set.position(site)) {
                    Some(p) => p as usize,
                    None => continue
                };
                if reference_position > sequence.len() {
                    continue;
                }
                let allele = Allele::from_base(sequence[reference_position-1]);
                expected[site] = Some(if hit.is_reverse() { allele.complement() } else { allele });
            }
        }

        let master_agreement: Option<usize> = master.map(|m| {
            expected.iter()
                .enumerate()
                .filter(|(site, e)| {
                    let index = variant_set.position(*site) as usize;
                    match e {
                        Some(allele) => index >= 1 && index <= m.len() && Allele::from_base(m[index-1]) == *allele,
                        None => false
                    }
                })
                .count()
        });

        let profile = ReferenceProfile::new(reference_name.clone(), expected, master_agreement);
        debug!("{} covers {} sites", profile.name(), profile.num_covered());
        profiles.push(profile);
    }

    profiles
}

/// The best-matching path for a reference
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BestMatch {
    /// The iteration that emitted the path
    pub iteration: usize,
    /// Percent identity at the covered sites
    pub identity: f64
}

/// One row of the recovery report
#[derive(Clone, Debug, PartialEq)]
pub struct Recovery {
    /// Index of the reference
    pub index: usize,
    /// Name of the reference
    pub name: String,
    /// The number of covered sites
    pub covered_sites: usize,
    /// The best match, if any path had a non-zero identity
    pub best: Option<BestMatch>,
    /// See `ReferenceProfile::master_agreement()`
    pub master_agreement: Option<usize>,
    /// The unweighted log-likelihood of the best path
    pub unweighted_logprob: Option<f64>,
    /// 0/1 per covered site for the best path
    pub match_map: Option<String>
}

/// Results of scoring all paths against all references
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    /// Percent identity indexed by (reference, iteration); references without coverage are all 0
    identity_matrix: Vec<Vec<f64>>,
    /// Per-reference summary, same order as the identity matrix rows
    recoveries: Vec<Recovery>
}

impl Evaluation {
    pub fn identity_matrix(&self) -> &[Vec<f64>] {
        &self.identity_matrix
    }

    pub fn recoveries(&self) -> &[Recovery] {
        &self.recoveries
    }

    /// The best match per reference, in reference order
    pub fn best_matches(&self) -> Vec<Option<BestMatch>> {
        self.recoveries.iter().map(|r| r.best).collect()
    }

    /// Returns the (min, max, mean) best identity across all references, unrecovered references count as 0
    pub fn summary(&self) -> Option<(f64, f64, f64)> {
        if self.recoveries.is_empty() {
            return None;
        }
        let identities: Vec<f64> = self.recoveries.iter()
            .map(|r| r.best.map(|b| b.identity).unwrap_or(0.0))
            .collect();
        let min = identities.iter().copied().fold(f64::INFINITY, f64::min);
        let max = identities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = identities.iter().sum::<f64>() / identities.len() as f64;
        Some((min, max, mean))
    }
}

/// Scores every path against every reference profile.
/// The best match for a reference is the first iteration with the highest identity, so ties favor earlier paths.
/// # Arguments
/// * `paths` - the emitted paths in iteration order
/// * `profiles` - the expected alleles of each reference
pub fn score_profiles(paths: &[HaplotypePath], profiles: &[ReferenceProfile]) -> Evaluation {
    let mut identity_matrix: Vec<Vec<f64>> = Vec::with_capacity(profiles.len());
    let mut recoveries: Vec<Recovery> = Vec::with_capacity(profiles.len());

    for (index, profile) in profiles.iter().enumerate() {
        let identities: Vec<f64> = paths.iter()
            .map(|path| profile.identity(path).unwrap_or(0.0))
            .collect();

        let mut best: Option<BestMatch> = None;
        let mut best_identity: f64 = 0.0;
        for (iteration, &identity) in identities.iter().enumerate() {
            if identity > best_identity {
                best_identity = identity;
                best = Some(BestMatch { iteration, identity });
            }
        }

        let (unweighted_logprob, match_map) = match best {
            Some(b) => {
                let best_path = &paths[b.iteration];
                let map_string: String = profile.match_map(best_path).iter()
                    .map(|&m| if m { '1' } else { '0' })
                    .collect();
                (Some(best_path.unweighted_logprob()), Some(map_string))
            },
            None => (None, None)
        };

        recoveries.push(Recovery {
            index,
            name: profile.name().to_string(),
            covered_sites: profile.num_covered(),
            best,
            master_agreement: profile.master_agreement(),
            unweighted_logprob,
            match_map
        });
        identity_matrix.push(identities);
    }

    Evaluation {
        identity_matrix,
        recoveries
    }
}

/// Scores the emitted paths against known references, see `build_profiles(...)` and `score_profiles(...)`.
/// # Arguments
/// * `paths` - the emitted paths in iteration order
/// * `variant_set` - the SNP sites
/// * `hits` - the hits of each reference against the contig
/// * `references` - the reference sequences
/// * `master` - optional master contig sequence
pub fn evaluate(
    paths: &[HaplotypePath], variant_set: &VariantSet, hits: &HitTable, references: &ReferenceGenome, master: Option<&[u8]>
) -> Evaluation {
    let profiles = build_profiles(variant_set, hits, references, master);
    let evaluation = score_profiles(paths, &profiles);
    let recovered = evaluation.recoveries().iter().filter(|r| r.best.is_some()).count();
    info!("Recovered {} of {} references across {} paths.", recovered, profiles.len(), paths.len());
    evaluation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::hits::ReferenceHit;
    use crate::path_assembly::PathScores;
    use std::path::PathBuf;

    fn path(s: &str, unweighted: f64) -> HaplotypePath {
        let mut alleles = vec![Allele::Gap];
        alleles.extend(s.bytes().map(Allele::from_base));
        HaplotypePath::new(alleles, PathScores { weighted: 0.0, unweighted }, 1, 1, 0)
    }

    fn profile(name: &str, s: &str) -> ReferenceProfile {
        let mut expected = vec![None];
        expected.extend(s.bytes().map(|b| if b == b'.' { None } else { Some(Allele::from_base(b)) }));
        ReferenceProfile::new(name.to_string(), expected, None)
    }

    #[test]
    fn test_best_match_after_earlier_partial() {
        let paths = vec![path("ACT", -1.0), path("ACG", -2.0)];
        let profiles = vec![profile("ref", "ACG")];
        let evaluation = score_profiles(&paths, &profiles);

        let matrix = evaluation.identity_matrix();
        assert!((matrix[0][0] - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(matrix[0][1], 100.0);

        let best = evaluation.best_matches()[0].unwrap();
        assert_eq!(best.iteration, 1);
        assert_eq!(best.identity, 100.0);

        let recovery = &evaluation.recoveries()[0];
        assert_eq!(recovery.covered_sites, 3);
        assert_eq!(recovery.unweighted_logprob, Some(-2.0));
        assert_eq!(recovery.match_map.as_deref(), Some("111"));
    }

    #[test]
    fn test_ties_favor_earliest() {
        let paths = vec![path("AAT", -1.0), path("ACC", -2.0), path("ACT", -3.0)];
        // only sites 2 and 3 are covered
        let profiles = vec![profile("ref", ".CT"), profile("other", "GGG"), profile("empty", "...")];
        let evaluation = score_profiles(&paths, &profiles);

        let best = evaluation.best_matches();
        assert_eq!(best[0], Some(BestMatch { iteration: 2, identity: 100.0 }));
        assert_eq!(best[1], None);
        assert_eq!(best[2], None);
        assert_eq!(evaluation.recoveries()[0].match_map.as_deref(), Some("11"));
        assert_eq!(evaluation.recoveries()[2].covered_sites, 0);

        let paths = vec![path("ACA", -1.0), path("ACG", -2.0)];
        let evaluation = score_profiles(&paths, &[profile("ref", "AC.")]);
        assert_eq!(evaluation.best_matches()[0].unwrap().iteration, 0);

        let (min, max, mean) = score_profiles(&[path("AAT", -1.0)], &[profile("a", ".CT"), profile("b", "AAT")])
            .summary()
            .unwrap();
        assert_eq!(min, 50.0);
        assert_eq!(max, 100.0);
        assert_eq!(mean, 75.0);
    }

    #[test]
    fn test_no_references() {
        let evaluation = score_profiles(&[path("A", 0.0)], &[]);
        assert!(evaluation.identity_matrix().is_empty());
        assert!(evaluation.summary().is_none());
    }

    #[test]
    fn test_build_profiles() {
        let variant_set = VariantSet::new(
            "contig1".to_string(),
            vec![5, 10, 20],
            vec![vec![Allele::A, Allele::T], vec![Allele::C, Allele::G], vec![Allele::G, Allele::A]]
        );
        let references = ReferenceGenome::from_sequences(vec![
            ("fwd".to_string(), b"TTTTGTTTTC".to_vec()),
            ("rev".to_string(), b"AAAAAAAAGA".to_vec()),
            ("other".to_string(), b"AAAAAAAAAA".to_vec())
        ]);
        let hits = HitTable::from_hits(vec![
            // contig 1-10 onto fwd 1-10 covers sites 1 and 2
            ReferenceHit::new("fwd".to_string(), "contig1".to_string(), 1, 10, 1, 10),
            // contig 21-12 on the reverse strand onto rev 1-10
            ReferenceHit::new("rev".to_string(), "contig1".to_string(), 1, 10, 21, 12),
            ReferenceHit::new("other".to_string(), "contig2".to_string(), 1, 10, 1, 10),
            ReferenceHit::new("unknown".to_string(), "contig1".to_string(), 1, 10, 1, 10)
        ]);
        let master = b"AAAAGAAAACAAAAAAAAACAAAA";
        let profiles = build_profiles(&variant_set, &hits, &references, Some(master));
        assert_eq!(profiles.len(), 3);

        assert_eq!(profiles[0].name(), "fwd");
        assert_eq!(profiles[0].covered_sites().collect::<Vec<usize>>(), vec![1, 2]);
        assert_eq!(profiles[0].expected(1), Some(Allele::G));
        assert_eq!(profiles[0].expected(2), Some(Allele::C));
        assert_eq!(profiles[0].master_agreement(), Some(2));

        // position 20 is 1 base into the reverse hit, so rev base 2 (A) complemented
        assert_eq!(profiles[1].covered_sites().collect::<Vec<usize>>(), vec![3]);
        assert_eq!(profiles[1].expected(3), Some(Allele::T));
        assert_eq!(profiles[1].master_agreement(), Some(0));

        // hits on another contig contribute nothing
        assert_eq!(profiles[2].num_covered(), 0);
    }

    #[test]
    fn test_evaluate_files() {
        let variant_set = VariantSet::new(
            "contig1".to_string(),
            vec![5, 10, 20],
            vec![vec![Allele::A, Allele::T], vec![Allele::C, Allele::G], vec![Allele::G, Allele::A]]
        );
        let hits = HitTable::from_path(&PathBuf::from("./test_data/hits.tsv")).unwrap();
        let genes = ReferenceGenome::from_fasta(&PathBuf::from("./test_data/genes.fa")).unwrap();

        // gene1 expects A at sites 1 and 2, gene2 expects A at site 3
        let paths = vec![path("TGA", -1.0), path("AAG", -2.0)];
        let evaluation = evaluate(&paths, &variant_set, &hits, &genes, None);
        let best = evaluation.best_matches();
        assert_eq!(best[0], Some(BestMatch { iteration: 1, identity: 100.0 }));
        assert_eq!(best[1], Some(BestMatch { iteration: 0, identity: 100.0 }));
        assert_eq!(evaluation.recoveries()[0].master_agreement, None);
    }
}
