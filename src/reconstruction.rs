use crate::data_types::variant_set::VariantSet;
use crate::path_assembly::{HaplotypePath, SelectionPolicy, establish_path};
use crate::support_table::SupportTable;
use crate::suppression::suppress;

use log::{debug, info};
use std::time::Instant;

/// Algorithm parameters for the reconstruction loop
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssemblyConfig {
    /// Markov order, `L`
    pub order: usize,
    /// The maximum number of paths to emit
    pub max_paths: usize,
    /// Fraction of each path's minimum support removed after it is emitted
    pub suppression_ratio: f64
}

impl Default for AssemblyConfig {
    fn default() -> AssemblyConfig {
        AssemblyConfig {
            order: 1,
            max_paths: 100,
            suppression_ratio: 1.0
        }
    }
}

/// Repeatedly assembles a path and suppresses its evidence, until `max_paths` have been emitted or evidence runs out.
/// Paths are returned in the order they were emitted.
/// # Arguments
/// * `support_table` - the evidence, consumed as paths are emitted
/// * `config` - the loop parameters
/// * `policy` - the allele selection strategy
pub fn reconstruct_haplotypes(
    support_table: &mut SupportTable, config: &AssemblyConfig, policy: &mut dyn SelectionPolicy
) -> Vec<HaplotypePath> {
    let num_sites: usize = support_table.num_sites();
    let start_time: Instant = Instant::now();
    let cpu_start = cpu_time::ProcessTime::now();

    let mut paths: Vec<HaplotypePath> = Vec::with_capacity(config.max_paths.min(1024));
    for iteration in 0..config.max_paths {
        let path = match establish_path(num_sites, support_table, policy) {
            Some(p) => p,
            None => {
                info!("Evidence exhausted after {} paths.", iteration);
                break;
            }
        };
        let amount = suppress(support_table, &path, config.suppression_ratio);
        debug!(
            "Path {}: weighted={:.4} unweighted={:.4} min_support={} (site {}), suppressed {}",
            iteration, path.weighted_logprob(), path.unweighted_logprob(),
            path.min_support(), path.weakest_site(), amount
        );
        paths.push(path);
    }

    info!(
        "Emitted {} paths in {:.3} seconds ({:.3} CPU seconds).",
        paths.len(), start_time.elapsed().as_secs_f64(), cpu_start.elapsed().as_secs_f64()
    );
    paths
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RenderError {
    #[error("SNP site {site} at position {position} is outside the master sequence (length {length})")]
    PositionOutOfRange { site: usize, position: u64, length: usize }
}

/// Substitutes a path's alleles into the master sequence at each SNP position.
/// Gap alleles are written as `-` so the rendered sequence keeps the master's coordinates.
/// # Arguments
/// * `master` - the master contig sequence
/// * `variant_set` - provides the position of each site
/// * `path` - the haplotype to render
/// # Errors
/// * if any SNP position is past the end of the master sequence
pub fn render_haplotype(master: &[u8], variant_set: &VariantSet, path: &HaplotypePath) -> Result<Vec<u8>, RenderError> {
    assert_eq!(path.num_sites(), variant_set.num_sites());
    let mut sequence: Vec<u8> = master.to_vec();
    for site in 1..=variant_set.num_sites() {
        let position = variant_set.position(site);
        let index = position as usize - 1;
        if index >= sequence.len() {
            return Err(RenderError::PositionOutOfRange {
                site, position, length: sequence.len()
            });
        }
        let base = path.allele(site).to_base();
        sequence[index] = if base == b'_' { b'-' } else { base };
    }
    Ok(sequence)
}
