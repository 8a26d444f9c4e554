use crate::path_assembly::HaplotypePath;
use crate::support_table::{History, SupportTable};

use log::debug;

/// Returns the amount of evidence to remove from each link of a path, at least 1 so every suppression makes progress.
/// # Arguments
/// * `min_support` - the weakest link of the path
/// * `ratio` - the fraction of `min_support` to remove, in `(0, 1]`
pub fn suppression_amount(min_support: u64, ratio: f64) -> u64 {
    assert!(ratio > 0.0 && ratio <= 1.0, "suppression ratio must be in (0, 1], got {ratio}");
    ((min_support as f64 * ratio).ceil() as u64).clamp(1, min_support.max(1))
}

/// Removes the evidence a path claimed from the support table so the next path is pushed elsewhere.
/// At every site with read evidence, the chosen allele loses `ceil(min_support * ratio)` from its marginal count and
/// from the counts conditioned on every history length `1..=order` the path presents at that site.
/// Counts are clamped at zero. Returns the amount removed per link.
/// # Arguments
/// * `support_table` - the evidence, modified in place
/// * `path` - the path that was just emitted
/// * `ratio` - the fraction of the path's minimum support to remove
/// # Panics
/// * if the path does not cover exactly the sites of the table
pub fn suppress(support_table: &mut SupportTable, path: &HaplotypePath, ratio: f64) -> u64 {
    assert_eq!(path.num_sites(), support_table.num_sites(), "path does not match the support table");
    let amount = suppression_amount(path.min_support(), ratio);
    let order = support_table.order();
    let alleles = path.alleles();

    let mut removed: u64 = 0;
    for site in 1..=support_table.num_sites() {
        if !support_table.was_covered(site) {
            continue;
        }
        let allele = alleles[site];
        removed += support_table.subtract(&History::empty(), site, allele, amount);

        // histories can not reach back onto the root
        let max_history = order.min(site-1);
        for k in 1..=max_history {
            let history = History::from_slice(&alleles[site-k..site]);
            removed += support_table.subtract(&history, site, allele, amount);
        }
    }
    debug!("Suppressed {} per link ({} total) along path with min support {}", amount, removed, path.min_support());

    amount
}
