use crate::data_types::alleles::Allele;
use crate::data_types::variant_set::VariantSet;
use crate::support_table::SupportTable;
use crate::writers::delimited_writer;

use log::info;
use serde::Serialize;
use std::path::Path;

/// Contains all the data written to each row of the marginals file
#[derive(Serialize)]
struct MarginalRow {
    /// The site index
    i: usize,
    /// The 1-based position of the site
    pos: u64,
    /// Distance from the previous site, 0 for the first
    gap: u64,
    #[serde(rename = "A")]
    count_a: u64,
    #[serde(rename = "C")]
    count_c: u64,
    #[serde(rename = "G")]
    count_g: u64,
    #[serde(rename = "T")]
    count_t: u64,
    #[serde(rename = "N")]
    count_n: u64,
    /// Reads with a deletion at the site
    #[serde(rename = "_")]
    count_gap: u64,
    /// Total observations at the site
    total: u64
}

/// Writes the marginal allele counts of every site to a csv/tsv file.
/// This reflects the table at the time of the call, so it should be written before any suppression.
/// # Arguments
/// * `filename` - the filename for the output (tsv/csv)
/// * `variant_set` - provides site positions
/// * `support_table` - provides the counts
pub fn write_marginals(filename: &Path, variant_set: &VariantSet, support_table: &SupportTable) -> csv::Result<()> {
    assert_eq!(variant_set.num_sites(), support_table.num_sites());
    let mut csv_writer = delimited_writer(filename)?;

    for site in 1..=support_table.num_sites() {
        let counts = support_table.counts_at(site);
        let pos = variant_set.position(site);
        let gap = if site == 1 { 0 } else { pos - variant_set.position(site-1) };
        let row = MarginalRow {
            i: site,
            pos,
            gap,
            count_a: counts.get(Allele::A),
            count_c: counts.get(Allele::C),
            count_g: counts.get(Allele::G),
            count_t: counts.get(Allele::T),
            count_n: counts.get(Allele::N),
            count_gap: counts.get(Allele::Gap),
            total: counts.total()
        };
        csv_writer.serialize(&row)?;
    }
    csv_writer.flush()?;
    info!("Wrote marginal counts for {} sites to {:?}", support_table.num_sites(), filename);
    Ok(())
}
