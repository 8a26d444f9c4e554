use crate::data_types::alleles::Allele;

use log::{debug, info, warn};
use rust_htslib::bcf;
use simple_error::bail;
use std::path::Path;

/// The set of SNP sites on a single contig that haplotypes are built over.
/// Site `0` is the synthetic root, site `i >= 1` lives at `positions[i-1]`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantSet {
    /// The contig all sites live on
    contig: String,
    /// 1-based genomic position of each site, strictly increasing
    positions: Vec<u64>,
    /// The alleles declared by the variant call for each site, REF first
    declared_alleles: Vec<Vec<Allele>>
}

impl VariantSet {
    /// Creates a variant set from pre-parsed sites.
    /// # Arguments
    /// * `contig` - the contig name
    /// * `positions` - 1-based positions of each site
    /// * `declared_alleles` - the candidate alleles for each site, REF first; may be empty for unknown
    /// # Panics
    /// * if the lengths of `positions` and `declared_alleles` differ
    /// * if `positions` is not strictly increasing
    pub fn new(contig: String, positions: Vec<u64>, declared_alleles: Vec<Vec<Allele>>) -> VariantSet {
        assert_eq!(positions.len(), declared_alleles.len());
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "SNP positions must be strictly increasing");
        VariantSet {
            contig,
            positions,
            declared_alleles
        }
    }

    /// Loads all single-nucleotide variants on `contig` within a 1-based inclusive window.
    /// Records that are not SNVs, or that repeat a position already loaded, are skipped.
    /// # Arguments
    /// * `vcf_fn` - the VCF/BCF file, plain-text VCF is allowed
    /// * `contig` - the contig to load
    /// * `start` - the first position (1-based) to include
    /// * `end` - the last position (1-based) to include, `None` for the end of the contig
    /// # Errors
    /// * if the file cannot be opened or a record fails to parse
    /// * if the contig is not declared in the VCF header
    pub fn from_vcf(vcf_fn: &Path, contig: &str, start: u64, end: Option<u64>) -> Result<VariantSet, Box<dyn std::error::Error>> {
        use rust_htslib::bcf::Read;

        info!("Loading variants for {:?} from {:?}...", contig, vcf_fn);
        let mut vcf_reader: bcf::Reader = bcf::Reader::from_path(vcf_fn)?;
        let vcf_header: bcf::header::HeaderView = vcf_reader.header().clone();
        let contig_rid: u32 = match vcf_header.name2rid(contig.as_bytes()) {
            Ok(rid) => rid,
            Err(_) => {
                bail!("Contig {:?} was not found in the VCF header: {:?}", contig, vcf_fn);
            }
        };
        let last_position: u64 = end.unwrap_or(u64::MAX);

        let mut positions: Vec<u64> = vec![];
        let mut declared_alleles: Vec<Vec<Allele>> = vec![];
        let mut skipped_records: usize = 0;

        for record_result in vcf_reader.records() {
            let record: bcf::Record = record_result?;
            if record.rid() != Some(contig_rid) {
                continue;
            }

            // htslib is 0-based, everything downstream is 1-based like the VCF itself
            let position: u64 = (record.pos() + 1) as u64;
            if position < start || position > last_position {
                continue;
            }

            let all_alleles = record.alleles();
            if all_alleles.len() < 2 || all_alleles.iter().any(|a| a.len() != 1) {
                debug!("Skipping non-SNV record at {}:{}", contig, position);
                skipped_records += 1;
                continue;
            }

            if let Some(&previous) = positions.last() {
                if previous >= position {
                    warn!("Skipping repeated or unsorted record at {}:{}", contig, position);
                    skipped_records += 1;
                    continue;
                }
            }

            positions.push(position);
            declared_alleles.push(
                all_alleles.iter()
                    .map(|a| Allele::from_base(a[0]))
                    .collect()
            );
        }

        if skipped_records > 0 {
            warn!("Skipped {} variant records that could not be used as SNP sites.", skipped_records);
        }
        info!("Loaded {} SNP sites.", positions.len());

        Ok(VariantSet::new(contig.to_string(), positions, declared_alleles))
    }

    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// The number of real sites, `N`; paths have `N+1` entries
    pub fn num_sites(&self) -> usize {
        self.positions.len()
    }

    /// The 1-based positions of sites `1..=N`, in site order
    pub fn positions(&self) -> &[u64] {
        &self.positions
    }

    /// Returns the 1-based genomic position of a site, site 0 (the root) has position 0.
    /// # Panics
    /// * if `site > N`
    pub fn position(&self, site: usize) -> u64 {
        assert!(site <= self.num_sites(), "site {site} is out of bounds");
        if site == 0 { 0 } else { self.positions[site-1] }
    }

    /// Returns the declared alleles for a site, site 0 has none.
    /// # Panics
    /// * if `site > N`
    pub fn declared_alleles(&self, site: usize) -> &[Allele] {
        assert!(site <= self.num_sites(), "site {site} is out of bounds");
        if site == 0 { &[] } else { &self.declared_alleles[site-1] }
    }

    /// Returns the range of sites (1-based site indices, exclusive end) whose position falls in `[first, last]`
    pub fn sites_within(&self, first: u64, last: u64) -> std::ops::Range<usize> {
        let lower = self.positions.partition_point(|&p| p < first);
        let upper = self.positions.partition_point(|&p| p <= last);
        (lower+1)..(upper.max(lower)+1)
    }
}
