use crate::data_types::alleles::Allele;
use crate::data_types::read_observations::ReadObservation;
use crate::data_types::variant_set::VariantSet;

use log::{debug, info, trace};
use rust_htslib::{bam, htslib};
use rustc_hash::FxHashMap as HashMap;
use simple_error::bail;
use std::ops::{AddAssign, Range};
use std::path::PathBuf;

/// Contains statistics on the loading and parsing of reads into alleles.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReadStats {
    /// The number of alignments loaded
    num_reads: u64,
    /// The number of alignments that were filtered or did not touch any site
    skipped_reads: u64,
    /// The number of alleles observed
    num_alleles: u64,
    /// The number of alleles that were deletions in the read
    gap_alleles: u64,
    /// The number of alleles that were not a canonical base
    n_alleles: u64,
    /// The number of spanned sites with no usable base, from a reference skip or a missing read sequence
    unobserved_alleles: u64
}

impl ReadStats {
    pub fn num_reads(&self) -> u64 {
        self.num_reads
    }

    pub fn skipped_reads(&self) -> u64 {
        self.skipped_reads
    }

    pub fn num_alleles(&self) -> u64 {
        self.num_alleles
    }

    pub fn gap_alleles(&self) -> u64 {
        self.gap_alleles
    }

    pub fn n_alleles(&self) -> u64 {
        self.n_alleles
    }

    pub fn unobserved_alleles(&self) -> u64 {
        self.unobserved_alleles
    }
}

impl AddAssign for ReadStats {
    fn add_assign(&mut self, rhs: Self) {
        self.num_reads += rhs.num_reads;
        self.skipped_reads += rhs.skipped_reads;
        self.num_alleles += rhs.num_alleles;
        self.gap_alleles += rhs.gap_alleles;
        self.n_alleles += rhs.n_alleles;
        self.unobserved_alleles += rhs.unobserved_alleles;
    }
}

/// Returns true if an alignment record should be ignored.
/// This excludes unmapped, secondary, failed QC, and duplicate alignments, as well as any below the MAPQ cutoff.
/// # Arguments
/// * `record` - the record to check
/// * `min_mapq` - the minimum MAPQ to be considered
pub fn filter_out_alignment_record(record: &bam::Record, min_mapq: u8) -> bool {
    static FLAG_FILTER: u32 =
        htslib::BAM_FUNMAP | htslib::BAM_FSECONDARY | htslib::BAM_FQCFAIL | htslib::BAM_FDUP;

    ((record.flags() as u32) & FLAG_FILTER) != 0 || record.mapq() < min_mapq
}

/// Converts a single alignment into the alleles it shows at each SNP site inside its aligned span.
/// Deleted reference bases at a site are reported as `Allele::Gap`.
/// Sites inside a reference skip (`N`), or with no read base because SEQ is `*`, are unobserved.
/// Returns `None` if the alignment does not span any site.
/// # Arguments
/// * `record` - the alignment, with its CIGAR cached
/// * `variant_set` - the SNP sites to extract alleles for
/// * `read_stats` - updated with the number of unobserved sites
fn parse_alignment(record: &bam::Record, variant_set: &VariantSet, read_stats: &mut ReadStats) -> Option<ReadObservation> {
    use rust_htslib::bam::ext::BamRecordExtensions;
    use rust_htslib::bam::record::Cigar;

    // BAM coordinates are 0-based half-open, sites are 1-based inclusive
    let first_position: u64 = (record.pos() + 1) as u64;
    let last_position: u64 = record.reference_end() as u64;
    let sites = variant_set.sites_within(first_position, last_position);
    if sites.is_empty() {
        return None;
    }

    // reference coordinate -> read coordinate, only for aligned bases
    let mut coordinate_lookup: HashMap<i64, i64> = Default::default();
    for bp in record.aligned_pairs() {
        coordinate_lookup.insert(bp[1], bp[0]);
    }

    // spliced out reference intervals, anything else missing from the lookup is a deletion
    let mut ref_skips: Vec<Range<i64>> = vec![];
    let mut ref_position: i64 = record.pos();
    for cigar_value in record.cigar().iter() {
        match cigar_value {
            Cigar::RefSkip(c_len) => {
                ref_skips.push(ref_position..(ref_position + *c_len as i64));
                ref_position += *c_len as i64;
            },
            Cigar::Match(c_len) |
            Cigar::Del(c_len) |
            Cigar::Equal(c_len) |
            Cigar::Diff(c_len) => {
                ref_position += *c_len as i64;
            },
            _ => {}
        }
    }

    // empty when SEQ is `*`
    let read_sequence: Vec<u8> = record.seq().as_bytes();
    let first_site: usize = sites.start;
    let alleles: Vec<Option<Allele>> = sites
        .map(|site| {
            let ref_index: i64 = variant_set.position(site) as i64 - 1;
            let allele = match coordinate_lookup.get(&ref_index) {
                Some(&read_index) => read_sequence.get(read_index as usize).map(|&b| Allele::from_base(b)),
                None if ref_skips.iter().any(|skip| skip.contains(&ref_index)) => None,
                None => Some(Allele::Gap)
            };
            if allele.is_none() {
                read_stats.unobserved_alleles += 1;
            }
            allele
        })
        .collect();

    let read_name: String = String::from_utf8_lossy(record.qname()).to_string();
    trace!("{} => {:?}", read_name, alleles);
    Some(ReadObservation::new(read_name, first_site, alleles))
}

/// Loads every alignment on the variant set's contig and converts it into the alleles observed at each SNP site.
/// Alignments sharing a read name are collapsed into a single observation.
/// Returns the observations in order of first appearance, and statistics from loading the reads.
/// # Arguments
/// * `bam_paths` - the BAM (or SAM) files to parse, they do not need to be indexed
/// * `variant_set` - the SNP sites to extract alleles for
/// * `min_mapq` - the minimum MAPQ to consider a read
/// # Errors
/// * if a file cannot be opened or a record fails to parse
/// * if the contig is missing from a file header
pub fn load_read_observations(
    bam_paths: &[PathBuf], variant_set: &VariantSet, min_mapq: u8
) -> Result<(Vec<ReadObservation>, ReadStats), Box<dyn std::error::Error>> {
    use rust_htslib::bam::Read;

    let mut read_order: Vec<String> = vec![];
    let mut read_groups: HashMap<String, Vec<ReadObservation>> = Default::default();
    let mut read_stats: ReadStats = Default::default();

    for bam_filename in bam_paths.iter() {
        info!("Loading reads from {:?}...", bam_filename);
        let mut bam_reader = bam::Reader::from_path(bam_filename)?;
        let target_id: i32 = match bam_reader.header().tid(variant_set.contig().as_bytes()) {
            Some(tid) => tid as i32,
            None => {
                bail!("Contig {:?} was not found in the alignment header: {:?}", variant_set.contig(), bam_filename);
            }
        };

        let mut file_stats: ReadStats = Default::default();
        for read_entry in bam_reader.records() {
            let mut read = read_entry?;
            if read.tid() != target_id {
                continue;
            }

            //make sure we care about the alignment
            if filter_out_alignment_record(&read, min_mapq) {
                file_stats.skipped_reads += 1;
                continue;
            }
            file_stats.num_reads += 1;
            read.cache_cigar();

            let observation = match parse_alignment(&read, variant_set, &mut file_stats) {
                Some(obs) if !obs.is_empty() => obs,
                _ => {
                    file_stats.skipped_reads += 1;
                    continue;
                }
            };

            for site in observation.region().clone() {
                match observation.allele(site) {
                    Some(Allele::Gap) => file_stats.gap_alleles += 1,
                    Some(Allele::N) => file_stats.n_alleles += 1,
                    _ => {}
                }
            }
            file_stats.num_alleles += observation.get_num_set() as u64;

            let read_name: String = observation.read_name().to_string();
            let group = read_groups.entry(read_name.clone()).or_default();
            if group.is_empty() {
                read_order.push(read_name);
            }
            group.push(observation);
        }

        debug!("{:?}: {:?}", bam_filename, file_stats);
        read_stats += file_stats;
    }

    let observations: Vec<ReadObservation> = read_order.iter()
        .map(|read_name| ReadObservation::collapse(&read_groups[read_name]))
        .filter(|obs| !obs.is_empty())
        .collect();

    info!(
        "Loaded {} alleles from {} alignments ({} skipped, {} unobserved sites), collapsed into {} reads.",
        read_stats.num_alleles, read_stats.num_reads, read_stats.skipped_reads, read_stats.unobserved_alleles, observations.len()
    );
    Ok((observations, read_stats))
}
