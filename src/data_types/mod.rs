/// Contains the Allele symbol set and per-allele counts
pub mod alleles;
/// Contains the hit table of known references against the contig
pub mod hits;
/// Contains a ReadObservation type
pub mod read_observations;
/// Wrapper for an in-memory collection of FASTA sequences
pub mod reference_genome;
/// Contains the SNP sites a reconstruction runs over
pub mod variant_set;
