/// Order-L Markov predictor over the support table, with back-off to shorter histories and marginals
pub mod chain_model;
/// CLI functionality and checks
pub mod cli;
/// Contains multiple wrappers for useful data types in haplochain
pub mod data_types;
/// Scores emitted haplotypes against known references through their hits on the contig
pub mod evaluator;
/// Builds a single haplotype path by walking the sites with a pluggable selection policy
pub mod path_assembly;
/// Components for loading reads from a BAM file and converting them into per-site allele observations
pub mod read_parsing;
/// Organizes the reconstruction loop and renders paths back onto the master sequence
pub mod reconstruction;
/// The evidence pool that every path draws from
pub mod support_table;
/// Removes the evidence claimed by an emitted path
pub mod suppression;
/// Contains all the various output writer functionality
pub mod writers;
