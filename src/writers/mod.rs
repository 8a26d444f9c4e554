/// Contains the writer for haplotype sequences in FASTA format
pub mod haplotype_fasta;
/// Contains the writer for per-site marginal allele counts
pub mod marginal_writer;
/// Contains the writer for per-iteration path scores
pub mod path_writer;
/// Contains the writer for the per-reference recovery report
pub mod recovery_writer;

use std::fs::File;
use std::path::Path;

/// Opens a delimited writer, the delimiter is "," if the file ends with .csv and tab otherwise
/// # Arguments
/// * `filename` - the path to write to
pub fn delimited_writer(filename: &Path) -> csv::Result<csv::Writer<File>> {
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)
}
