use crate::data_types::variant_set::VariantSet;
use crate::path_assembly::HaplotypePath;
use crate::reconstruction::render_haplotype;

use bio::io::fasta;
use log::info;
use std::path::Path;

/// Writes each path as a FASTA record named `<iteration>__<weighted log-probability>`.
/// With a master sequence, each record is the master with the path's alleles substituted in; otherwise it is just the
/// chosen SNP alleles.
/// # Arguments
/// * `filename` - the output FASTA
/// * `paths` - the emitted paths, in iteration order
/// * `variant_set` - provides the SNP positions
/// * `master` - the optional master sequence
/// # Errors
/// * if the file cannot be written
/// * if a SNP position lies outside the master sequence
pub fn write_haplotypes(
    filename: &Path, paths: &[HaplotypePath], variant_set: &VariantSet, master: Option<&[u8]>
) -> Result<(), Box<dyn std::error::Error>> {
    let mut fasta_writer = fasta::Writer::to_file(filename)?;
    for (iteration, path) in paths.iter().enumerate() {
        let record_id: String = format!("{}__{:.2}", iteration, path.weighted_logprob());
        let sequence: Vec<u8> = match master {
            Some(m) => render_haplotype(m, variant_set, path)?,
            None => path.snp_string().into_bytes()
        };
        fasta_writer.write(&record_id, None, &sequence)?;
    }
    fasta_writer.flush()?;
    info!("Wrote {} haplotypes to {:?}", paths.len(), filename);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::alleles::Allele;
    use crate::data_types::reference_genome::ReferenceGenome;
    use crate::path_assembly::PathScores;

    #[test]
    fn test_write_haplotypes() {
        let variant_set = VariantSet::new("contig1".to_string(), vec![2, 4], vec![vec![]; 2]);
        let paths = vec![
            HaplotypePath::new(vec![Allele::Gap, Allele::T, Allele::G], PathScores { weighted: -0.25, unweighted: 0.0 }, 1, 1, 0),
            HaplotypePath::new(vec![Allele::Gap, Allele::C, Allele::C], PathScores { weighted: -2.0, unweighted: 0.0 }, 1, 1, 0)
        ];

        let filename = std::env::temp_dir().join("haplochain_test_haplotypes.fa");
        write_haplotypes(&filename, &paths, &variant_set, Some(b"AAAAA")).unwrap();
        let written = ReferenceGenome::from_fasta(&filename).unwrap();
        assert_eq!(written.contig_keys(), &["0__-0.25".to_string(), "1__-2.00".to_string()]);
        assert_eq!(written.get_sequence("0__-0.25"), Some("ATAGA".as_bytes()));
        assert_eq!(written.get_sequence("1__-2.00"), Some("ACACA".as_bytes()));

        write_haplotypes(&filename, &paths, &variant_set, None).unwrap();
        let written = ReferenceGenome::from_fasta(&filename).unwrap();
        assert_eq!(written.get_sequence("1__-2.00"), Some("CC".as_bytes()));

        // the master is too short for the second SNP
        assert!(write_haplotypes(&filename, &paths, &variant_set, Some(b"AAA")).is_err());
        std::fs::remove_file(&filename).unwrap();
    }
}
