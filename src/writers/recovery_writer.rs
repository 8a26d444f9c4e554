use crate::evaluator::Evaluation;
use crate::writers::delimited_writer;

use serde::Serialize;
use std::path::Path;

/// Contains all the data written to each row of our recovery file
#[derive(Serialize)]
struct RecoveryRow {
    /// Index of the reference
    index: usize,
    /// Name of the reference
    name: String,
    /// The number of SNP sites covered by the reference hits
    sites: usize,
    /// Best percent identity, 0 if nothing matched
    identity: f64,
    /// The iteration with the best identity
    best_iteration: Option<usize>,
    /// Covered sites where the reference matches the master
    master_agreement: Option<usize>,
    /// The unweighted log-likelihood of the best path
    unweighted_logprob: Option<f64>,
    /// 0/1 per covered site for the best path
    match_map: Option<String>
}

/// Writes the per-reference recovery report to a csv/tsv file
/// # Arguments
/// * `filename` - the filename for the output (tsv/csv)
/// * `evaluation` - the scored paths
pub fn write_recoveries(filename: &Path, evaluation: &Evaluation) -> csv::Result<()> {
    let mut csv_writer = delimited_writer(filename)?;
    for recovery in evaluation.recoveries().iter() {
        let row = RecoveryRow {
            index: recovery.index,
            name: recovery.name.clone(),
            sites: recovery.covered_sites,
            identity: recovery.best.map(|b| b.identity).unwrap_or(0.0),
            best_iteration: recovery.best.map(|b| b.iteration),
            master_agreement: recovery.master_agreement,
            unweighted_logprob: recovery.unweighted_logprob,
            match_map: recovery.match_map.clone()
        };
        csv_writer.serialize(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::alleles::Allele;
    use crate::evaluator::{ReferenceProfile, score_profiles};
    use crate::path_assembly::{HaplotypePath, PathScores};

    #[test]
    fn test_write_recoveries() {
        let paths = vec![
            HaplotypePath::new(vec![Allele::Gap, Allele::A, Allele::C], PathScores { weighted: -1.0, unweighted: -2.5 }, 1, 1, 0)
        ];
        let profiles = vec![
            ReferenceProfile::new("gene1".to_string(), vec![None, Some(Allele::A), Some(Allele::G)], Some(1)),
            ReferenceProfile::new("gene2".to_string(), vec![None, None, Some(Allele::T)], None)
        ];
        let evaluation = score_profiles(&paths, &profiles);

        let filename = std::env::temp_dir().join("haplochain_test_recovery.tsv");
        write_recoveries(&filename, &evaluation).unwrap();
        let contents = std::fs::read_to_string(&filename).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![
            "index\tname\tsites\tidentity\tbest_iteration\tmaster_agreement\tunweighted_logprob\tmatch_map",
            "0\tgene1\t2\t50.0\t0\t1\t-2.5\t10",
            "1\tgene2\t1\t0.0\t\t\t\t"
        ]);
        std::fs::remove_file(&filename).unwrap();
    }
}
