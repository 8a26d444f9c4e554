use crate::path_assembly::HaplotypePath;
use crate::writers::delimited_writer;

use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// This is a wrapper for writing out path scores as they are emitted
pub struct PathWriter {
    /// Handle for the CSV writer
    csv_writer: csv::Writer<File>
}

/// Contains all the data written to each row of our paths file
#[derive(Serialize)]
struct PathRow {
    /// The iteration that emitted the path
    iteration: usize,
    /// Log-likelihood under the chain model
    weighted_logprob: f64,
    /// Log-likelihood from raw site counts
    unweighted_logprob: f64,
    /// The weakest link of the path
    min_support: u64,
    /// The site of the weakest link
    weakest_site: usize,
    /// Sites filled without evidence
    uninformative_sites: usize,
    /// The chosen allele at each site
    alleles: String
}

impl PathWriter {
    /// Creates a new writer for a given filename
    /// # Arguments
    /// * `filename` - the path to write all rows to
    pub fn new(filename: &Path) -> csv::Result<PathWriter> {
        Ok(PathWriter {
            csv_writer: delimited_writer(filename)?
        })
    }

    /// Writes a single path
    /// # Arguments
    /// * `iteration` - the iteration that emitted the path
    /// * `path` - the path to write
    pub fn write_path(&mut self, iteration: usize, path: &HaplotypePath) -> csv::Result<()> {
        let row = PathRow {
            iteration,
            weighted_logprob: path.weighted_logprob(),
            unweighted_logprob: path.unweighted_logprob(),
            min_support: path.min_support(),
            weakest_site: path.weakest_site(),
            uninformative_sites: path.uninformative_sites(),
            alleles: path.snp_string()
        };
        self.csv_writer.serialize(&row)?;
        self.csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::alleles::Allele;
    use crate::path_assembly::PathScores;

    #[test]
    fn test_write_path() {
        let filename = std::env::temp_dir().join("haplochain_test_paths.tsv");
        let path = HaplotypePath::new(
            vec![Allele::Gap, Allele::A, Allele::Gap],
            PathScores { weighted: -0.5, unweighted: -1.5 },
            3, 1, 0
        );
        let mut writer = PathWriter::new(&filename).unwrap();
        writer.write_path(0, &path).unwrap();
        drop(writer);

        let contents = std::fs::read_to_string(&filename).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "iteration\tweighted_logprob\tunweighted_logprob\tmin_support\tweakest_site\tuninformative_sites\talleles");
        assert_eq!(lines[1], "0\t-0.5\t-1.5\t3\t1\t0\tA_");
        std::fs::remove_file(&filename).unwrap();
    }
}
