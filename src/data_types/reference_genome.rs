use bio::io::fasta;
use flate2::bufread::MultiGzDecoder;
use log::{debug, info};
use rustc_hash::FxHashMap as HashMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// In-memory collection of FASTA sequences, used for both the known reference genes and the master contig
pub struct ReferenceGenome {
    /// The filename we loaded
    filename: PathBuf,
    /// Contains the keys in order of the reference load
    contig_keys: Vec<String>,
    /// Map where keys are contig names and value is ASCII formatted sequence
    contig_map: HashMap<String, Vec<u8>>
}

impl ReferenceGenome {
    /// Loads all sequences from a given FASTA file
    /// # Arguments
    /// * `fasta_fn` - the FASTA filename, gzip is allowed
    /// # Errors
    /// This will pass through any error detected from loading the provided FASTA file.
    /// This includes file reading and/or record reading errors.
    pub fn from_fasta(fasta_fn: &Path) -> Result<ReferenceGenome, Box<dyn std::error::Error>> {
        info!("Loading {:?}...", fasta_fn);
        let fasta_file: std::fs::File = std::fs::File::open(fasta_fn)?;
        let file_reader = BufReader::new(fasta_file);
        let fasta_reader: fasta::Reader<Box<dyn BufRead>> = if fasta_fn.extension().unwrap_or_default() == "gz" {
            debug!("Detected gzip extension, loading sequences with MultiGzDecoder...");
            let gz_decoder = MultiGzDecoder::new(file_reader);
            let bufreader = BufReader::new(gz_decoder);
            fasta::Reader::from_bufread(Box::new(bufreader))
        } else {
            debug!("Loading sequences as plain-text file...");
            fasta::Reader::from_bufread(Box::new(file_reader))
        };

        let mut genome = ReferenceGenome {
            filename: fasta_fn.to_path_buf(),
            contig_keys: Default::default(),
            contig_map: Default::default()
        };
        for entry in fasta_reader.records() {
            let record: fasta::Record = entry?;
            genome.add_sequence(record.id().to_string(), record.seq().to_ascii_uppercase());
        }
        info!("Finished loading {} sequences.", genome.contig_map.len());

        Ok(genome)
    }

    /// Builds a collection directly from named sequences, sequences are upper-cased
    pub fn from_sequences(sequences: Vec<(String, Vec<u8>)>) -> ReferenceGenome {
        let mut genome = ReferenceGenome {
            filename: PathBuf::new(),
            contig_keys: Default::default(),
            contig_map: Default::default()
        };
        for (name, sequence) in sequences.into_iter() {
            genome.add_sequence(name, sequence.to_ascii_uppercase());
        }
        genome
    }

    fn add_sequence(&mut self, name: String, sequence: Vec<u8>) {
        if self.contig_map.insert(name.clone(), sequence).is_none() {
            self.contig_keys.push(name);
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn contig_keys(&self) -> &[String] {
        &self.contig_keys
    }

    pub fn len(&self) -> usize {
        self.contig_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contig_keys.is_empty()
    }

    /// Retrieves a full sequence by name, `None` if it was not in the file
    pub fn get_sequence(&self, name: &str) -> Option<&[u8]> {
        self.contig_map.get(name).map(|s| &s[..])
    }

    /// Retrieves the first sequence in file order, this is how the master contig is picked
    pub fn first_sequence(&self) -> Option<(&str, &[u8])> {
        self.contig_keys.first()
            .map(|k| (k.as_str(), &self.contig_map[k][..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_simple_reference() {
        let reference_fn: PathBuf = PathBuf::from("./test_data/genes.fa");
        let genes = ReferenceGenome::from_fasta(&reference_fn).unwrap();
        assert_eq!(genes.filename(), reference_fn.as_path());
        assert_eq!(genes.contig_keys(), &["gene1".to_string(), "gene2".to_string()]);
        assert_eq!(genes.len(), 2);
        assert_eq!(genes.get_sequence("gene1"), Some("ACGTATCCGAGGTT".as_bytes()));
        assert_eq!(genes.get_sequence("missing"), None);

        let (first_name, first_seq) = genes.first_sequence().unwrap();
        assert_eq!(first_name, "gene1");
        assert_eq!(first_seq.len(), 14);
    }

    #[test]
    fn test_from_sequences() {
        let genome = ReferenceGenome::from_sequences(vec![
            ("b".to_string(), b"acgt".to_vec()),
            ("a".to_string(), b"TTTT".to_vec())
        ]);
        assert_eq!(genome.contig_keys(), &["b".to_string(), "a".to_string()]);
        assert_eq!(genome.get_sequence("b"), Some("ACGT".as_bytes()));
        assert!(!genome.is_empty());
    }
}
