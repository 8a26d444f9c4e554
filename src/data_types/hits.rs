use log::{debug, info};
use rustc_hash::FxHashMap as HashMap;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum HitError {
    #[error("hit table row {row} has {found} columns, at least 10 are required")]
    ColumnCount { row: usize, found: usize },
    #[error("hit table row {row} has a non-numeric coordinate in column {column}: {value:?}")]
    Coordinate { row: usize, column: usize, value: String },
    #[error("hit table row {row} has a 0 coordinate, coordinates are 1-based")]
    ZeroCoordinate { row: usize }
}

/// One local alignment between a known reference sequence and the reconstructed contig.
/// All coordinates are 1-based and inclusive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReferenceHit {
    /// The reference sequence name, matches a FASTA record identifier
    reference_name: String,
    /// The contig the hit lands on
    contig: String,
    /// Start on the reference
    reference_start: u64,
    /// End on the reference
    reference_end: u64,
    /// Start on the contig; larger than `contig_end` when the hit is on the reverse strand
    contig_start: u64,
    /// End on the contig
    contig_end: u64
}

impl ReferenceHit {
    pub fn new(
        reference_name: String, contig: String,
        reference_start: u64, reference_end: u64,
        contig_start: u64, contig_end: u64
    ) -> ReferenceHit {
        ReferenceHit {
            reference_name,
            contig,
            reference_start,
            reference_end,
            contig_start,
            contig_end
        }
    }

    pub fn reference_name(&self) -> &str {
        &self.reference_name
    }

    pub fn contig(&self) -> &str {
        &self.contig
    }

    pub fn is_reverse(&self) -> bool {
        self.contig_start > self.contig_end
    }

    /// Returns the contig span as a half-open range, regardless of strand
    pub fn contig_range(&self) -> std::ops::Range<u64> {
        self.contig_start.min(self.contig_end)..(self.contig_start.max(self.contig_end)+1)
    }

    /// Maps a 1-based contig position onto the 1-based reference position, assuming an ungapped hit.
    /// Returns `None` if the position is outside the hit on either side.
    pub fn map_position(&self, contig_position: u64) -> Option<u64> {
        if !self.contig_range().contains(&contig_position) {
            return None;
        }
        let offset: u64 = if self.is_reverse() {
            self.contig_start - contig_position
        } else {
            contig_position - self.contig_start
        };
        let reference_position = self.reference_start + offset;
        if reference_position > self.reference_end.max(self.reference_start) {
            None
        } else {
            Some(reference_position)
        }
    }
}

/// All hits loaded from a hit table, grouped by reference name
#[derive(Clone, Debug, Default)]
pub struct HitTable {
    /// Reference names in order of first appearance
    reference_order: Vec<String>,
    /// Hits per reference, in file order
    hits: HashMap<String, Vec<ReferenceHit>>
}

impl HitTable {
    /// Builds a table from a collection of hits
    pub fn from_hits(all_hits: Vec<ReferenceHit>) -> HitTable {
        let mut table: HitTable = Default::default();
        for hit in all_hits.into_iter() {
            table.add_hit(hit);
        }
        table
    }

    /// Loads a tab-separated, BLAST-style tabular hit table (`-outfmt 6`).
    /// Column 1 is the reference name, column 2 the contig, columns 7-8 the reference span and columns 9-10 the contig span.
    /// Lines starting with `#` are ignored.
    /// # Arguments
    /// * `filename` - the hit table to load
    /// # Errors
    /// * if the file cannot be read
    /// * if a row is malformed, see `HitError`
    pub fn from_path(filename: &Path) -> Result<HitTable, Box<dyn std::error::Error>> {
        info!("Loading hit table {:?}...", filename);
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .from_path(filename)?;

        let mut table: HitTable = Default::default();
        for (row_index, row_result) in csv_reader.records().enumerate() {
            let record: csv::StringRecord = row_result?;
            let row = row_index + 1;
            if record.len() < 10 {
                return Err(Box::new(HitError::ColumnCount { row, found: record.len() }));
            }

            let parse_coordinate = |column: usize| -> Result<u64, HitError> {
                let value: &str = record[column].trim();
                let coordinate: u64 = value.parse().map_err(|_| HitError::Coordinate {
                    row, column: column+1, value: value.to_string()
                })?;
                if coordinate == 0 {
                    Err(HitError::ZeroCoordinate { row })
                } else {
                    Ok(coordinate)
                }
            };

            let hit = ReferenceHit::new(
                record[0].trim().to_string(),
                record[1].trim().to_string(),
                parse_coordinate(6)?,
                parse_coordinate(7)?,
                parse_coordinate(8)?,
                parse_coordinate(9)?
            );
            debug!("Loaded hit {:?}", hit);
            table.add_hit(hit);
        }
        info!("Loaded hits for {} references.", table.reference_order.len());

        Ok(table)
    }

    fn add_hit(&mut self, hit: ReferenceHit) {
        if !self.hits.contains_key(hit.reference_name()) {
            self.reference_order.push(hit.reference_name().to_string());
        }
        self.hits.entry(hit.reference_name().to_string())
            .or_default()
            .push(hit);
    }

    pub fn reference_names(&self) -> &[String] {
        &self.reference_order
    }

    /// Returns all hits for a reference, empty if there are none
    pub fn hits_for(&self, reference_name: &str) -> &[ReferenceHit] {
        self.hits.get(reference_name)
            .map(|v| &v[..])
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_map_position() {
        let forward = ReferenceHit::new("gene".to_string(), "contig".to_string(), 11, 20, 101, 110);
        assert!(!forward.is_reverse());
        assert_eq!(forward.contig_range(), 101..111);
        assert_eq!(forward.map_position(100), None);
        assert_eq!(forward.map_position(101), Some(11));
        assert_eq!(forward.map_position(110), Some(20));
        assert_eq!(forward.map_position(111), None);

        let reverse = ReferenceHit::new("gene".to_string(), "contig".to_string(), 1, 10, 110, 101);
        assert!(reverse.is_reverse());
        assert_eq!(reverse.contig_range(), 101..111);
        assert_eq!(reverse.map_position(110), Some(1));
        assert_eq!(reverse.map_position(101), Some(10));
    }

    #[test]
    fn test_from_path() {
        let hit_fn = PathBuf::from("./test_data/hits.tsv");
        let table = HitTable::from_path(&hit_fn).unwrap();
        assert_eq!(table.reference_names(), &["gene1".to_string(), "gene2".to_string()]);
        assert_eq!(table.hits_for("gene1").len(), 1);
        assert_eq!(table.hits_for("gene2").len(), 1);
        assert!(table.hits_for("gene3").is_empty());

        let hit = &table.hits_for("gene2")[0];
        assert_eq!(hit.contig(), "contig1");
        assert!(hit.is_reverse());
    }

    #[test]
    fn test_from_hits() {
        let table = HitTable::from_hits(vec![
            ReferenceHit::new("b".to_string(), "c".to_string(), 1, 5, 1, 5),
            ReferenceHit::new("a".to_string(), "c".to_string(), 1, 5, 1, 5),
            ReferenceHit::new("b".to_string(), "c".to_string(), 6, 9, 6, 9)
        ]);
        assert_eq!(table.reference_names(), &["b".to_string(), "a".to_string()]);
        assert_eq!(table.hits_for("b").len(), 2);
        assert!(!table.is_empty());
    }
}
