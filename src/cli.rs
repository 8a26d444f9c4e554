use clap::{Parser, ValueEnum};
use chrono::Datelike;
use lazy_static::lazy_static;
use log::{error, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};

use crate::path_assembly::{MaxProbability, SelectionPolicy, WeightedSampling};
use crate::reconstruction::AssemblyConfig;
use crate::support_table::MAX_ORDER;

lazy_static! {
    /// Stores the full version string we plan to use.
    /// # Examples
    /// * `0.4.0-6bb9635-dirty` - while on a dirty branch
    /// * `0.4.0-6bb9635` - with a fresh commit
    pub static ref FULL_VERSION: String = format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("VERGEN_GIT_DESCRIBE"));
}

/// How each allele is picked from the chain model
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SelectionKind {
    /// Always take the most probable allele
    Max,
    /// Sample alleles in proportion to their probability
    Sample
}

#[derive(Clone, Parser)]
#[clap(author,
    version = &**FULL_VERSION,
    about,
    after_help = format!("Copyright (C) 2023-{}
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()))]
pub struct Settings {
    /// Input alignment file in BAM or SAM format
    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "bam")]
    #[clap(value_name = "BAM")]
    #[clap(help_heading = Some("Input/Output"))]
    pub bam_filenames: Vec<PathBuf>,

    /// Input variant file in VCF/BCF format, only SNVs are used
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub vcf_filename: PathBuf,

    /// The contig to reconstruct haplotypes over
    #[clap(required = true)]
    #[clap(long = "contig")]
    #[clap(value_name = "CONTIG")]
    #[clap(help_heading = Some("Input/Output"))]
    pub contig: String,

    /// First position (1-based) of the window to load variants from
    #[clap(long = "start")]
    #[clap(value_name = "POS")]
    #[clap(default_value = "1")]
    #[clap(help_heading = Some("Input/Output"))]
    pub start: u64,

    /// Last position (1-based, inclusive) of the window to load variants from, 0 is the end of the contig
    #[clap(long = "end")]
    #[clap(value_name = "POS")]
    #[clap(default_value = "0")]
    #[clap(help_heading = Some("Input/Output"))]
    pub end: u64,

    /// Output haplotype sequences in FASTA format
    #[clap(short = 'o')]
    #[clap(long = "output-fasta")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_fasta: Option<PathBuf>,

    /// Output per-site marginal allele counts (optional, csv/tsv)
    #[clap(long = "marginals-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub marginals_filename: Option<PathBuf>,

    /// Output per-iteration path scores (optional, csv/tsv)
    #[clap(long = "paths-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub paths_filename: Option<PathBuf>,

    /// Output per-reference recovery report (optional, csv/tsv)
    #[clap(long = "recovery-file")]
    #[clap(value_name = "FILE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub recovery_filename: Option<PathBuf>,

    /// Number of threads to use for building the support table
    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Only report warnings, and print the recovery summary line to stdout
    #[clap(long = "quiet")]
    pub quiet: bool,

    /// Sets a minimum MAPQ to include a read in the support table
    #[clap(long = "min-mapq")]
    #[clap(value_name = "MAPQ")]
    #[clap(default_value = "0")]
    #[clap(help_heading = Some("Mapping Filtering"))]
    pub min_mapping_quality: u8,

    /// Order of the Markov chain, the number of preceding sites each allele is conditioned on
    #[clap(short = 'l')]
    #[clap(long = "lorder")]
    #[clap(value_name = "ORDER")]
    #[clap(default_value = "1")]
    #[clap(help_heading = Some("Reconstruction"))]
    pub order: usize,

    /// Maximum number of haplotype paths to emit
    #[clap(short = 'p')]
    #[clap(long = "paths")]
    #[clap(value_name = "COUNT")]
    #[clap(default_value = "100")]
    #[clap(help_heading = Some("Reconstruction"))]
    pub max_paths: usize,

    /// Fraction of a path's minimum support removed from the evidence after it is emitted
    #[clap(long = "suppression-ratio")]
    #[clap(value_name = "FRAC")]
    #[clap(default_value = "1.0")]
    #[clap(help_heading = Some("Reconstruction"))]
    pub suppression_ratio: f64,

    /// Allele selection strategy
    #[clap(long = "selection")]
    #[clap(value_enum)]
    #[clap(default_value = "max")]
    #[clap(help_heading = Some("Reconstruction"))]
    pub selection: SelectionKind,

    /// Random seed for `--selection sample`
    #[clap(long = "seed")]
    #[clap(value_name = "SEED")]
    #[clap(default_value = "0")]
    #[clap(help_heading = Some("Reconstruction"))]
    pub seed: u64,

    /// Known reference sequences in FASTA format, requires --hit
    #[clap(long = "genes")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Evaluation"))]
    pub genes_filename: Option<PathBuf>,

    /// Tabular hit table (BLAST outfmt 6) of the reference sequences against the contig, requires --genes
    #[clap(long = "hit")]
    #[clap(value_name = "TSV")]
    #[clap(help_heading = Some("Evaluation"))]
    pub hit_filename: Option<PathBuf>,

    /// Master sequence in FASTA format, the first record is used to render full haplotypes
    #[clap(long = "master")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Evaluation"))]
    pub master_filename: Option<PathBuf>,
}

/// Checks if a file exists and will otherwise exit
/// # Arguments
/// * `filename` - the file path to check for
/// * `label` - the label to use for error messages
fn check_required_filename(filename: &Path, label: &str) {
    if !filename.exists() {
        error!("{} does not exist: \"{}\"", label, filename.display());
        std::process::exit(exitcode::NOINPUT);
    } else {
        info!("{}: \"{}\"", label, filename.display());
    }
}

/// Logs an optional output file
fn log_optional_output(filename: &Option<PathBuf>, label: &str) {
    match filename {
        Some(f) => info!("{}: \"{}\"", label, f.display()),
        None => info!("{}: DISABLED", label)
    };
}

impl Settings {
    /// Wrapper function to build the reconstruction loop configuration from our CLI settings
    pub fn assembly_config(&self) -> AssemblyConfig {
        AssemblyConfig {
            order: self.order,
            max_paths: self.max_paths,
            suppression_ratio: self.suppression_ratio
        }
    }

    /// Builds the allele selection strategy from our CLI settings
    pub fn selection_policy(&self) -> Box<dyn SelectionPolicy> {
        match self.selection {
            SelectionKind::Max => Box::new(MaxProbability),
            SelectionKind::Sample => Box::new(WeightedSampling::new(StdRng::seed_from_u64(self.seed)))
        }
    }

    /// Returns the last position of the window, `None` for the end of the contig
    pub fn window_end(&self) -> Option<u64> {
        if self.end == 0 { None } else { Some(self.end) }
    }

    /// Returns true if both evaluation inputs are available
    pub fn evaluation_enabled(&self) -> bool {
        self.genes_filename.is_some() && self.hit_filename.is_some()
    }
}

pub fn get_raw_settings() -> Settings {
    Settings::parse()
}

/// Do some additional checks here, we may increase these as we go.
/// Also can modify settings if needed since we're passing it around.
/// # Arguments
/// * `settings` - the raw settings, nothing has been checked other than what clap does for us.
pub fn check_settings(mut settings: Settings) -> Settings {
    //check for any of our required files
    for filename in settings.bam_filenames.iter() {
        check_required_filename(filename, "Alignment file");
    }
    check_required_filename(&settings.vcf_filename, "Variant file");

    // evaluation needs both halves, one alone is just ignored
    match (settings.genes_filename.as_ref(), settings.hit_filename.as_ref()) {
        (Some(genes), Some(hit)) => {
            check_required_filename(genes, "Reference genes file");
            check_required_filename(hit, "Hit table file");
        },
        (Some(_), None) => {
            warn!("--genes was provided without --hit, evaluation is disabled");
            settings.genes_filename = None;
        },
        (None, Some(_)) => {
            warn!("--hit was provided without --genes, evaluation is disabled");
            settings.hit_filename = None;
        },
        (None, None) => {}
    };
    if let Some(master) = settings.master_filename.as_ref() {
        check_required_filename(master, "Master file");
    }

    // window checks
    if settings.start == 0 {
        error!("--start is 1-based, 0 is not a valid position");
        std::process::exit(exitcode::USAGE);
    }
    if settings.end != 0 && settings.end < settings.start {
        error!("--end ({}) must not be before --start ({})", settings.end, settings.start);
        std::process::exit(exitcode::USAGE);
    }

    // model checks
    if !(1..=MAX_ORDER).contains(&settings.order) {
        error!("--lorder must be in the range [1, {}]", MAX_ORDER);
        std::process::exit(exitcode::USAGE);
    }
    if !(settings.suppression_ratio > 0.0 && settings.suppression_ratio <= 1.0) {
        error!("--suppression-ratio must be in the range (0.0, 1.0]");
        std::process::exit(exitcode::USAGE);
    }
    if settings.max_paths == 0 {
        warn!("--paths is 0, no haplotypes will be emitted");
    }

    // 0 doesn't make sense, so lets just error proof it up to 1
    if settings.threads == 0 {
        settings.threads = 1;
    }

    // dump stuff to the logger
    info!("Window: {}:{}-{}", settings.contig, settings.start, if settings.end == 0 { "end".to_string() } else { settings.end.to_string() });
    log_optional_output(&settings.output_fasta, "Haplotype FASTA");
    log_optional_output(&settings.marginals_filename, "Marginals file");
    log_optional_output(&settings.paths_filename, "Paths file");
    log_optional_output(&settings.recovery_filename, "Recovery file");

    info!("Mapping filtering:");
    info!("\tMinimum mapping quality: {}", settings.min_mapping_quality);

    info!("Reconstruction:");
    info!("\tMarkov order: {}", settings.order);
    info!("\tMaximum paths: {}", settings.max_paths);
    info!("\tSuppression ratio: {}", settings.suppression_ratio);
    match settings.selection {
        SelectionKind::Max => info!("\tSelection: maximum probability"),
        SelectionKind::Sample => info!("\tSelection: weighted sampling (seed {})", settings.seed)
    };
    if settings.order > 4 {
        warn!("\tHigh Markov orders need reads spanning many SNPs, most lookups will back off to shorter histories.");
    }

    info!("Evaluation: {}", if settings.evaluation_enabled() { "ENABLED" } else { "DISABLED" });
    info!("Processing threads: {}", settings.threads);

    //send the settings back
    settings
}
