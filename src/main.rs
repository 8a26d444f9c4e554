use haplochain::cli::{Settings, check_settings, get_raw_settings};
use haplochain::data_types::hits::HitTable;
use haplochain::data_types::reference_genome::ReferenceGenome;
use haplochain::data_types::variant_set::VariantSet;
use haplochain::evaluator::evaluate;
use haplochain::path_assembly::{HaplotypePath, SelectionPolicy};
use haplochain::read_parsing::load_read_observations;
use haplochain::reconstruction::reconstruct_haplotypes;
use haplochain::support_table::{SupportTable, build_support_table};
use haplochain::writers::haplotype_fasta::write_haplotypes;
use haplochain::writers::marginal_writer::write_marginals;
use haplochain::writers::path_writer::PathWriter;
use haplochain::writers::recovery_writer::write_recoveries;

use log::{LevelFilter, error, info, warn};
use std::time::Instant;

fn main() {
    // get the settings
    let settings: Settings = get_raw_settings();
    let filter_level: LevelFilter = if settings.quiet {
        LevelFilter::Warn
    } else {
        match settings.verbosity {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace
        }
    };

    // immediately setup logging first
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    // okay, now we can check all the other settings
    let cli_settings: Settings = check_settings(settings);
    let start_time: Instant = Instant::now();

    let variant_set: VariantSet = match VariantSet::from_vcf(
        &cli_settings.vcf_filename, &cli_settings.contig, cli_settings.start, cli_settings.window_end()
    ) {
        Ok(vs) => vs,
        Err(e) => {
            error!("Error while loading variants: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
    if variant_set.num_sites() == 0 {
        warn!("No SNP sites were found in the window, nothing to reconstruct.");
    }

    // optional master sequence, only the first record is used
    let master_genome: Option<ReferenceGenome> = cli_settings.master_filename.as_ref().map(|filename| {
        match ReferenceGenome::from_fasta(filename) {
            Ok(g) => g,
            Err(e) => {
                error!("Error while loading master sequence: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        }
    });
    let master: Option<&[u8]> = match master_genome.as_ref() {
        Some(genome) => match genome.first_sequence() {
            Some((name, sequence)) => {
                info!("Using {:?} ({} bp) as the master sequence.", name, sequence.len());
                Some(sequence)
            },
            None => {
                error!("Master file {:?} does not contain any sequences", genome.filename());
                std::process::exit(exitcode::IOERR);
            }
        },
        None => None
    };

    let (observations, _read_stats) = match load_read_observations(
        &cli_settings.bam_filenames, &variant_set, cli_settings.min_mapping_quality
    ) {
        Ok(r) => r,
        Err(e) => {
            error!("Error while loading reads: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };

    let assembly_config = cli_settings.assembly_config();
    let mut support_table: SupportTable = build_support_table(
        &variant_set, observations, assembly_config.order, cli_settings.threads
    );

    // the diagnostic marginals reflect the table before anything is suppressed
    if let Some(filename) = cli_settings.marginals_filename.as_ref() {
        if let Err(e) = write_marginals(filename, &variant_set, &support_table) {
            error!("Error while writing marginals file: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    }

    let mut selection_policy: Box<dyn SelectionPolicy> = cli_settings.selection_policy();
    let paths: Vec<HaplotypePath> = reconstruct_haplotypes(&mut support_table, &assembly_config, selection_policy.as_mut());
    if paths.is_empty() {
        warn!("No haplotype paths could be established.");
    }

    if let Some(filename) = cli_settings.paths_filename.as_ref() {
        let mut path_writer = match PathWriter::new(filename) {
            Ok(pw) => pw,
            Err(e) => {
                error!("Error during paths writer creation: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
        for (iteration, path) in paths.iter().enumerate() {
            if let Err(e) = path_writer.write_path(iteration, path) {
                error!("Error while writing paths file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        }
    }

    if let Some(filename) = cli_settings.output_fasta.as_ref() {
        if let Err(e) = write_haplotypes(filename, &paths, &variant_set, master) {
            error!("Error while writing haplotypes: {}", e);
            std::process::exit(exitcode::SOFTWARE);
        }
    }

    if let (Some(genes_filename), Some(hit_filename)) = (cli_settings.genes_filename.as_ref(), cli_settings.hit_filename.as_ref()) {
        let genes: ReferenceGenome = match ReferenceGenome::from_fasta(genes_filename) {
            Ok(g) => g,
            Err(e) => {
                error!("Error while loading reference genes: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };
        let hits: HitTable = match HitTable::from_path(hit_filename) {
            Ok(h) => h,
            Err(e) => {
                error!("Error while loading hit table: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };

        let evaluation = evaluate(&paths, &variant_set, &hits, &genes, master);
        for recovery in evaluation.recoveries().iter() {
            match recovery.best {
                Some(best) => info!(
                    "\t{}\t{}: {:.2}% at iteration {} ({} sites)",
                    recovery.index, recovery.name, best.identity, best.iteration, recovery.covered_sites
                ),
                None => info!("\t{}\t{}: not recovered ({} sites)", recovery.index, recovery.name, recovery.covered_sites)
            };
        }

        if let Some(filename) = cli_settings.recovery_filename.as_ref() {
            if let Err(e) = write_recoveries(filename, &evaluation) {
                error!("Error while writing recovery file: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        }

        if let Some((min, max, mean)) = evaluation.summary() {
            if cli_settings.quiet {
                println!("{:.2} {:.2} {:.2}", min, max, mean);
            } else {
                info!("Recovery identity min/max/mean: {:.2} {:.2} {:.2}", min, max, mean);
            }
        }
    } else if cli_settings.recovery_filename.is_some() {
        warn!("--recovery-file requires --genes and --hit, no recovery report written.");
    }

    info!("Emitted {} haplotypes in {:.3} seconds.", paths.len(), start_time.elapsed().as_secs_f64());
    info!("haplochain finished successfully.");
}
