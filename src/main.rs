use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, warn};

use songplay_etl::config::Config;
use songplay_etl::db::{self, DatabaseBackend, Table};
use songplay_etl::etl::{self, PhaseReport};
use songplay_etl::logging;

#[derive(Debug, Default)]
struct Args {
    config_path: Option<PathBuf>,
    song_data: Option<PathBuf>,
    log_data: Option<PathBuf>,
    strict: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("songplay-etl {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--strict" => {
                parsed.strict = true;
            }
            flag @ ("--config" | "-c" | "--song-data" | "--log-data") => {
                if i + 1 >= args.len() {
                    eprintln!("Error: {} requires a path argument", flag);
                    std::process::exit(1);
                }
                let value = PathBuf::from(&args[i + 1]);
                match flag {
                    "--song-data" => parsed.song_data = Some(value),
                    "--log-data" => parsed.log_data = Some(value),
                    _ => parsed.config_path = Some(value),
                }
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    parsed
}

fn print_help() {
    println!(
        r#"songplay-etl - load song metadata and listening logs into the warehouse

USAGE:
    songplay-etl [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --song-data DIR     Root of the song metadata tree (overrides config)
    --log-data DIR      Root of the event log tree (overrides config)
    --strict            Exit with status 1 if any file or record was skipped
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    SONGPLAY_ETL_CONFIG Path to config file (overrides default location)
    SONGPLAY_ETL_LOG    Log level (trace, debug, info, warn, error)

The tables must exist first; see songplay-create-tables --help."#
    );
}

fn log_phase(report: &PhaseReport) {
    info!(
        "{} under {}: {}/{} files processed, {} rows written, {} records skipped",
        report.phase,
        report.root.display(),
        report.files_processed(),
        report.files_found,
        report.rows_written(),
        report.record_failures()
    );
    for (path, reason) in &report.failed {
        warn!("Not processed: {} ({})", path.display(), reason);
    }
}

fn main() -> Result<()> {
    let args = parse_args();

    let mut config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = args.song_data {
        config.data.song_data = dir;
    }
    if let Some(dir) = args.log_data {
        config.data.log_data = dir;
    }

    logging::init(&config.logging)?;

    let mut db = db::Database::open(&config.database)?;
    info!("Connected to {} database", db.backend_name());

    let report = etl::run(&mut db, &config.data, None)?;
    log_phase(&report.songs);
    log_phase(&report.logs);

    for table in Table::ALL {
        match db.count_rows(table) {
            Ok(count) => info!("{}: {} rows", table, count),
            Err(e) => warn!("Cannot count rows in {}: {:#}", table, e),
        }
    }

    if args.strict && report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
