//! Creates, drops or resets the warehouse tables.
//!
//! ```bash
//! songplay-create-tables                        # create missing tables
//! songplay-create-tables --reset                # drop and recreate all tables
//! songplay-create-tables --recreate-database    # PostgreSQL: rebuild the database first
//! ```

use anyhow::Result;
use std::path::PathBuf;
use tracing::{error, info};

use songplay_etl::config::Config;
use songplay_etl::db::{self, SchemaReport};
use songplay_etl::logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Action {
    #[default]
    Create,
    Drop,
    Reset,
}

#[derive(Debug, Default)]
struct Args {
    action: Action,
    recreate_database: bool,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--drop" => parsed.action = Action::Drop,
            "--reset" => parsed.action = Action::Reset,
            "--recreate-database" => parsed.recreate_database = true,
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    parsed.config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--version" | "-V" => {
                println!("songplay-create-tables {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
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
        r#"songplay-create-tables - manage the warehouse schema

USAGE:
    songplay-create-tables [OPTIONS]

OPTIONS:
    --drop                Drop all tables instead of creating them
    --reset               Drop all tables, then create them again
    --recreate-database   PostgreSQL only: drop and recreate the database
                          through postgresql_admin_url before creating tables
    --config, -c PATH     Path to config file
    --version, -V         Show version
    --help, -h            Show this help message

ENVIRONMENT:
    SONGPLAY_ETL_CONFIG   Path to config file (overrides default location)
    SONGPLAY_ETL_LOG      Log level (trace, debug, info, warn, error)"#
    );
}

#[cfg(feature = "postgres")]
fn recreate_database(config: &Config) -> Result<()> {
    use anyhow::Context;
    use songplay_etl::db::postgres::{dbname_from_url, PgDb};

    let url = config.database.postgresql_url.as_deref()
        .context("PostgreSQL URL not configured")?;
    let admin_url = config.database.postgresql_admin_url.as_deref()
        .context("postgresql_admin_url not configured")?;
    let dbname = dbname_from_url(url).context("PostgreSQL URL does not name a database")?;

    PgDb::recreate_database(admin_url, &dbname)?;
    info!("Recreated database {}", dbname);
    Ok(())
}

#[cfg(not(feature = "postgres"))]
fn recreate_database(_config: &Config) -> Result<()> {
    anyhow::bail!("--recreate-database needs a build with the `postgres` feature")
}

fn main() -> Result<()> {
    let args = parse_args();

    let config = match &args.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    logging::init(&config.logging)?;

    if args.recreate_database {
        recreate_database(&config)?;
    }

    let mut db = db::Database::open(&config.database)?;
    info!("Connected to {} database", db.backend_name());

    let report: SchemaReport = match args.action {
        Action::Create => db::create_tables(&mut db),
        Action::Drop => db::drop_tables(&mut db),
        Action::Reset => db::reset_tables(&mut db),
    };

    if report.is_success() {
        info!("Schema {:?} finished for {} statements", args.action, report.succeeded.len());
    } else {
        for (table, reason) in &report.failed {
            error!("{}: {}", table, reason);
        }
        info!(
            "Schema {:?} finished with {} of {} statements failing",
            args.action,
            report.failed.len(),
            report.failed.len() + report.succeeded.len()
        );
    }

    Ok(())
}
