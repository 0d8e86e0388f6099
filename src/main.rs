use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use photosift::config::Config;
use photosift::db::SqliteDb;
use photosift::filter::QualityFilter;
use photosift::logging;
use photosift::matcher::{load_known_places, seed_places, PlaceMatcher};

enum Command {
    Filter { place: Option<String> },
    Match,
    Seed { file: Option<PathBuf> },
    Stats,
}

struct Args {
    command: Command,
    config_path: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut command = None;
    let mut place = None;
    let mut seed_file = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("photosift {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--place" => {
                if i + 1 < args.len() {
                    place = Some(args[i + 1].clone());
                    i += 1;
                } else {
                    eprintln!("Error: --place requires a name argument");
                    std::process::exit(1);
                }
            }
            "filter" | "match" | "seed" | "stats" if command.is_none() => {
                command = Some(args[i].clone());
            }
            other => {
                // A bare argument after `seed` is the places file
                if command.as_deref() == Some("seed") && seed_file.is_none() {
                    seed_file = Some(PathBuf::from(other));
                } else {
                    eprintln!("Unknown argument: {other}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    let command = match command.as_deref() {
        Some("filter") => Command::Filter { place },
        Some("match") => Command::Match,
        Some("seed") => Command::Seed { file: seed_file },
        Some("stats") => Command::Stats,
        _ => {
            print_help();
            std::process::exit(1);
        }
    };

    Args {
        command,
        config_path,
    }
}

fn print_help() {
    println!(
        r#"photosift - photo curation pipeline (quality filter + place matcher)

USAGE:
    photosift <COMMAND> [OPTIONS]

COMMANDS:
    filter [--place NAME]   Filter pending staged photos, optionally one group
    match                   Match filtered photos to canonical places
    seed [FILE]             Seed the place registry from a known-places file
    stats                   Show staging pipeline counters

OPTIONS:
    --config, -c PATH       Path to config file
    --version, -V           Show version
    --help, -h              Show this help message

ENVIRONMENT:
    PHOTOSIFT_LOG           Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/photosift/config.toml"#
    );
}

fn main() -> Result<()> {
    let args = parse_args();

    // Initialize logging (uses journald on Linux, file fallback otherwise)
    let _ = logging::init(Some(Config::config_dir().join("logs")));

    // Load configuration
    let config = match args.config_path {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Open the staging database
    let db = SqliteDb::open(&config.db_path)?;
    db.initialize()?;
    info!("Database opened at {:?}", config.db_path);

    match args.command {
        Command::Filter { place } => {
            let filter = QualityFilter::new(config.filter);
            let stats = filter.run_sweep(&db, place.as_deref())?;
            println!(
                "Filter sweep: {} evaluated, {} passed, {} rejected, {} write failures",
                stats.evaluated, stats.passed, stats.rejected, stats.write_failures
            );
        }
        Command::Match => {
            let known = load_known_places(&config.matcher.known_places_path)?;
            let matcher = PlaceMatcher::new(config.matcher);
            let stats = matcher.run_sweep(&db, known)?;
            println!(
                "Match sweep: {} matched, {} unmatched, {} write failures",
                stats.matched, stats.unmatched, stats.write_failures
            );
        }
        Command::Seed { file } => {
            let path = file.unwrap_or_else(|| config.matcher.known_places_path.clone());
            let entries = load_known_places(&path)?;
            if entries.is_empty() {
                println!("No places found in {path:?}");
            } else {
                let created = seed_places(&db, &entries)?;
                println!("Seeded {created} new places ({} total in file)", entries.len());
            }
        }
        Command::Stats => {
            let stats = db.stats()?;
            println!("Staging photos: {} total", stats.total);
            println!(
                "  review:  {} pending / {} approved / {} rejected",
                stats.pending, stats.approved, stats.rejected
            );
            println!(
                "  filter:  {} passed / {} filtered out / {} unprocessed",
                stats.passed_filter, stats.filtered_out, stats.unprocessed
            );
            println!("  matched: {}", stats.matched);
            println!("Places: {}", stats.places);
        }
    }

    Ok(())
}
