use bidscat_core::{amend_phasediffs, Report};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process;

/// CLI tool for filling in field-map echo times after conversion
#[derive(Parser, Debug)]
#[command(name = "bidsamend")]
#[command(about = "Add EchoTime1/EchoTime2 to phasediff sidecars of a converted BIDS dataset")]
#[command(version)]
struct Cli {
    /// Root of the BIDS dataset
    #[arg(value_name = "BIDS_DIR")]
    bids_dir: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    if !cli.bids_dir.is_dir() {
        eprintln!("Error: {} is not a directory", cli.bids_dir.display());
        process::exit(1);
    }

    info!("Amending field maps under {}", cli.bids_dir.display());

    let mut report = Report::new();
    match amend_phasediffs(&cli.bids_dir, &mut report) {
        Ok(count) => {
            println!("Amended {} phasediff sidecar(s)", count);
            if !report.is_empty() {
                eprint!("{}", report);
            }
        }
        Err(e) => {
            error!("Failed to amend field maps: {}", e);
            eprintln!("Error: Failed to amend field maps: {}", e);
            process::exit(1);
        }
    }
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let cli = Cli::parse_from(["bidsamend", "/data/bids", "--verbose"]);
        assert_eq!(cli.bids_dir, PathBuf::from("/data/bids"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_requires_directory() {
        assert!(Cli::try_parse_from(["bidsamend"]).is_err());
    }
}
