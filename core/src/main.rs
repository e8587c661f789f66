use bidscat_core::cli::report::TextReport;
use bidscat_core::cli::{Cli, Command};
use bidscat_core::{BidscatError, ConversionConfig, Converter, Result, ScanMode, ScriptOptions};
use clap::Parser;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    let result = match cli.command {
        Command::Inspect {
            directory,
            scan_mode,
        } => inspect(&directory, scan_mode.into()),
        Command::Generate {
            directory,
            config,
            script_dir,
            slurm,
            preamble,
            prefix,
            ext,
            converter_flags,
            scan_mode,
            participants,
        } => {
            let mut options = ScriptOptions::new()
                .with_script_dir(script_dir)
                .with_slurm(slurm)
                .with_ext(ext);
            options.preamble = preamble;
            options.script_prefix = prefix;
            options.converter_flags = converter_flags;
            generate(&directory, &config, scan_mode.into(), &options, participants)
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("Error: {}", e);
        process::exit(exit_code(&e));
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

/// Configuration problems exit with 2, everything else with 1
fn exit_code(e: &BidscatError) -> i32 {
    if e.is_configuration() {
        2
    } else {
        1
    }
}

fn inspect(directory: &Path, mode: ScanMode) -> Result<()> {
    info!("Inspecting {}", directory.display());

    let mut converter = Converter::new(PathBuf::new(), false);
    if converter.add_dicoms(directory, mode)? == 0 {
        return Err(BidscatError::NoSeriesFound(directory.to_path_buf()));
    }

    println!("{}", TextReport::new(&converter.inspect()));
    Ok(())
}

fn generate(
    directory: &Path,
    config: &Path,
    mode: ScanMode,
    options: &ScriptOptions,
    participants: bool,
) -> Result<()> {
    let config = ConversionConfig::from_file(config)?;
    let mut converter = Converter::from_config(&config)?;
    info!(
        "Loaded {} rule(s), output to {}",
        converter.rules().len(),
        converter.bids_path().display()
    );

    converter.add_dicoms(directory, mode)?;

    for path in converter.generate_scripts(options)? {
        println!("{}", path.display());
    }

    if participants {
        let added = converter.write_participants()?;
        info!("Added {} participant(s)", added);
        converter.write_dataset_description()?;
    }

    let report = converter.report();
    if !report.is_empty() {
        eprintln!("{} warning(s)", report.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path, bids: &Path) -> PathBuf {
        let path = dir.join("rules.json");
        let config = serde_json::json!({
            "bids_path": bids,
            "rules": [
                {"description": "t1_mprage", "datatype": "anat", "suffix": "T1w"},
                {"description": "rest", "datatype": "func", "suffix": "bold",
                 "chain": {"task": "rest"}}
            ]
        });
        fs::write(&path, config.to_string()).unwrap();
        path
    }

    #[test]
    fn test_generate_writes_scripts() {
        let dir = TempDir::new().unwrap();
        let dicom = dir.path().join("dicom");
        fs::create_dir_all(dicom.join("A1_20200101").join("Series_2_t1_mprage")).unwrap();
        let bids = dir.path().join("bids");
        let config = write_config(dir.path(), &bids);
        let scripts = dir.path().join("scripts");

        let options = ScriptOptions::new().with_script_dir(&scripts);
        generate(&dicom, &config, ScanMode::Names, &options, true).unwrap();

        assert!(scripts.join("t1_mprage.sh").exists());
        assert!(!scripts.join("rest.sh").exists());
        assert!(bids.join("participants.tsv").exists());
        assert!(bids.join("dataset_description.json").exists());
    }

    #[test]
    fn test_inspect_empty_tree_fails() {
        let dir = TempDir::new().unwrap();
        let result = inspect(dir.path(), ScanMode::Names);
        assert!(matches!(result, Err(BidscatError::NoSeriesFound(_))));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&BidscatError::UnknownDatatype("x".to_string())), 2);
        assert_eq!(
            exit_code(&BidscatError::PathNotFound(PathBuf::from("/x"))),
            1
        );
    }
}
