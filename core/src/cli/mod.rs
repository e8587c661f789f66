pub mod report;

use crate::registry::ScanMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for bidscat
#[derive(Parser, Debug)]
#[command(name = "bidscat")]
#[command(about = "Generate dcm2niix conversion scripts for a BIDS dataset from a DICOM tree")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Summarize the series found under a directory
    Inspect {
        /// Directory containing DICOM series
        #[arg(value_name = "DIR")]
        directory: PathBuf,

        /// How series are identified
        #[arg(short, long, default_value = "auto")]
        scan_mode: ScanModeArg,
    },

    /// Write one conversion script per configured rule
    Generate {
        /// Directory containing DICOM series
        #[arg(value_name = "DIR")]
        directory: PathBuf,

        /// JSON rule configuration
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Directory the scripts are written to
        #[arg(long, value_name = "DIR", default_value = ".")]
        script_dir: PathBuf,

        /// Emit SLURM array jobs instead of loops
        #[arg(long)]
        slurm: bool,

        /// Line copied verbatim after the script header (repeatable)
        #[arg(long, value_name = "LINE")]
        preamble: Vec<String>,

        /// Prefix for script names
        #[arg(long)]
        prefix: Option<String>,

        /// Script file extension
        #[arg(long, default_value = ".sh")]
        ext: String,

        /// Extra flags passed to dcm2niix
        #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
        converter_flags: Option<String>,

        /// How series are identified
        #[arg(short, long, default_value = "auto")]
        scan_mode: ScanModeArg,

        /// Also write participants.tsv and dataset_description.json
        #[arg(long)]
        participants: bool,
    },
}

/// Series identification options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScanModeArg {
    /// Directory names only
    Names,
    /// DICOM headers only
    Headers,
    /// Directory names, falling back to headers
    Auto,
}

impl From<ScanModeArg> for ScanMode {
    fn from(arg: ScanModeArg) -> Self {
        match arg {
            ScanModeArg::Names => ScanMode::Names,
            ScanModeArg::Headers => ScanMode::Headers,
            ScanModeArg::Auto => ScanMode::Auto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from([
            "bidscat",
            "generate",
            "/data/dicom",
            "--config",
            "rules.json",
            "--slurm",
            "--preamble",
            "module load dcm2niix",
            "--preamble",
            "set -e",
            "--converter-flags",
            "-z y",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Generate {
                slurm,
                preamble,
                ext,
                converter_flags,
                scan_mode,
                ..
            } => {
                assert!(slurm);
                assert_eq!(preamble, ["module load dcm2niix", "set -e"]);
                assert_eq!(ext, ".sh");
                assert_eq!(converter_flags.as_deref(), Some("-z y"));
                assert_eq!(ScanMode::from(scan_mode), ScanMode::Auto);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_inspect() {
        let cli = Cli::parse_from(["bidscat", "inspect", "/data/dicom", "-s", "names"]);
        assert!(matches!(
            cli.command,
            Command::Inspect {
                scan_mode: ScanModeArg::Names,
                ..
            }
        ));
    }
}
