use super::record::SeriesRecord;
use crate::error::{BidscatError, Result};
use crate::report::Report;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where series identity comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScanMode {
    /// Directory names only (fast, trusts the naming convention)
    Names,
    /// One DICOM header per leaf directory (slow, authoritative)
    Headers,
    /// Directory names, falling back to headers for unconventional names
    #[default]
    Auto,
}

impl ScanMode {
    pub fn simple_name(&self) -> &'static str {
        match self {
            ScanMode::Names => "names",
            ScanMode::Headers => "headers",
            ScanMode::Auto => "auto",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Records found by one scan and the warnings raised while finding them
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub records: Vec<SeriesRecord>,
    pub report: Report,
}

/// Scans an input tree for acquisition series
///
/// Every directory without subdirectories is a candidate. Directories are
/// visited in file-name order, so record order is stable across runs.
/// Record paths are absolute and free of `.`/`..` components whatever form
/// `root` was given in.
///
/// # Errors
///
/// - [`BidscatError::PathNotFound`] if `root` does not exist
/// - [`BidscatError::NoSeriesFound`] if no candidate yields a record
pub fn scan(root: &Path, mode: ScanMode) -> Result<ScanOutcome> {
    if !root.exists() {
        return Err(BidscatError::PathNotFound(root.to_path_buf()));
    }
    let canonical = fs::canonicalize(root)?;

    let mut outcome = ScanOutcome::default();
    let leaves = find_leaf_dirs(&canonical);
    log::debug!("{} candidate series directories under {}", leaves.len(), root.display());

    for leaf in leaves {
        let record = match mode {
            ScanMode::Names => SeriesRecord::from_dir_name(&leaf),
            ScanMode::Headers => SeriesRecord::from_dicom_dir(&leaf, &mut outcome.report),
            ScanMode::Auto => SeriesRecord::from_dir_name(&leaf)
                .or_else(|| SeriesRecord::from_dicom_dir(&leaf, &mut outcome.report)),
        };

        match record {
            Some(record) => {
                log::debug!(
                    "Series {} {} ({}) in {}",
                    record.ordinal,
                    record.description,
                    record.subject,
                    leaf.display()
                );
                outcome.records.push(record);
            }
            None => log::debug!("Skipping {}: not an acquisition series", leaf.display()),
        }
    }

    if outcome.records.is_empty() {
        return Err(BidscatError::NoSeriesFound(root.to_path_buf()));
    }

    log::info!(
        "Found {} series under {}",
        outcome.records.len(),
        root.display()
    );
    Ok(outcome)
}

/// Directories under `root` (inclusive) that have no subdirectories
pub fn find_leaf_dirs(root: &Path) -> Vec<PathBuf> {
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    let mut leaves = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() && !has_subdirectory(entry.path()) {
                    leaves.push(entry.into_path());
                }
            }
            Err(e) => {
                // Continue scanning, don't abort
                log::warn!("Error accessing entry: {}", e);
            }
        }
    }
    leaves
}

fn has_subdirectory(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.path().is_dir()),
        Err(e) => {
            log::warn!("Cannot read {}: {}", dir.display(), e);
            true
        }
    }
}
