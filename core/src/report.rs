//! Non-fatal diagnostics
//!
//! Scanning, matching and post-processing never abort a batch because some
//! data is missing. Each such condition becomes a [`Warning`], is logged when
//! it is recorded, and is kept in a [`Report`] for the caller to inspect at
//! the end of the operation.

use std::fmt;
use std::path::PathBuf;

/// A data-availability problem that was reported and skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// No acquisition series under an input root
    NoInputFound { root: PathBuf },

    /// A rule selected no series
    NoMatch { rule: String, search: String },

    /// More than one series with the same description in one study
    DuplicateSeries {
        description: String,
        study_id: String,
        count: usize,
    },

    /// An output file already exists and was left untouched
    OutputExists { path: PathBuf },

    /// A paired field-map sidecar is missing its sibling
    MissingSibling { path: PathBuf, sibling: PathBuf },

    /// A file could not be read as an acquisition file
    UnreadableInput { path: PathBuf, reason: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NoInputFound { root } => {
                write!(f, "No dicoms found under {}", root.display())
            }
            Warning::NoMatch { rule, search } => {
                write!(f, "No matching dicoms found for {} (rule {})", search, rule)
            }
            Warning::DuplicateSeries {
                description,
                study_id,
                count,
            } => write!(
                f,
                "More than one copy of {} for study {} ({} series)",
                description, study_id, count
            ),
            Warning::OutputExists { path } => {
                write!(f, "{} already exists, skipped", path.display())
            }
            Warning::MissingSibling { path, sibling } => write!(
                f,
                "can't find {} for {}",
                sibling.display(),
                path.display()
            ),
            Warning::UnreadableInput { path, reason } => {
                write!(f, "Unreadable input {}: {}", path.display(), reason)
            }
        }
    }
}

/// Collected warnings of one or more operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    warnings: Vec<Warning>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and logs it
    pub fn warn(&mut self, warning: Warning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Moves every warning of `other` into this report without logging again
    pub fn absorb(&mut self, other: Report) {
        self.warnings.extend(other.warnings);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Number of duplicate-series warnings
    pub fn duplicate_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::DuplicateSeries { .. }))
            .count()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for warning in &self.warnings {
            writeln!(f, "warning: {}", warning)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_collects_in_order() {
        let mut report = Report::new();
        report.warn(Warning::NoMatch {
            rule: "rest".to_string(),
            search: "rest".to_string(),
        });
        report.warn(Warning::DuplicateSeries {
            description: "localizer".to_string(),
            study_id: "A1_20200101".to_string(),
            count: 2,
        });

        assert_eq!(report.len(), 2);
        assert_eq!(report.duplicate_count(), 1);
        assert!(matches!(report.warnings()[0], Warning::NoMatch { .. }));
    }

    #[test]
    fn test_absorb_merges_reports() {
        let mut first = Report::new();
        let mut second = Report::new();
        second.warn(Warning::OutputExists {
            path: PathBuf::from("dataset_description.json"),
        });

        first.absorb(second);
        assert_eq!(first.len(), 1);
        assert!(format!("{}", first).contains("already exists"));
    }
}
