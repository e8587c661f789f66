use crate::config::ConversionConfig;
use crate::dataset::{append_participant, write_dataset_description, Participant};
use crate::error::{BidscatError, Result};
use crate::matching::{find_duplicates, resolve_all, DuplicatePolicy};
use crate::registry::{assign_sessions, scan, ScanMode, SeriesRecord};
use crate::report::{Report, Warning};
use crate::script::{write_script, ScriptOptions};
use crate::types::{Grammar, RuleId, RuleSet, RuleSpec};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Main entry point for turning a DICOM tree into conversion scripts
///
/// Collects series from one or more input trees, holds the declared rules,
/// and writes one script per rule that selected anything. Warnings from
/// every step accumulate in [`Converter::report`].
///
/// # Example
///
/// ```no_run
/// use bidscat_core::{Converter, RuleSpec, ScanMode, ScriptOptions};
///
/// let mut converter = Converter::new("/data/bids", true);
/// converter.add_dicoms("/data/dicom", ScanMode::Auto)?;
/// converter.add_rule(
///     RuleSpec::new("rest", "func", "bold")
///         .with_entity("task", "rest")
///         .json_entry("TaskName", "rest"),
/// )?;
///
/// let scripts = converter.generate_scripts(&ScriptOptions::new().with_script_dir("scripts"))?;
/// for path in scripts {
///     println!("{}", path.display());
/// }
/// # Ok::<(), bidscat_core::BidscatError>(())
/// ```
#[derive(Debug)]
pub struct Converter {
    bids_path: PathBuf,
    rules: RuleSet,
    records: Vec<SeriesRecord>,
    policy: DuplicatePolicy,
    report: Report,
}

impl Converter {
    /// Creates a converter with the standard naming grammar
    pub fn new(bids_path: impl Into<PathBuf>, autosession: bool) -> Self {
        Self::with_rules(bids_path, RuleSet::new(Grammar::bids(), autosession))
    }

    /// Creates a converter around an existing (possibly custom-grammar) rule set
    pub fn with_rules(bids_path: impl Into<PathBuf>, rules: RuleSet) -> Self {
        Self {
            bids_path: bids_path.into(),
            rules,
            records: Vec::new(),
            policy: DuplicatePolicy::default(),
            report: Report::new(),
        }
    }

    /// Creates a converter from a parsed configuration file
    pub fn from_config(config: &ConversionConfig) -> Result<Self> {
        let rules = config.rule_set(Grammar::bids())?;
        Ok(Self::with_rules(&config.bids_path, rules).with_policy(config.duplicate_policy))
    }

    /// Builder: sets how duplicate series are handled
    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Scans a DICOM tree and adds its series
    ///
    /// A tree without any recognizable series is reported, not an error.
    /// With auto-session enabled, sessions are renumbered over every series
    /// added so far. Returns the number of series added.
    pub fn add_dicoms(&mut self, path: impl AsRef<Path>, mode: ScanMode) -> Result<usize> {
        let path = path.as_ref();
        let outcome = match scan(path, mode) {
            Ok(outcome) => outcome,
            Err(BidscatError::NoSeriesFound(root)) => {
                self.report.warn(Warning::NoInputFound { root });
                return Ok(0);
            }
            Err(e) => return Err(e),
        };

        let added = outcome.records.len();
        self.records.extend(outcome.records);
        self.report.absorb(outcome.report);

        if self.rules.autosession() {
            assign_sessions(&mut self.records);
        }
        log::info!("Added {} series from {}", added, path.display());
        Ok(added)
    }

    /// Declares a conversion rule
    pub fn add_rule(&mut self, spec: RuleSpec) -> Result<RuleId> {
        self.rules.add_rule(spec)
    }

    pub fn bids_path(&self) -> &Path {
        &self.bids_path
    }

    pub fn records(&self) -> &[SeriesRecord] {
        &self.records
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Warnings collected so far
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Summary of the series added so far
    pub fn inspect(&self) -> Inspection {
        Inspection::from_records(&self.records)
    }

    /// Writes one script per rule with at least one selected series
    ///
    /// Rules without matches are reported and produce no script.
    pub fn generate_scripts(&mut self, options: &ScriptOptions) -> Result<Vec<PathBuf>> {
        let selections = resolve_all(&self.rules, &self.records, self.policy, &mut self.report);

        let mut written = Vec::with_capacity(selections.len());
        for selection in &selections {
            written.push(write_script(selection, &self.bids_path, options)?);
        }
        Ok(written)
    }

    /// Adds every subject to `participants.tsv`, returning how many were new
    pub fn write_participants(&self) -> Result<usize> {
        let mut added = 0;
        for participant in self.participants() {
            if append_participant(&self.bids_path, &participant)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Writes `dataset_description.json` unless it already exists
    pub fn write_dataset_description(&mut self) -> Result<bool> {
        write_dataset_description(&self.bids_path, &mut self.report)
    }

    /// One participant per subject, in order of first encounter
    ///
    /// Age and sex come from the first of the subject's series that has them.
    pub fn participants(&self) -> Vec<Participant> {
        let mut participants: Vec<Participant> = Vec::new();
        for record in &self.records {
            let found = Participant::from_record(record);
            match participants.iter().position(|p| p.id == found.id) {
                Some(position) => {
                    let existing = &mut participants[position];
                    if existing.age.is_none() {
                        existing.age = found.age;
                    }
                    if existing.sex.is_none() {
                        existing.sex = found.sex;
                    }
                }
                None => participants.push(found),
            }
        }
        participants
    }
}

/// A description repeated within one study
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub description: String,
    pub study_id: String,
    pub count: usize,
}

/// Summary of a scanned tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inspection {
    pub series: usize,
    pub studies: usize,
    pub subjects: usize,

    /// Distinct series descriptions, sorted
    pub descriptions: Vec<String>,

    /// Descriptions that would need an ordinal index to be unambiguous
    pub duplicates: Vec<DuplicateGroup>,
}

impl Inspection {
    pub fn from_records(records: &[SeriesRecord]) -> Self {
        let studies: BTreeSet<&str> = records.iter().map(|r| r.study_id.as_str()).collect();
        let subjects: BTreeSet<&str> = records.iter().map(|r| r.subject.as_str()).collect();
        let descriptions: BTreeSet<&str> =
            records.iter().map(|r| r.description.as_str()).collect();

        let duplicates = find_duplicates(records)
            .into_iter()
            .map(|group| DuplicateGroup {
                description: group[0].description.clone(),
                study_id: group[0].study_id.clone(),
                count: group.len(),
            })
            .collect();

        Self {
            series: records.len(),
            studies: studies.len(),
            subjects: subjects.len(),
            descriptions: descriptions.into_iter().map(String::from).collect(),
            duplicates,
        }
    }
}
