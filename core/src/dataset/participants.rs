use crate::error::Result;
use crate::registry::SeriesRecord;
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

pub const PARTICIPANTS_TSV: &str = "participants.tsv";
pub const PARTICIPANTS_JSON: &str = "participants.json";

const HEADER: &str = "participant_id\tage\tsex";
const MISSING: &str = "n/a";

/// One row of the participant registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Subject code without the `sub-` prefix
    pub id: String,
    pub age: Option<String>,
    pub sex: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            age: None,
            sex: None,
        }
    }

    pub fn with_age(mut self, age: impl Into<String>) -> Self {
        self.age = Some(age.into());
        self
    }

    pub fn with_sex(mut self, sex: impl Into<String>) -> Self {
        self.sex = Some(sex.into());
        self
    }

    /// Participant described by a series record's header fields
    pub fn from_record(record: &SeriesRecord) -> Self {
        Self {
            id: record.subject.clone(),
            age: record.age.as_deref().and_then(normalize_age),
            sex: record
                .sex
                .as_deref()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn participant_id(&self) -> String {
        format!("sub-{}", self.id)
    }

    fn row(&self) -> String {
        format!(
            "{}\t{}\t{}",
            self.participant_id(),
            self.age.as_deref().unwrap_or(MISSING),
            self.sex.as_deref().unwrap_or(MISSING)
        )
    }
}

/// Years from a DICOM age string such as `034Y`
///
/// Ages in other units are kept as recorded.
fn normalize_age(age: &str) -> Option<String> {
    let age = age.trim();
    if age.is_empty() {
        return None;
    }
    match age.strip_suffix('Y').map(str::parse::<u32>) {
        Some(Ok(years)) => Some(years.to_string()),
        _ => Some(age.to_string()),
    }
}

/// Appends a participant to `participants.tsv` unless already listed
///
/// Creates the file with its header and the `participants.json` column
/// descriptions when they don't exist yet. Returns whether a row was added.
pub fn append_participant(bids_path: &Path, participant: &Participant) -> Result<bool> {
    fs::create_dir_all(bids_path)?;
    write_participants_json(bids_path)?;

    let tsv = bids_path.join(PARTICIPANTS_TSV);
    let existing = if tsv.exists() {
        fs::read_to_string(&tsv)?
    } else {
        String::new()
    };

    let id = participant.participant_id();
    let listed = existing
        .lines()
        .skip(1)
        .any(|line| line.split('\t').next() == Some(id.as_str()));
    if listed {
        log::debug!("{} already in {}", id, tsv.display());
        return Ok(false);
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&tsv)?;
    if existing.is_empty() {
        writeln!(file, "{}", HEADER)?;
    } else if !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{}", participant.row())?;

    log::info!("Added {} to {}", id, tsv.display());
    Ok(true)
}

fn write_participants_json(bids_path: &Path) -> Result<()> {
    let path = bids_path.join(PARTICIPANTS_JSON);
    if path.exists() {
        return Ok(());
    }
    let columns = json!({
        "age": {
            "Description": "age of the participant",
            "Units": "years"
        },
        "sex": {
            "Description": "sex of the participant as reported by the participant",
            "Levels": {
                "M": "male",
                "F": "female",
                "O": "other"
            }
        }
    });
    fs::write(&path, serde_json::to_string_pretty(&columns)? + "\n")?;
    Ok(())
}
