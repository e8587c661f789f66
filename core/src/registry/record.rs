use crate::extraction::{parse_series_dir, parse_study_dir, SeriesHeader};
use crate::report::{Report, Warning};
use std::fs;
use std::path::{Path, PathBuf};

/// One acquisition series found in the input tree
///
/// Built once per scan. Only `session` changes afterwards, when auto-session
/// numbering runs before matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRecord {
    /// Leaf directory holding the series' files
    pub path: PathBuf,

    /// Sanitized subject code
    pub subject: String,

    /// StudyInstanceUID, or the study directory name
    pub study_id: String,

    /// Series number within the study
    pub ordinal: u32,

    /// Series description used for rule matching
    pub description: String,

    /// Study date, `YYYYMMDD`
    pub date: Option<String>,

    /// Study time, as recorded
    pub time: Option<String>,

    /// PatientAge, header scans only
    pub age: Option<String>,

    /// PatientSex, header scans only
    pub sex: Option<String>,

    /// Session number assigned by auto-session
    pub session: Option<u32>,
}

impl SeriesRecord {
    /// Creates a record with only the identity fields set
    pub fn new(
        path: impl Into<PathBuf>,
        subject: impl Into<String>,
        study_id: impl Into<String>,
        ordinal: u32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            subject: subject.into(),
            study_id: study_id.into(),
            ordinal,
            description: description.into(),
            date: None,
            time: None,
            age: None,
            sex: None,
            session: None,
        }
    }

    /// Builder: sets the study date
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Builder: sets the study time
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Builds a record from the directory naming convention
    ///
    /// Expects `<subject>_<date><rest>/Series_<n>_<description>`. Returns
    /// `None` when either name does not follow it.
    pub fn from_dir_name(path: &Path) -> Option<Self> {
        let series = parse_series_dir(path.file_name()?.to_str()?)?;
        let study_name = path.parent()?.file_name()?.to_str()?;
        let study = parse_study_dir(study_name)?;

        let time = study.rest.trim_start_matches('_');
        let time = (!time.is_empty() && time.chars().all(|c| c.is_ascii_digit()))
            .then(|| time.to_string());

        Some(Self {
            path: path.to_path_buf(),
            subject: study.subject,
            study_id: study_name.to_string(),
            ordinal: series.number,
            description: series.description,
            date: Some(study.date),
            time,
            age: None,
            sex: None,
            session: None,
        })
    }

    /// Builds a record from a parsed DICOM header
    pub fn from_header(path: PathBuf, header: SeriesHeader) -> Self {
        Self {
            path,
            subject: header.subject,
            study_id: header.study_instance_uid,
            ordinal: header.series_number,
            description: header.description,
            date: header.study_date,
            time: header.study_time,
            age: header.age,
            sex: header.sex,
            session: None,
        }
    }

    /// Builds a record from the first readable DICOM file in a directory
    ///
    /// Files that fail to parse are reported and skipped. Returns `None` if
    /// no file in the directory parses.
    pub fn from_dicom_dir(path: &Path, report: &mut Report) -> Option<Self> {
        let mut files: Vec<PathBuf> = match fs::read_dir(path) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(e) => {
                report.warn(Warning::UnreadableInput {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
                return None;
            }
        };
        files.sort();

        for file in files {
            match SeriesHeader::from_file(&file) {
                Ok(header) => return Some(Self::from_header(path.to_path_buf(), header)),
                Err(e) => report.warn(Warning::UnreadableInput {
                    path: file,
                    reason: e.to_string(),
                }),
            }
        }
        None
    }

    /// Chronological key of the study this series belongs to
    pub fn study_time_key(&self) -> Option<(&str, &str)> {
        self.date
            .as_deref()
            .map(|date| (date, self.time.as_deref().unwrap_or("")))
    }
}
