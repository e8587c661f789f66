use regex::Regex;
use std::sync::OnceLock;

/// `<subject>_<8-digit-date><rest>`
fn subject_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^(.*)_([0-9]{8})(.*)$").expect("Failed to compile regex"))
}

/// `...Series_<n>_<description>`
fn series_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^.*Series_([0-9]+)_(.*)$").expect("Failed to compile regex"))
}

fn non_alphanumeric_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"[^0-9a-zA-Z]+").expect("Failed to compile regex"))
}

/// Identity parsed from a study directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyDirName {
    /// Sanitized subject code
    pub subject: String,
    /// Acquisition date, `YYYYMMDD`
    pub date: String,
    /// Whatever follows the date (usually a time or accession suffix)
    pub rest: String,
}

/// Identity parsed from a series directory name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesDirName {
    pub number: u32,
    pub description: String,
}

/// Strips everything but ASCII letters and digits
///
/// # Example
///
/// ```
/// use bidscat_core::extraction::sanitize_subject;
///
/// assert_eq!(sanitize_subject("AB-12 x"), "AB12x");
/// assert_eq!(sanitize_subject("Doe^John"), "DoeJohn");
/// ```
pub fn sanitize_subject(raw: &str) -> String {
    non_alphanumeric_regex().replace_all(raw, "").into_owned()
}

/// Parses `<subject>_<8-digit-date><rest>`
///
/// The subject group is greedy, so `A_B_20200101` yields subject `AB`.
/// Returns `None` when the name carries no date or the subject sanitizes to
/// nothing.
pub fn parse_study_dir(name: &str) -> Option<StudyDirName> {
    let caps = subject_regex().captures(name)?;
    let subject = sanitize_subject(caps.get(1)?.as_str());
    if subject.is_empty() {
        return None;
    }
    Some(StudyDirName {
        subject,
        date: caps.get(2)?.as_str().to_string(),
        rest: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
    })
}

/// Parses `Series_<n>_<description>`
pub fn parse_series_dir(name: &str) -> Option<SeriesDirName> {
    let caps = series_regex().captures(name)?;
    let number = caps.get(1)?.as_str().parse().ok()?;
    Some(SeriesDirName {
        number,
        description: caps.get(2)?.as_str().to_string(),
    })
}

/// Subject code of a study directory name
pub fn subject_name(name: &str) -> Option<String> {
    parse_study_dir(name).map(|study| study.subject)
}

/// Acquisition date of a study directory name
pub fn study_date(name: &str) -> Option<String> {
    parse_study_dir(name).map(|study| study.date)
}

/// Series number of a series directory name
pub fn series_number(name: &str) -> Option<u32> {
    parse_series_dir(name).map(|series| series.number)
}
