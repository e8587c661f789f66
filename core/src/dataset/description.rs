use crate::error::Result;
use crate::report::{Report, Warning};
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const DATASET_DESCRIPTION: &str = "dataset_description.json";

/// BIDS version written into new dataset descriptions
pub const BIDS_VERSION: &str = "1.8.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetDescription {
    pub name: String,
    #[serde(rename = "BIDSVersion")]
    pub bids_version: String,
    pub authors: Vec<String>,
}

impl DatasetDescription {
    /// Description named after the dataset directory, authored by its owner
    pub fn for_dataset(bids_path: &Path) -> Self {
        let name = bids_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| bids_path.display().to_string());
        Self {
            name,
            bids_version: BIDS_VERSION.to_string(),
            authors: owner_name(bids_path).into_iter().collect(),
        }
    }
}

/// Writes `dataset_description.json` unless it already exists
///
/// Returns whether the file was written; an existing file is reported and
/// left untouched.
pub fn write_dataset_description(bids_path: &Path, report: &mut Report) -> Result<bool> {
    let path = bids_path.join(DATASET_DESCRIPTION);
    if path.exists() {
        report.warn(Warning::OutputExists { path });
        return Ok(false);
    }

    fs::create_dir_all(bids_path)?;
    let description = DatasetDescription::for_dataset(bids_path);
    fs::write(&path, serde_json::to_string_pretty(&description)? + "\n")?;
    log::info!("Wrote {}", path.display());
    Ok(true)
}

/// User name owning `path`, from the passwd database or the numeric uid
#[cfg(unix)]
fn owner_name(path: &Path) -> Option<String> {
    use std::os::unix::fs::MetadataExt;

    let uid = fs::metadata(path).ok()?.uid();
    Some(lookup_user(uid).unwrap_or_else(|| uid.to_string()))
}

#[cfg(not(unix))]
fn owner_name(_path: &Path) -> Option<String> {
    None
}

#[cfg(unix)]
fn lookup_user(uid: u32) -> Option<String> {
    let passwd = fs::read_to_string("/etc/passwd").ok()?;
    user_from_passwd(&passwd, uid)
}

/// Finds the login name for `uid` in passwd-formatted text
fn user_from_passwd(passwd: &str, uid: u32) -> Option<String> {
    passwd
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?;
            let entry_uid: u32 = fields.nth(1)?.parse().ok()?;
            (entry_uid == uid).then(|| name.to_string())
        })
}
