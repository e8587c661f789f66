use crate::error::{BidscatError, Result};
use crate::report::{Report, Warning};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const PHASEDIFF: &str = "phasediff";
const MAGNITUDE1: &str = "magnitude1";

/// Adds `EchoTime1`/`EchoTime2` to every phase-difference sidecar
///
/// `EchoTime1` comes from the first magnitude image's sidecar next to it and
/// `EchoTime2` is the sidecar's own `EchoTime`. Sidecars whose sibling is
/// missing, that do not parse as JSON objects, or that lack an echo time are
/// reported and skipped.
///
/// Returns the number of sidecars rewritten.
pub fn amend_phasediffs(bids_path: &Path, report: &mut Report) -> Result<usize> {
    if !bids_path.exists() {
        return Err(BidscatError::PathNotFound(bids_path.to_path_buf()));
    }

    let mut amended = 0;
    for path in phasediff_sidecars(bids_path) {
        log::debug!("Amending {}", path.display());
        let sibling = magnitude1_sibling(&path);
        if !sibling.exists() {
            report.warn(Warning::MissingSibling { path, sibling });
            continue;
        }

        let (mut target, magnitude) = match (read_object(&path), read_object(&sibling)) {
            (Ok(target), Ok(magnitude)) => (target, magnitude),
            (Err(e), _) => {
                report.warn(Warning::UnreadableInput {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
            (_, Err(e)) => {
                report.warn(Warning::UnreadableInput {
                    path: sibling,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let (Some(echo1), Some(echo2)) = (magnitude.get("EchoTime"), target.get("EchoTime"))
        else {
            report.warn(Warning::UnreadableInput {
                path,
                reason: "no EchoTime in sidecar or its magnitude1 sibling".to_string(),
            });
            continue;
        };

        let (echo1, echo2) = (echo1.clone(), echo2.clone());
        target.insert("EchoTime1".to_string(), echo1);
        target.insert("EchoTime2".to_string(), echo2);
        write_pretty(&path, &Value::Object(target))?;
        amended += 1;
    }

    log::info!("Amended {} phasediff sidecar(s)", amended);
    Ok(amended)
}

fn phasediff_sidecars(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Error walking {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            name.contains(PHASEDIFF) && name.ends_with(".json")
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// `sub-A1_phasediff.json` -> `sub-A1_magnitude1.json` in the same directory
fn magnitude1_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().replace(PHASEDIFF, MAGNITUDE1))
        .unwrap_or_default();
    path.with_file_name(name)
}

fn read_object(path: &Path) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(&fs::read_to_string(path)?)? {
        Value::Object(map) => Ok(map),
        _ => Err(BidscatError::InvalidValue(format!(
            "{} is not a JSON object",
            path.display()
        ))),
    }
}

/// Writes JSON with four-space indentation, keeping key order
fn write_pretty(path: &Path, value: &Value) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    fs::write(path, buf)?;
    Ok(())
}
