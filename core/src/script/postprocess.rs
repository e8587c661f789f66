//! Post-conversion steps appended to generated scripts
//!
//! Each rename rule exists once as data and is used both to emit the shell
//! snippet and by the pure helpers ([`rename_fieldmap`], [`strip_dwi`]) that
//! describe what the snippet does to a file name.

use crate::types::MappingRule;
use serde_json::Value;

/// Field-map echo renames, most specific pattern first
///
/// `auto_e2` is a prefix of `auto_e2_ph`, so the phase-difference rule has
/// to be tried before it.
pub const FIELDMAP_RENAMES: [(&str, &str); 3] = [
    ("auto_e2_ph", "phasediff"),
    ("auto_e2", "magnitude2"),
    ("auto_e1", "magnitude1"),
];

/// Substring the converter leaves in diffusion gradient file names
pub const DWI_INFIX: &str = "dwi.";

const GRADIENT_EXTENSIONS: [&str; 2] = [".bvec", ".bval"];

/// New name for a field-map output, or `None` when it needs no rename
///
/// Exactly one rename applies: the first pattern of [`FIELDMAP_RENAMES`]
/// found in the name.
///
/// # Example
///
/// ```
/// use bidscat_core::script::rename_fieldmap;
///
/// assert_eq!(
///     rename_fieldmap("sub-A1_auto_e2_ph.nii").as_deref(),
///     Some("sub-A1_phasediff.nii")
/// );
/// assert_eq!(rename_fieldmap("sub-A1_phasediff.nii"), None);
/// ```
pub fn rename_fieldmap(name: &str) -> Option<String> {
    FIELDMAP_RENAMES
        .iter()
        .find(|(pattern, _)| name.contains(pattern))
        .map(|(pattern, replacement)| name.replace(pattern, replacement))
}

/// New name for a diffusion gradient file, or `None` when it needs none
pub fn strip_dwi(name: &str) -> Option<String> {
    let is_gradient = GRADIENT_EXTENSIONS.iter().any(|ext| name.ends_with(ext));
    (is_gradient && name.contains(DWI_INFIX)).then(|| name.replace(DWI_INFIX, ""))
}

/// Renders a jq filter setting every entry, e.g. `.TaskName = "rest"`
pub fn jq_filter(entries: &[(String, Value)]) -> String {
    entries
        .iter()
        .map(|(key, value)| format!("{} = {}", jq_path(key), value))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn jq_path(key: &str) -> String {
    let is_identifier = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if is_identifier {
        format!(".{}", key)
    } else {
        format!(".[{}]", Value::String(key.to_string()))
    }
}

/// Quotes a string for a single-quoted shell word
pub fn single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Shell lines run after each conversion, indented for the script body
///
/// `output_dir` is the output directory relative to `${bids_path}`.
pub fn post_steps(rule: &MappingRule, output_dir: &str) -> Vec<String> {
    let mut lines = Vec::new();

    if !rule.json_entries().is_empty() || rule.is_auto_fieldmap() {
        lines.push(String::new());
        lines.push("  # get names of converted files".to_string());
        lines.push("  if grep -q Convert <<< \"${dcmoutput}\"; then".to_string());
        lines.push("    tmparray=($(echo \"${dcmoutput}\" | grep Convert))".to_string());
        lines.push("    output_files=()".to_string());
        lines.push(
            "    for ((j=4; j<${#tmparray[@]}; j+=6)); do output_files+=(\"${tmparray[$j]}\"); done"
                .to_string(),
        );

        // Sidecar edits use the converter's names, so they run before renames
        if !rule.json_entries().is_empty() {
            lines.push(String::new());
            lines.push("    # add fields to json file(s)".to_string());
            lines.push("    for output_file in \"${output_files[@]}\"; do".to_string());
            lines.push(format!(
                "      jq {} \"${{output_file}}.json\" > \"${{output_file}}.tmp\" && mv \"${{output_file}}.tmp\" \"${{output_file}}.json\"",
                single_quote(&jq_filter(rule.json_entries()))
            ));
            lines.push("    done".to_string());
        }

        if rule.is_auto_fieldmap() {
            lines.push(String::new());
            lines.push("    # rename fieldmap file(s)".to_string());
            lines.push("    for output_file in \"${output_files[@]}\"; do".to_string());
            // Exact stem only: `_auto_e2` must not pick up `_auto_e2_ph`
            lines.push("      for filename in \"${output_file}\".*; do".to_string());
            lines.push("        [ -e \"${filename}\" ] || continue".to_string());
            lines.push("        newname=\"${filename}\"".to_string());
            for (i, (pattern, replacement)) in FIELDMAP_RENAMES.iter().enumerate() {
                let keyword = if i == 0 { "if" } else { "elif" };
                lines.push(format!(
                    "        {} [[ \"${{filename}}\" == *{}* ]]; then",
                    keyword, pattern
                ));
                lines.push(format!(
                    "          newname=\"${{filename//{}/{}}}\"",
                    pattern, replacement
                ));
            }
            lines.push("        fi".to_string());
            lines.push(
                "        if [[ \"${newname}\" != \"${filename}\" ]]; then mv \"${filename}\" \"${newname}\"; fi"
                    .to_string(),
            );
            lines.push("      done".to_string());
            lines.push("    done".to_string());
        }

        lines.push("  fi".to_string());
    }

    if rule.is_diffusion() {
        lines.push(String::new());
        lines.push("  # rename bvecs and bvals files".to_string());
        lines.push(format!(
            "  for x in \"${{bids_path}}/{}/\"*{}bv*; do",
            output_dir, DWI_INFIX
        ));
        lines.push("    [ -e \"$x\" ] || continue".to_string());
        lines.push(format!("    mv \"$x\" \"${{x//{}/}}\"", DWI_INFIX));
        lines.push("  done".to_string());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Grammar, RuleSet, RuleSpec};
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use std::process::Command;
    use tempfile::TempDir;

    fn rule(spec: RuleSpec) -> MappingRule {
        let mut rules = RuleSet::new(Grammar::bids(), false);
        rules.add_rule(spec).unwrap();
        let rule = rules.iter().next().unwrap().clone();
        rule
    }

    fn has_program(name: &str) -> bool {
        Command::new(name)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// Lays out what the converter leaves behind for a two-echo field map
    /// and runs the post steps against it under bash
    fn run_fieldmap_steps(rule: &MappingRule, dir: &Path) -> std::process::Output {
        let mut dcmoutput = Vec::new();
        for stem in ["sub-A1_auto_e1", "sub-A1_auto_e2", "sub-A1_auto_e2_ph"] {
            fs::write(dir.join(format!("{}.nii", stem)), b"nii").unwrap();
            fs::write(dir.join(format!("{}.json", stem)), r#"{"EchoTime": 0.005}"#).unwrap();
            dcmoutput.push(format!(
                "Convert 1 DICOM as {}/{} (64x64x32x1)",
                dir.display(),
                stem
            ));
        }

        let mut script = vec![
            format!("bids_path={}", single_quote(&dir.display().to_string())),
            format!("dcmoutput={}", single_quote(&dcmoutput.join("\n"))),
        ];
        script.extend(post_steps(rule, "."));
        let path = dir.join("steps.sh");
        fs::write(&path, script.join("\n")).unwrap();

        Command::new("bash").arg(&path).output().unwrap()
    }

    #[test]
    fn test_rename_fieldmap_most_specific_first() {
        assert_eq!(
            rename_fieldmap("sub-A1_auto_e2_ph.nii").as_deref(),
            Some("sub-A1_phasediff.nii")
        );
        assert_eq!(
            rename_fieldmap("sub-A1_auto_e2.json").as_deref(),
            Some("sub-A1_magnitude2.json")
        );
        assert_eq!(
            rename_fieldmap("sub-A1_auto_e1.nii.gz").as_deref(),
            Some("sub-A1_magnitude1.nii.gz")
        );
    }

    #[test]
    fn test_rename_fieldmap_idempotent() {
        for name in [
            "sub-A1_auto_e1.nii",
            "sub-A1_auto_e2.nii",
            "sub-A1_auto_e2_ph.nii",
        ] {
            let renamed = rename_fieldmap(name).unwrap();
            assert_eq!(rename_fieldmap(&renamed), None);
            assert!(!renamed.contains("magnitude2_ph"));
        }
    }

    #[test]
    fn test_strip_dwi() {
        assert_eq!(
            strip_dwi("sub-A1_dwi.bval").as_deref(),
            Some("sub-A1_bval")
        );
        assert_eq!(strip_dwi("sub-A1_dwi.nii.gz"), None);
        assert_eq!(strip_dwi("sub-A1_bvec"), None);
    }

    #[test]
    fn test_jq_filter() {
        let entries = vec![
            ("TaskName".to_string(), json!("rest")),
            ("Echo-Spacing".to_string(), json!(2.5)),
        ];
        assert_eq!(
            jq_filter(&entries),
            r#".TaskName = "rest" | .["Echo-Spacing"] = 2.5"#
        );
    }

    #[test]
    fn test_single_quote() {
        assert_eq!(single_quote("a'b"), r"'a'\''b'");
    }

    #[test]
    fn test_no_steps_for_plain_rule() {
        let plain = rule(RuleSpec::new("t1", "anat", "T1w"));
        assert!(post_steps(&plain, "sub-${name}/anat").is_empty());
    }

    #[test]
    fn test_fieldmap_steps_order() {
        let fmap = rule(RuleSpec::new("fieldmap", "fmap", "auto"));
        let script = post_steps(&fmap, "sub-${name}/fmap").join("\n");
        let ph = script.find("*auto_e2_ph*").unwrap();
        let e2 = script.find("*auto_e2*").unwrap();
        let e1 = script.find("*auto_e1*").unwrap();
        assert!(ph < e2 && e2 < e1);
        assert!(script.contains("elif"));
        assert!(!script.contains("jq"));
    }

    #[test]
    fn test_json_steps() {
        let bold = rule(RuleSpec::new("rest", "func", "bold").json_entry("TaskName", "rest"));
        let script = post_steps(&bold, "sub-${name}/func").join("\n");
        assert!(script.contains(r#"jq '.TaskName = "rest"' "${output_file}.json""#));
        assert!(script.contains(r#"> "${output_file}.tmp" && mv "${output_file}.tmp""#));
        assert!(!script.contains("fieldmap"));
    }

    #[test]
    fn test_fieldmap_rename_uses_exact_stem() {
        let fmap = rule(RuleSpec::new("fieldmap", "fmap", "auto"));
        let script = post_steps(&fmap, "sub-${name}/fmap").join("\n");
        assert!(script.contains(r#"for filename in "${output_file}".*; do"#));
        assert!(!script.contains(r#""${output_file}"*"#));
    }

    #[test]
    fn test_fieldmap_steps_rename_every_echo() {
        if !has_program("bash") {
            return;
        }
        let dir = TempDir::new().unwrap();
        let fmap = rule(RuleSpec::new("fieldmap", "fmap", "auto"));

        let output = run_fieldmap_steps(&fmap, dir.path());
        assert!(output.status.success());
        assert!(output.stderr.is_empty(), "{}", String::from_utf8_lossy(&output.stderr));

        for name in ["magnitude1", "magnitude2", "phasediff"] {
            for ext in ["nii", "json"] {
                assert!(dir.path().join(format!("sub-A1_{}.{}", name, ext)).exists());
            }
        }
        let leftover = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_name().to_string_lossy().contains("auto_"));
        assert!(!leftover);
    }

    #[test]
    fn test_fieldmap_steps_with_json_entries() {
        if !has_program("bash") || !has_program("jq") {
            return;
        }
        let dir = TempDir::new().unwrap();
        let fmap = rule(
            RuleSpec::new("fieldmap", "fmap", "auto").json_entry("IntendedFor", "func/rest.nii"),
        );

        let output = run_fieldmap_steps(&fmap, dir.path());
        assert!(output.status.success());
        assert!(output.stderr.is_empty(), "{}", String::from_utf8_lossy(&output.stderr));

        for name in ["magnitude1", "magnitude2", "phasediff"] {
            let text = fs::read_to_string(dir.path().join(format!("sub-A1_{}.json", name))).unwrap();
            let sidecar: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(sidecar["IntendedFor"], "func/rest.nii");
            assert_eq!(sidecar["EchoTime"], 0.005);
        }
    }

    #[test]
    fn test_failed_json_edit_keeps_sidecar() {
        if !has_program("bash") {
            return;
        }
        let dir = TempDir::new().unwrap();
        let bold = rule(RuleSpec::new("rest", "func", "bold").json_entry("TaskName", "rest"));
        fs::write(dir.path().join("sub-A1_task-rest_bold.json"), r#"{"EchoTime": 0.03}"#).unwrap();

        // A failing jq must leave the original sidecar in place
        let mut script = vec![
            "jq() { return 1; }".to_string(),
            format!(
                "dcmoutput={}",
                single_quote(&format!(
                    "Convert 1 DICOM as {}/sub-A1_task-rest_bold (64x64x32x100)",
                    dir.path().display()
                ))
            ),
        ];
        script.extend(post_steps(&bold, "."));
        let path = dir.path().join("steps.sh");
        fs::write(&path, script.join("\n")).unwrap();
        Command::new("bash").arg(&path).output().unwrap();

        let text = fs::read_to_string(dir.path().join("sub-A1_task-rest_bold.json")).unwrap();
        assert_eq!(text, r#"{"EchoTime": 0.03}"#);
    }

    #[test]
    fn test_dwi_steps() {
        let dwi = rule(RuleSpec::new("dti", "dwi", "dwi"));
        let script = post_steps(&dwi, "sub-${name}/dwi").join("\n");
        assert!(script.contains(r#"for x in "${bids_path}/sub-${name}/dwi/"*dwi.bv*; do"#));
        assert!(script.contains(r#"mv "$x" "${x//dwi./}""#));
    }
}
