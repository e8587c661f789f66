use super::postprocess::{post_steps, single_quote};
use crate::error::Result;
use crate::matching::{format_run, Selection};
use crate::types::{EntityOverlay, MappingRule};
use std::fs;
use std::path::{Path, PathBuf};

/// Subject variable the generated scripts loop over
const NAME_VAR: &str = "${name}";

/// Options controlling how conversion scripts are rendered and written
///
/// Use the builder methods to customize:
/// ```
/// use bidscat_core::script::ScriptOptions;
///
/// let options = ScriptOptions::new()
///     .with_slurm(true)
///     .with_prefix("study1")
///     .with_preamble_line("module load dcm2niix");
/// assert_eq!(options.script_ext, ".sh");
/// ```
#[derive(Debug, Clone)]
pub struct ScriptOptions {
    /// Emit a SLURM array job instead of a loop
    pub slurm: bool,

    /// Lines copied verbatim after the header
    pub preamble: Vec<String>,

    /// Directory the scripts are written to
    pub script_dir: PathBuf,

    pub script_prefix: Option<String>,

    pub script_ext: String,

    /// Extra flags passed to the converter
    pub converter_flags: Option<String>,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            slurm: false,
            preamble: Vec::new(),
            script_dir: PathBuf::from("."),
            script_prefix: None,
            script_ext: ".sh".to_string(),
            converter_flags: None,
        }
    }
}

impl ScriptOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slurm(mut self, slurm: bool) -> Self {
        self.slurm = slurm;
        self
    }

    pub fn with_preamble_line(mut self, line: impl Into<String>) -> Self {
        self.preamble.push(line.into());
        self
    }

    pub fn with_script_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.script_dir = dir.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.script_prefix = Some(prefix.into());
        self
    }

    pub fn with_ext(mut self, ext: impl Into<String>) -> Self {
        self.script_ext = ext.into();
        self
    }

    pub fn with_converter_flags(mut self, flags: impl Into<String>) -> Self {
        self.converter_flags = Some(flags.into());
        self
    }
}

/// Job name of a rule's script, `[<prefix>-]<description>`
pub fn job_name(rule: &MappingRule, options: &ScriptOptions) -> String {
    match &options.script_prefix {
        Some(prefix) => format!("{}-{}", prefix, rule.description()),
        None => rule.description().to_string(),
    }
}

/// Path the rule's script is written to
pub fn script_path(rule: &MappingRule, options: &ScriptOptions) -> PathBuf {
    options
        .script_dir
        .join(format!("{}{}", job_name(rule, options), options.script_ext))
}

fn shell_word(s: &str) -> String {
    let plain = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '+' | ':'));
    if plain {
        s.to_string()
    } else {
        single_quote(s)
    }
}

fn shell_array(name: &str, values: &[String], separator: &str) -> String {
    let words: Vec<String> = values.iter().map(|v| shell_word(v)).collect();
    format!("{}=({})", name, words.join(separator))
}

/// Renders the conversion script for one rule's selection
///
/// The output directory and file stem keep `${name}`, `${session}` and
/// `${run}` as shell variables; the arrays carry the per-series values.
pub fn render(selection: &Selection, bids_path: &Path, options: &ScriptOptions) -> String {
    let rule = selection.rule;
    let has_sessions = selection.has_sessions();
    let has_runs = rule.auto_run();

    let mut lines = vec!["#!/bin/bash".to_string(), String::new()];
    if options.slurm {
        lines.push(format!("#SBATCH --job-name={}", job_name(rule, options)));
        lines.push(format!("#SBATCH --array=0-{}", selection.len().saturating_sub(1)));
    }
    lines.extend(options.preamble.iter().cloned());

    lines.push(format!(
        "dicom_path={}",
        shell_word(&selection.input_root.to_string_lossy())
    ));
    lines.push(format!("bids_path={}", shell_word(&bids_path.to_string_lossy())));

    let names: Vec<String> = selection
        .matches
        .iter()
        .map(|m| m.record.subject.clone())
        .collect();
    lines.push(shell_array("names", &names, " "));

    if has_sessions {
        let sessions: Vec<String> = selection
            .matches
            .iter()
            .map(|m| m.record.session.map(|s| s.to_string()).unwrap_or_default())
            .collect();
        lines.push(shell_array("sessions", &sessions, " "));
    }
    if has_runs {
        let runs: Vec<String> = selection
            .matches
            .iter()
            .map(|m| m.run.map(format_run).unwrap_or_default())
            .collect();
        lines.push(shell_array("runs", &runs, " "));
    }

    let input_dirs: Vec<String> = selection
        .matches
        .iter()
        .map(|m| m.relative_path.to_string_lossy().into_owned())
        .collect();
    lines.push(shell_array("input_dirs", &input_dirs, " \\\n            "));
    lines.push(String::new());

    let (index, indent) = if options.slurm {
        ("$SLURM_ARRAY_TASK_ID", "")
    } else {
        lines.push("for i in \"${!names[@]}\"; do".to_string());
        ("$i", "  ")
    };
    lines.push(format!("{}name=${{names[{}]}}", indent, index));
    lines.push(format!("{}input_dir=${{input_dirs[{}]}}", indent, index));
    if has_sessions {
        lines.push(format!("{}session=${{sessions[{}]}}", indent, index));
    }
    if has_runs {
        lines.push(format!("{}run=${{runs[{}]}}", indent, index));
    }

    lines.extend(conversion_steps(rule, options));

    if !options.slurm {
        lines.push("done".to_string());
    }

    let mut script = lines.join("\n");
    script.push('\n');
    script
}

fn conversion_steps(rule: &MappingRule, options: &ScriptOptions) -> Vec<String> {
    let overlay = EntityOverlay::new(rule.chain());
    let output_dir = overlay.output_dir(NAME_VAR, rule.datatype());
    let stem = overlay.file_stem(NAME_VAR, rule.suffix());
    let flags = options
        .converter_flags
        .as_deref()
        .map(|flags| format!("{} ", flags))
        .unwrap_or_default();

    let mut lines = vec![
        format!("  mkdir --parents \"${{bids_path}}/{}\"", output_dir),
        format!(
            "  dcmoutput=$(dcm2niix -ba n -l o -o \"${{bids_path}}/{}\" -f \"{}\" {}\"${{dicom_path}}/${{input_dir}}\")",
            output_dir, stem, flags
        ),
        "  echo \"${dcmoutput}\"".to_string(),
    ];
    lines.extend(post_steps(rule, &output_dir));
    lines
}

/// Renders and writes a rule's script, returning its path
///
/// An existing script is overwritten. On unix the script is made executable.
pub fn write_script(
    selection: &Selection,
    bids_path: &Path,
    options: &ScriptOptions,
) -> Result<PathBuf> {
    let path = script_path(selection.rule, options);
    fs::create_dir_all(&options.script_dir)?;

    if path.exists() {
        log::debug!("Overwriting {}", path.display());
    }
    fs::write(&path, render(selection, bids_path, options))?;
    make_executable(&path)?;

    log::info!("Wrote {} ({} series)", path.display(), selection.len());
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
