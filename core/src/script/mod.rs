//! Conversion script generation
//!
//! One script per rule: a bash loop (or a SLURM array job) that runs the
//! converter for every selected series, followed by the sidecar and file
//! name fixes the rule needs.

mod postprocess;
mod template;

pub use postprocess::{
    jq_filter, post_steps, rename_fieldmap, single_quote, strip_dwi, DWI_INFIX, FIELDMAP_RENAMES,
};
pub use template::{job_name, render, script_path, write_script, ScriptOptions};
