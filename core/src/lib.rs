pub mod api;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod extraction;
pub mod matching;
pub mod registry;
pub mod report;
pub mod script;
pub mod types;

pub use api::{Converter, DuplicateGroup, Inspection};
pub use cli::report::TextReport;
pub use config::{ConversionConfig, RuleEntry};
pub use dataset::{amend_phasediffs, append_participant, write_dataset_description, Participant};
pub use error::{BidscatError, Result};
pub use matching::{resolve, resolve_all, DuplicatePolicy, MatchedSeries, Selection};
pub use registry::{scan, ScanMode, SeriesRecord};
pub use report::{Report, Warning};
pub use script::{render, write_script, ScriptOptions};
pub use types::*;
