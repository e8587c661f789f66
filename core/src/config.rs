//! Rule configuration files
//!
//! A conversion is described by one JSON document:
//!
//! ```json
//! {
//!   "bids_path": "/data/bids",
//!   "autosession": true,
//!   "duplicate_policy": "convert-all",
//!   "rules": [
//!     {"description": "rest", "datatype": "func", "suffix": "bold",
//!      "chain": {"task": "rest"}, "json_entries": {"TaskName": "rest"}},
//!     {"description": "fieldmap", "datatype": "fmap", "suffix": "auto",
//!      "search": "field_mapping", "index": 1}
//!   ]
//! }
//! ```

use crate::error::{BidscatError, Result};
use crate::matching::DuplicatePolicy;
use crate::types::{Grammar, RuleSet, RuleSpec};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// A parsed conversion configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfig {
    /// Root of the output dataset
    pub bids_path: PathBuf,

    #[serde(default)]
    pub autosession: bool,

    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,

    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// One entry of the `rules` array
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    pub description: String,
    pub datatype: String,
    pub suffix: String,

    /// Entity key/value pairs, in the order written
    #[serde(default)]
    pub chain: Map<String, Value>,

    #[serde(default)]
    pub search: Option<String>,

    #[serde(default)]
    pub json_entries: Map<String, Value>,

    #[serde(default)]
    pub nonstandard: bool,

    /// 1-based ordinal of the series to take from each study
    #[serde(default)]
    pub index: Option<usize>,

    #[serde(default = "default_strict_match")]
    pub strict_match: bool,

    #[serde(default)]
    pub auto_run: bool,
}

fn default_strict_match() -> bool {
    true
}

impl ConversionConfig {
    /// Reads and parses a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| BidscatError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| BidscatError::Config(e.to_string()))
    }

    /// Builds the validated rule set, failing on the first invalid rule
    pub fn rule_set(&self, grammar: Grammar) -> Result<RuleSet> {
        let mut rules = RuleSet::new(grammar, self.autosession);
        for entry in &self.rules {
            rules.add_rule(entry.to_spec()?)?;
        }
        Ok(rules)
    }
}

impl RuleEntry {
    pub fn to_spec(&self) -> Result<RuleSpec> {
        let mut spec = RuleSpec::new(&self.description, &self.datatype, &self.suffix)
            .nonstandard(self.nonstandard)
            .strict_match(self.strict_match)
            .auto_run(self.auto_run);

        for (key, value) in &self.chain {
            let value = entity_value(value).ok_or_else(|| {
                BidscatError::Config(format!(
                    "rule {}: entity {} must be a string or number",
                    self.description, key
                ))
            })?;
            spec = spec.with_entity(key, value);
        }
        for (key, value) in &self.json_entries {
            spec = spec.json_entry(key, value.clone());
        }
        if let Some(search) = &self.search {
            spec = spec.search(search);
        }
        if let Some(index) = self.index {
            spec = spec.ordinal_index(index);
        }
        Ok(spec)
    }
}

fn entity_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
