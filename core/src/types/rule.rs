use super::entity::{EntityChain, EntityKey, Placeholder};
use super::grammar::Grammar;
use crate::error::{BidscatError, Result};
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// How a rule's search pattern is compared with series descriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchMode {
    /// Description equals the search string
    #[default]
    Exact,
    /// Search string is a regex found anywhere in the description
    Pattern,
}

impl MatchMode {
    pub fn simple_name(&self) -> &'static str {
        match self {
            MatchMode::Exact => "exact",
            MatchMode::Pattern => "pattern",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Declaration of a conversion target, before validation
///
/// Only `description`, `datatype` and `suffix` are required; everything else
/// has a documented default applied by [`RuleSet::add_rule`]:
///
/// - `search` defaults to `description`
/// - `strict_match` defaults to `true` ([`MatchMode::Exact`])
/// - `nonstandard`, `auto_run` default to `false`
///
/// # Example
///
/// ```
/// use bidscat_core::{Grammar, RuleSet, RuleSpec};
///
/// let mut rules = RuleSet::new(Grammar::bids(), false);
/// let id = rules
///     .add_rule(
///         RuleSpec::new("rest", "func", "bold")
///             .with_entity("task", "rest")
///             .search("resting_state")
///             .strict_match(false),
///     )
///     .unwrap();
///
/// let rule = rules.get(id).unwrap();
/// assert!(rule.matches("resting_state_mb4"));
/// assert!(!rule.matches("localizer"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub description: String,
    pub datatype: String,
    pub suffix: String,
    pub chain: Vec<(String, String)>,
    pub search: Option<String>,
    pub json_entries: Vec<(String, Value)>,
    pub nonstandard: bool,
    pub ordinal_index: Option<usize>,
    pub strict_match: bool,
    pub auto_run: bool,
}

impl RuleSpec {
    pub fn new(
        description: impl Into<String>,
        datatype: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            datatype: datatype.into(),
            suffix: suffix.into(),
            chain: Vec::new(),
            search: None,
            json_entries: Vec::new(),
            nonstandard: false,
            ordinal_index: None,
            strict_match: true,
            auto_run: false,
        }
    }

    /// Builder: adds an entity to the output chain
    pub fn with_entity(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.chain.push((key.into(), value.into()));
        self
    }

    /// Builder: sets the search pattern
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Builder: adds a field injected into the output sidecar
    pub fn json_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.json_entries.push((key.into(), value.into()));
        self
    }

    /// Builder: bypasses grammar validation
    pub fn nonstandard(mut self, nonstandard: bool) -> Self {
        self.nonstandard = nonstandard;
        self
    }

    /// Builder: selects the Nth (1-based) matching series of each study
    pub fn ordinal_index(mut self, index: usize) -> Self {
        self.ordinal_index = Some(index);
        self
    }

    /// Builder: exact (`true`) or pattern (`false`) matching
    pub fn strict_match(mut self, strict: bool) -> Self {
        self.strict_match = strict;
        self
    }

    /// Builder: numbers repeated matches within a study as runs
    pub fn auto_run(mut self, auto_run: bool) -> Self {
        self.auto_run = auto_run;
        self
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    Pattern(Regex),
}

/// Validated, immutable conversion target
#[derive(Debug, Clone)]
pub struct MappingRule {
    description: String,
    search: String,
    matcher: Matcher,
    ordinal_index: Option<usize>,
    datatype: String,
    suffix: String,
    chain: EntityChain,
    json_entries: Vec<(String, Value)>,
    auto_run: bool,
}

impl MappingRule {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn match_mode(&self) -> MatchMode {
        match self.matcher {
            Matcher::Exact(_) => MatchMode::Exact,
            Matcher::Pattern(_) => MatchMode::Pattern,
        }
    }

    pub fn ordinal_index(&self) -> Option<usize> {
        self.ordinal_index
    }

    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn chain(&self) -> &EntityChain {
        &self.chain
    }

    pub fn json_entries(&self) -> &[(String, Value)] {
        &self.json_entries
    }

    pub fn auto_run(&self) -> bool {
        self.auto_run
    }

    /// Whether a series description satisfies this rule's match mode
    pub fn matches(&self, description: &str) -> bool {
        match &self.matcher {
            Matcher::Exact(search) => description == search,
            Matcher::Pattern(re) => re.is_match(description),
        }
    }

    /// fmap outputs whose echoes are renamed after conversion
    pub fn is_auto_fieldmap(&self) -> bool {
        self.datatype == "fmap" && self.suffix == "auto"
    }

    pub fn is_diffusion(&self) -> bool {
        self.datatype == "dwi"
    }
}

/// Index of a rule in its [`RuleSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

/// Rules in declaration order, validated against one grammar
#[derive(Debug, Clone)]
pub struct RuleSet {
    grammar: Grammar,
    autosession: bool,
    rules: Vec<MappingRule>,
}

impl RuleSet {
    /// Creates an empty set
    ///
    /// With `autosession`, every rule without an explicit `ses` entity gets
    /// a deferred session placeholder.
    pub fn new(grammar: Grammar, autosession: bool) -> Self {
        Self {
            grammar,
            autosession,
            rules: Vec::new(),
        }
    }

    /// Validates a declaration and appends it
    ///
    /// # Errors
    ///
    /// - [`BidscatError::UnknownDatatype`] / [`BidscatError::UnknownSuffix`]
    ///   for a combination outside the grammar, unless `nonstandard`
    /// - [`BidscatError::UnknownEntity`] for a custom entity key, unless
    ///   `nonstandard`
    /// - [`BidscatError::InvalidOrdinal`] for an ordinal index of 0
    /// - [`BidscatError::InvalidPattern`] for a search pattern that is not a
    ///   valid regex in pattern mode
    pub fn add_rule(&mut self, spec: RuleSpec) -> Result<RuleId> {
        if !spec.nonstandard {
            self.grammar.validate(&spec.datatype, &spec.suffix)?;
        }

        if spec.ordinal_index == Some(0) {
            return Err(BidscatError::InvalidOrdinal(0));
        }

        let mut chain = EntityChain::from_pairs(spec.chain, spec.nonstandard)?;
        if self.autosession && chain.defer_if_absent(EntityKey::Ses, Placeholder::Session) {
            log::debug!("Injected session placeholder into rule {}", spec.description);
        }
        let auto_run = spec.auto_run && chain.defer_if_absent(EntityKey::Run, Placeholder::Run);
        if spec.auto_run && !auto_run {
            log::warn!(
                "Rule {} declares an explicit run; automatic run numbering disabled",
                spec.description
            );
        }

        let search = spec.search.unwrap_or_else(|| spec.description.clone());
        let matcher = if spec.strict_match {
            Matcher::Exact(search.clone())
        } else {
            Matcher::Pattern(Regex::new(&search)?)
        };

        let json_entries = spec.json_entries;

        self.rules.push(MappingRule {
            description: spec.description,
            search,
            matcher,
            ordinal_index: spec.ordinal_index,
            datatype: spec.datatype,
            suffix: spec.suffix,
            chain,
            json_entries,
            auto_run,
        });
        Ok(RuleId(self.rules.len() - 1))
    }

    pub fn get(&self, id: RuleId) -> Option<&MappingRule> {
        self.rules.get(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn autosession(&self) -> bool {
        self.autosession
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityValue;

    #[test]
    fn test_all_grammar_pairs_construct() {
        let grammar = Grammar::bids();
        let pairs: Vec<(String, String)> = grammar
            .pairs()
            .map(|(d, s)| (d.to_string(), s.to_string()))
            .collect();
        let mut rules = RuleSet::new(grammar, false);
        for (datatype, suffix) in &pairs {
            assert!(rules
                .add_rule(RuleSpec::new(suffix.as_str(), datatype.as_str(), suffix.as_str()))
                .is_ok());
        }
        assert_eq!(rules.len(), pairs.len());
    }

    #[test]
    fn test_invalid_pair_fails_unless_nonstandard() {
        let mut rules = RuleSet::new(Grammar::bids(), false);
        let err = rules
            .add_rule(RuleSpec::new("t1", "anat", "bold"))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(rules.is_empty());

        assert!(rules
            .add_rule(RuleSpec::new("t1", "anat", "bold").nonstandard(true))
            .is_ok());
        assert!(rules
            .add_rule(RuleSpec::new("pet", "pet", "pet").nonstandard(true))
            .is_ok());
    }

    #[test]
    fn test_search_defaults_to_description() {
        let mut rules = RuleSet::new(Grammar::bids(), false);
        let id = rules.add_rule(RuleSpec::new("T1_MPRAGE", "anat", "T1w")).unwrap();
        let rule = rules.get(id).unwrap();
        assert_eq!(rule.search(), "T1_MPRAGE");
        assert_eq!(rule.match_mode(), MatchMode::Exact);
        assert!(rule.matches("T1_MPRAGE"));
        assert!(!rule.matches("T1_MPRAGE_ND"));
    }

    #[test]
    fn test_exact_mode_treats_search_literally() {
        let mut rules = RuleSet::new(Grammar::bids(), false);
        let id = rules
            .add_rule(RuleSpec::new("t1", "anat", "T1w").search("T1w(1mm)"))
            .unwrap();
        assert!(rules.get(id).unwrap().matches("T1w(1mm)"));
    }

    #[test]
    fn test_pattern_mode_searches_substring() {
        let mut rules = RuleSet::new(Grammar::bids(), false);
        let id = rules
            .add_rule(
                RuleSpec::new("rest", "func", "bold")
                    .search("rest_[0-9]+")
                    .strict_match(false),
            )
            .unwrap();
        let rule = rules.get(id).unwrap();
        assert!(rule.matches("fMRI_rest_2_mb"));
        assert!(!rule.matches("fMRI_rest"));
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let mut rules = RuleSet::new(Grammar::bids(), false);
        let err = rules
            .add_rule(RuleSpec::new("rest", "func", "bold").search("rest(").strict_match(false))
            .unwrap_err();
        assert!(matches!(err, BidscatError::InvalidPattern(_)));
    }

    #[test]
    fn test_zero_ordinal_rejected() {
        let mut rules = RuleSet::new(Grammar::bids(), false);
        let err = rules
            .add_rule(RuleSpec::new("loc", "anat", "T1w").ordinal_index(0))
            .unwrap_err();
        assert!(matches!(err, BidscatError::InvalidOrdinal(0)));
    }

    #[test]
    fn test_autosession_injects_placeholder() {
        let mut rules = RuleSet::new(Grammar::bids(), true);
        let implicit = rules.add_rule(RuleSpec::new("rest", "func", "bold")).unwrap();
        let explicit = rules
            .add_rule(RuleSpec::new("t1", "anat", "T1w").with_entity("ses", "pre"))
            .unwrap();

        assert_eq!(
            rules.get(implicit).unwrap().chain().get(EntityKey::Ses),
            Some(&EntityValue::Deferred(Placeholder::Session))
        );
        assert_eq!(
            rules.get(explicit).unwrap().chain().get(EntityKey::Ses),
            Some(&EntityValue::literal("pre"))
        );
    }

    #[test]
    fn test_custom_entity_needs_nonstandard() {
        let mut rules = RuleSet::new(Grammar::bids(), false);
        assert!(matches!(
            rules.add_rule(RuleSpec::new("rest", "func", "bold").with_entity("flip", "2")),
            Err(BidscatError::UnknownEntity(_))
        ));
        assert!(rules
            .add_rule(
                RuleSpec::new("rest", "func", "bold")
                    .with_entity("flip", "2")
                    .nonstandard(true)
            )
            .is_ok());
    }

    #[test]
    fn test_auto_run_respects_explicit_run() {
        let mut rules = RuleSet::new(Grammar::bids(), false);
        let auto = rules
            .add_rule(RuleSpec::new("rest", "func", "bold").auto_run(true))
            .unwrap();
        let fixed = rules
            .add_rule(
                RuleSpec::new("rest2", "func", "bold")
                    .with_entity("run", "03")
                    .auto_run(true),
            )
            .unwrap();
        assert!(rules.get(auto).unwrap().auto_run());
        assert!(!rules.get(fixed).unwrap().auto_run());
    }
}
