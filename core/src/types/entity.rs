use crate::error::{BidscatError, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Entity keys of the output naming grammar
///
/// Declaration order is the canonical order in which keys appear in output
/// file names (`sub-01_ses-1_task-rest_run-01_bold`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Ses,
    Task,
    Acq,
    Ce,
    Rec,
    Dir,
    Run,
    Mod,
    Echo,
    Recording,
    Proc,
    Space,
}

impl EntityKey {
    /// All keys in canonical order
    pub const ALL: [EntityKey; 12] = [
        EntityKey::Ses,
        EntityKey::Task,
        EntityKey::Acq,
        EntityKey::Ce,
        EntityKey::Rec,
        EntityKey::Dir,
        EntityKey::Run,
        EntityKey::Mod,
        EntityKey::Echo,
        EntityKey::Recording,
        EntityKey::Proc,
        EntityKey::Space,
    ];

    /// Returns the key as written in file names
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKey::Ses => "ses",
            EntityKey::Task => "task",
            EntityKey::Acq => "acq",
            EntityKey::Ce => "ce",
            EntityKey::Rec => "rec",
            EntityKey::Dir => "dir",
            EntityKey::Run => "run",
            EntityKey::Mod => "mod",
            EntityKey::Echo => "echo",
            EntityKey::Recording => "recording",
            EntityKey::Proc => "proc",
            EntityKey::Space => "space",
        }
    }

    /// Parses a key name; `None` for keys outside the enumeration
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|key| key.as_str() == s)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value resolved per match rather than at rule declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Session,
    Run,
}

impl Placeholder {
    /// Shell variable the generated scripts define for this placeholder
    pub fn shell_var(&self) -> &'static str {
        match self {
            Placeholder::Session => "${session}",
            Placeholder::Run => "${run}",
        }
    }
}

/// Value of one entity in a chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityValue {
    Literal(String),
    Deferred(Placeholder),
}

impl EntityValue {
    pub fn literal(value: impl Into<String>) -> Self {
        EntityValue::Literal(value.into())
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityValue::Literal(value) => write!(f, "{}", value),
            EntityValue::Deferred(placeholder) => write!(f, "{}", placeholder.shell_var()),
        }
    }
}

/// Ordered key/value set encoded into output file names
///
/// Known keys are kept per [`EntityKey`] and always iterate in canonical
/// order. Custom keys (only accepted for nonstandard rules) follow in the
/// order they were added.
///
/// # Example
///
/// ```
/// use bidscat_core::{EntityChain, EntityKey};
///
/// let chain = EntityChain::new()
///     .with(EntityKey::Run, "01")
///     .with(EntityKey::Task, "rest");
///
/// let keys: Vec<_> = chain.iter().map(|(key, _)| key.to_string()).collect();
/// assert_eq!(keys, ["task", "run"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityChain {
    known: BTreeMap<EntityKey, EntityValue>,
    custom: Vec<(String, EntityValue)>,
}

impl EntityChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: sets a literal value for a known key
    pub fn with(mut self, key: EntityKey, value: impl Into<String>) -> Self {
        self.insert(key, EntityValue::literal(value));
        self
    }

    /// Builds a chain from string pairs
    ///
    /// Keys outside [`EntityKey`] are kept as custom keys when `allow_custom`
    /// is set and rejected otherwise.
    ///
    /// # Errors
    ///
    /// [`BidscatError::UnknownEntity`] for an unknown key with `allow_custom`
    /// unset.
    pub fn from_pairs<I, K, V>(pairs: I, allow_custom: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut chain = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            match EntityKey::parse(key) {
                Some(known) => chain.insert(known, EntityValue::literal(value)),
                None if allow_custom => chain.insert_custom(key, EntityValue::literal(value)),
                None => return Err(BidscatError::UnknownEntity(key.to_string())),
            }
        }
        Ok(chain)
    }

    pub fn insert(&mut self, key: EntityKey, value: EntityValue) {
        self.known.insert(key, value);
    }

    pub fn insert_custom(&mut self, key: impl Into<String>, value: EntityValue) {
        let key = key.into();
        match self.custom.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.custom.push((key, value)),
        }
    }

    /// Inserts a deferred value unless the key is already present
    ///
    /// Returns `true` when the placeholder was inserted.
    pub fn defer_if_absent(&mut self, key: EntityKey, placeholder: Placeholder) -> bool {
        if self.known.contains_key(&key) {
            return false;
        }
        self.known.insert(key, EntityValue::Deferred(placeholder));
        true
    }

    pub fn get(&self, key: EntityKey) -> Option<&EntityValue> {
        self.known.get(&key)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.known.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty() && self.custom.is_empty()
    }

    /// Iterates known keys in canonical order, then custom keys
    pub fn iter(&self) -> impl Iterator<Item = (ChainKey<'_>, &EntityValue)> {
        self.known
            .iter()
            .map(|(key, value)| (ChainKey::Known(*key), value))
            .chain(
                self.custom
                    .iter()
                    .map(|(key, value)| (ChainKey::Custom(key.as_str()), value)),
            )
    }
}

/// Key of an [`EntityChain`] entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKey<'a> {
    Known(EntityKey),
    Custom(&'a str),
}

impl fmt::Display for ChainKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKey::Known(key) => write!(f, "{}", key),
            ChainKey::Custom(key) => write!(f, "{}", key),
        }
    }
}

/// Per-match view of a rule's chain
///
/// Borrows the rule's chain and layers the values resolved for one matched
/// series on top of it. Deferred entries without a resolved value render as
/// their shell variable, which is what the script templates need.
#[derive(Debug, Clone)]
pub struct EntityOverlay<'a> {
    chain: &'a EntityChain,
    resolved: BTreeMap<EntityKey, String>,
}

impl<'a> EntityOverlay<'a> {
    pub fn new(chain: &'a EntityChain) -> Self {
        Self {
            chain,
            resolved: BTreeMap::new(),
        }
    }

    /// Builder: resolves a key for this match only
    pub fn with_value(mut self, key: EntityKey, value: impl Into<String>) -> Self {
        self.resolved.insert(key, value.into());
        self
    }

    /// Resolved value of a known key
    pub fn value(&self, key: EntityKey) -> Option<String> {
        if let Some(value) = self.resolved.get(&key) {
            // Only keys present in the chain take part in naming
            return self.chain.contains(key).then(|| value.clone());
        }
        self.chain.get(key).map(|value| value.to_string())
    }

    /// Resolved (key, value) pairs in naming order
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.chain
            .iter()
            .map(|(key, value)| {
                let rendered = match key {
                    ChainKey::Known(known) => self
                        .resolved
                        .get(&known)
                        .cloned()
                        .unwrap_or_else(|| value.to_string()),
                    ChainKey::Custom(_) => value.to_string(),
                };
                (key.to_string(), rendered)
            })
            .collect()
    }

    /// File name stem: `sub-<subject>_[<key>-<value>_]*<suffix>`
    pub fn file_stem(&self, subject: &str, suffix: &str) -> String {
        let mut stem = format!("sub-{}_", subject);
        for (key, value) in self.pairs() {
            stem.push_str(&format!("{}-{}_", key, value));
        }
        stem.push_str(suffix);
        stem
    }

    /// Output directory: `sub-<subject>[/ses-<session>]/<datatype>`
    pub fn output_dir(&self, subject: &str, datatype: &str) -> String {
        match self.value(EntityKey::Ses) {
            Some(session) => format!("sub-{}/ses-{}/{}", subject, session, datatype),
            None => format!("sub-{}/{}", subject, datatype),
        }
    }
}
