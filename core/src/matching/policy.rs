use std::fmt;

/// What to do with several series of the same description in one study
///
/// Only applies to rules without an ordinal index; an ordinal index already
/// picks exactly one series per study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Convert every duplicate (and warn)
    #[default]
    ConvertAll,
    /// Keep the lowest series number of each duplicate group (and warn)
    FirstOnly,
    /// Drop duplicate groups entirely (and warn)
    Skip,
}

impl DuplicatePolicy {
    pub fn simple_name(&self) -> &'static str {
        match self {
            DuplicatePolicy::ConvertAll => "convert-all",
            DuplicatePolicy::FirstOnly => "first-only",
            DuplicatePolicy::Skip => "skip",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names() {
        let policy: DuplicatePolicy = serde_json::from_str("\"first-only\"").unwrap();
        assert_eq!(policy, DuplicatePolicy::FirstOnly);
        assert_eq!(
            serde_json::to_string(&DuplicatePolicy::ConvertAll).unwrap(),
            "\"convert-all\""
        );
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::ConvertAll);
    }
}
