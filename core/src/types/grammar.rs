use crate::error::{BidscatError, Result};
use std::collections::HashMap;

const DATATYPES: &[&str] = &[
    "anat", "func", "dwi", "fmap", "perf", "meg", "eeg", "ieeg", "beh",
];

const ANAT_SUFFIXES: &[&str] = &[
    "T1w",
    "T2w",
    "FLAIR",
    "T1rho",
    "T1map",
    "T2map",
    "T2starw",
    "T2starmap",
    "PDw",
    "PDmap",
    "PDT2",
    "inplaneT1",
    "inplaneT2",
    "angio",
    "defacemask",
];
const FMAP_SUFFIXES: &[&str] = &[
    "phasediff",
    "phase1",
    "phase2",
    "magnitude1",
    "magnitude2",
    "magnitude",
    "fieldmap",
    "epi",
    "auto",
];
const DWI_SUFFIXES: &[&str] = &["dwi", "bvec", "bval"];
const FUNC_SUFFIXES: &[&str] = &["bold", "cbv", "phase", "sbref", "events", "physio", "stim"];
const PERF_SUFFIXES: &[&str] = &["asl", "m0scan"];

/// Allowed datatypes and the suffixes each datatype accepts
///
/// Built once and handed to [`RuleSet`](crate::types::RuleSet) explicitly.
/// [`Grammar::bids`] is the standard table; tests and callers with local
/// conventions can extend it with [`Grammar::with_datatype`].
///
/// # Example
///
/// ```
/// use bidscat_core::Grammar;
///
/// let grammar = Grammar::bids();
/// assert!(grammar.validate("func", "bold").is_ok());
/// assert!(grammar.validate("func", "T1w").is_err());
/// assert!(grammar.validate("video", "bold").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    datatypes: Vec<String>,
    suffixes: HashMap<String, Vec<String>>,
}

impl Grammar {
    /// Grammar with no datatypes at all
    pub fn empty() -> Self {
        Self {
            datatypes: Vec::new(),
            suffixes: HashMap::new(),
        }
    }

    /// The standard BIDS datatype/suffix table
    pub fn bids() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("anat", ANAT_SUFFIXES),
            ("fmap", FMAP_SUFFIXES),
            ("dwi", DWI_SUFFIXES),
            ("func", FUNC_SUFFIXES),
            ("perf", PERF_SUFFIXES),
        ];

        let mut grammar = Self::empty();
        for datatype in DATATYPES {
            let suffixes = table
                .iter()
                .find(|(name, _)| name == datatype)
                .map(|(_, suffixes)| *suffixes)
                .unwrap_or(&[]);
            grammar = grammar.with_datatype(datatype, suffixes.iter().copied());
        }
        grammar
    }

    /// Builder: adds a datatype (or extends an existing one) with its suffixes
    pub fn with_datatype<I, S>(mut self, datatype: &str, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !self.is_datatype(datatype) {
            self.datatypes.push(datatype.to_string());
        }
        let entry = self.suffixes.entry(datatype.to_string()).or_default();
        for suffix in suffixes {
            let suffix = suffix.into();
            if !entry.contains(&suffix) {
                entry.push(suffix);
            }
        }
        self
    }

    pub fn datatypes(&self) -> &[String] {
        &self.datatypes
    }

    pub fn is_datatype(&self, datatype: &str) -> bool {
        self.datatypes.iter().any(|d| d == datatype)
    }

    /// Suffixes allowed for a datatype (empty for unknown datatypes)
    pub fn suffixes(&self, datatype: &str) -> &[String] {
        self.suffixes
            .get(datatype)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Checks a datatype/suffix combination
    ///
    /// # Errors
    ///
    /// [`BidscatError::UnknownDatatype`] or [`BidscatError::UnknownSuffix`]
    pub fn validate(&self, datatype: &str, suffix: &str) -> Result<()> {
        if !self.is_datatype(datatype) {
            return Err(BidscatError::UnknownDatatype(datatype.to_string()));
        }

        let allowed = self.suffixes(datatype);
        if !allowed.iter().any(|s| s == suffix) {
            return Err(BidscatError::UnknownSuffix {
                suffix: suffix.to_string(),
                datatype: datatype.to_string(),
                allowed: allowed.to_vec(),
            });
        }
        Ok(())
    }

    /// Every valid (datatype, suffix) pair
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.datatypes.iter().flat_map(move |datatype| {
            self.suffixes(datatype)
                .iter()
                .map(move |suffix| (datatype.as_str(), suffix.as_str()))
        })
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::bids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_every_pair_validates() {
        let grammar = Grammar::bids();
        let pairs: Vec<_> = grammar.pairs().collect();
        assert_eq!(pairs.len(), 15 + 9 + 3 + 7 + 2);
        for (datatype, suffix) in pairs {
            assert!(grammar.validate(datatype, suffix).is_ok());
        }
    }

    #[test]
    fn test_cross_pairs_fail() {
        let grammar = Grammar::bids();
        for datatype in grammar.datatypes() {
            for (other, suffix) in grammar.pairs() {
                if other == datatype || grammar.suffixes(datatype).iter().any(|s| s == suffix) {
                    continue;
                }
                assert!(matches!(
                    grammar.validate(datatype, suffix),
                    Err(BidscatError::UnknownSuffix { .. })
                ));
            }
        }
    }

    #[rstest]
    #[case("anat", "T1w", true)]
    #[case("fmap", "auto", true)]
    #[case("perf", "asl", true)]
    #[case("dwi", "bold", false)]
    #[case("meg", "meg", false)]
    #[case("Anat", "T1w", false)]
    fn test_validate_cases(#[case] datatype: &str, #[case] suffix: &str, #[case] ok: bool) {
        assert_eq!(Grammar::bids().validate(datatype, suffix).is_ok(), ok);
    }

    #[test]
    fn test_unknown_datatype() {
        let err = Grammar::bids().validate("video", "bold").unwrap_err();
        assert!(matches!(err, BidscatError::UnknownDatatype(ref d) if d == "video"));
    }

    #[test]
    fn test_local_override() {
        let grammar = Grammar::empty().with_datatype("pet", ["pet", "blood"]);
        assert!(grammar.validate("pet", "blood").is_ok());
        assert!(grammar.validate("anat", "T1w").is_err());

        let extended = Grammar::bids().with_datatype("anat", ["MP2RAGE"]);
        assert!(extended.validate("anat", "MP2RAGE").is_ok());
        assert!(extended.validate("anat", "T1w").is_ok());
    }
}
