//! Matcher/Resolver
//!
//! Joins series records against mapping rules: match-mode filtering,
//! per-study ordinal selection, duplicate detection and the input root each
//! script's relative paths hang off.

mod policy;
mod resolver;

pub use policy::DuplicatePolicy;
pub use resolver::{
    common_ancestor, find_duplicates, format_run, resolve, resolve_all, MatchedSeries, Selection,
};
