//! Core type definitions for the output naming grammar and mapping rules
//!
//! - [`Grammar`]: allowed datatypes and suffixes
//! - [`EntityKey`], [`EntityChain`]: the key/value chain encoded in file names
//! - [`EntityOverlay`]: per-match resolved values on top of a rule's chain
//! - [`RuleSpec`], [`MappingRule`], [`RuleSet`]: declared conversion targets

mod entity;
mod grammar;
mod rule;

pub use entity::{ChainKey, EntityChain, EntityKey, EntityOverlay, EntityValue, Placeholder};
pub use grammar::Grammar;
pub use rule::{MappingRule, MatchMode, RuleId, RuleSet, RuleSpec};
