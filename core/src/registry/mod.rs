//! Series Registry
//!
//! Scans an input tree into [`SeriesRecord`]s and optionally numbers each
//! subject's studies as sessions.

mod record;
mod scan;
mod session;

pub use record::SeriesRecord;
pub use scan::{find_leaf_dirs, scan, ScanMode, ScanOutcome};
pub use session::assign_sessions;
