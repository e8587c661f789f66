use std::path::PathBuf;
use thiserror::Error;

/// Result type for bidscat operations
pub type Result<T> = std::result::Result<T, BidscatError>;

/// Fatal error types for bidscat operations
///
/// Data-availability problems found while scanning or matching are not
/// errors; they are collected as [`Warning`](crate::report::Warning)s.
#[derive(Error, Debug)]
pub enum BidscatError {
    /// Datatype is not part of the naming grammar
    #[error("Unknown data type {0}")]
    UnknownDatatype(String),

    /// Suffix is not allowed for the datatype
    #[error("Unknown suffix {suffix} for data type {datatype}\nAllowed suffixes are {allowed:?}")]
    UnknownSuffix {
        suffix: String,
        datatype: String,
        allowed: Vec<String>,
    },

    /// Entity key outside the fixed enumeration on a standard rule
    #[error("Unknown entity key {0}")]
    UnknownEntity(String),

    /// Ordinal indices are 1-based
    #[error("Invalid ordinal index {0} (indices start at 1)")]
    InvalidOrdinal(usize),

    /// Search pattern failed to compile
    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Malformed rule configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input root does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// No leaf directory was recognized as an acquisition series
    #[error("No dicoms found under {0}")]
    NoSeriesFound(PathBuf),

    /// DICOM reading error
    #[error("DICOM error: {0}")]
    DicomError(String),

    /// Tag not found in DICOM file
    #[error("Tag not found: {0}")]
    TagNotFound(String),

    /// Invalid tag value
    #[error("Invalid tag value: {0}")]
    InvalidValue(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Convert dicom-object errors
impl From<dicom_object::ReadError> for BidscatError {
    fn from(e: dicom_object::ReadError) -> Self {
        BidscatError::DicomError(format!("{}", e))
    }
}

impl BidscatError {
    /// Whether the error comes from rule declaration rather than from data
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BidscatError::UnknownDatatype(_)
                | BidscatError::UnknownSuffix { .. }
                | BidscatError::UnknownEntity(_)
                | BidscatError::InvalidOrdinal(_)
                | BidscatError::InvalidPattern(_)
                | BidscatError::Config(_)
        )
    }
}
