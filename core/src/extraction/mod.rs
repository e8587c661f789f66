pub mod header;
pub mod path;
pub mod tags;

pub use header::SeriesHeader;
pub use path::{
    parse_series_dir, parse_study_dir, sanitize_subject, series_number, study_date, subject_name,
    SeriesDirName, StudyDirName,
};
