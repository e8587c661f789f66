//! Dataset-level files kept next to the converted series

mod description;
mod fieldmap;
mod participants;

pub use description::{write_dataset_description, DatasetDescription, BIDS_VERSION, DATASET_DESCRIPTION};
pub use fieldmap::amend_phasediffs;
pub use participants::{append_participant, Participant, PARTICIPANTS_JSON, PARTICIPANTS_TSV};
