pub mod submission;
pub mod export;

pub use submission::{ParticipantRequest, validate_submission};
pub use export::{read_roster_csv, write_roster_csv};
