pub mod types;
pub mod shuffle;
pub mod check;
pub mod generator;

pub use types::{AssignmentError, DrawMode};
pub use check::{check_assignments, cycle_count};
pub use generator::{AssignmentGenerator, DEFAULT_MAX_ATTEMPTS};
