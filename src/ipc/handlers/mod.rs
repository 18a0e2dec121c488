pub mod core;
pub mod gradebook;
pub mod late;
pub mod submission;
