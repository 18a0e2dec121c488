//! Grading-state and scoring engine for nbgrader-style course management.
//!
//! * [`gradebook`]: per-cell scores aggregated into notebook and assignment
//!   totals over a submission's properties document.
//! * [`late`]: late-submission periods and the scaling they impose.
//! * [`status`] and [`submission`]: the grading status machine and final
//!   score composition.
//! * [`ipc`]: the line-delimited JSON sidecar protocol wrapping the above.

pub mod config;
pub mod duration;
pub mod error;
pub mod gradebook;
pub mod ipc;
pub mod late;
pub mod logging;
pub mod status;
pub mod submission;

pub use error::GradingError;
pub use gradebook::GradeBook;
pub use late::{LatePolicy, LateSubmissionPeriod, PenaltyDecision};
pub use status::{AutoStatus, GradingAction, GradingMode, GradingStatus, ManualStatus};
pub use submission::{AssignmentSettings, Submission};
