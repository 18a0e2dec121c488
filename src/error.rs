use thiserror::Error;

use crate::duration::DurationError;
use crate::gradebook::GradeBookError;
use crate::late::{LatePolicyError, LateSubmissionRejected};
use crate::status::TransitionError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradingError {
    #[error(transparent)]
    GradeBook(#[from] GradeBookError),
    #[error(transparent)]
    Duration(#[from] DurationError),
    #[error("invalid late submission configuration: {0}")]
    LatePolicy(#[from] LatePolicyError),
    #[error(transparent)]
    LateRejected(#[from] LateSubmissionRejected),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{0}")]
    BadParams(String),
}

impl GradingError {
    /// Stable code reported in the sidecar's error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            GradingError::GradeBook(e) => match e {
                GradeBookError::UnknownNotebook { .. } => "unknown_notebook",
                GradeBookError::UninitializedGrade { .. } => "uninitialized_grade",
                GradeBookError::UninitializedComment { .. } => "uninitialized_comment",
                GradeBookError::InvalidScore { .. } => "bad_params",
                GradeBookError::MalformedDocument(_) => "malformed_properties",
            },
            GradingError::Duration(_) => "bad_params",
            GradingError::LatePolicy(_) => "invalid_late_policy",
            GradingError::LateRejected(_) => "late_submission_rejected",
            GradingError::Transition(e) => match e {
                TransitionError::FeedbackPrecondition { .. } => "feedback_precondition_failed",
                TransitionError::FinishNotConfirmed => "confirmation_required",
                TransitionError::Inconsistent(_) => "inconsistent_status",
                TransitionError::IllegalAutoTransition { .. }
                | TransitionError::IllegalManualTransition { .. } => "illegal_transition",
            },
            GradingError::BadParams(_) => "bad_params",
        }
    }
}
