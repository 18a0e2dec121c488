//! Grading status of a submission.
//!
//! Two independent axes (autograde and manual grading) plus the feedback flag.
//! Every change goes through `GradingStatus::apply`, which holds the
//! transition table; `validate` rejects a feedback flag that no sequence of
//! legal transitions can leave set.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoStatus {
    #[default]
    NotGraded,
    Pending,
    AutomaticallyGraded,
    GradingFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualStatus {
    #[default]
    NotGraded,
    BeingEdited,
    ManuallyGraded,
}

/// How an assignment is graded. Only `FullAuto` makes feedback depend on a
/// successful autograde run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingMode {
    Unassisted,
    #[default]
    Auto,
    FullAuto,
}

impl GradingMode {
    pub fn requires_automatic_grading(self) -> bool {
        matches!(self, GradingMode::FullAuto)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradingAction {
    StartAutograde,
    AutogradeSucceeded,
    AutogradeFailed,
    BeginManualEdit,
    FinishManualGrade { confirmed: bool },
    GenerateFeedback,
}

impl GradingAction {
    pub fn name(&self) -> &'static str {
        match self {
            GradingAction::StartAutograde => "start_autograde",
            GradingAction::AutogradeSucceeded => "autograde_succeeded",
            GradingAction::AutogradeFailed => "autograde_failed",
            GradingAction::BeginManualEdit => "begin_manual_edit",
            GradingAction::FinishManualGrade { .. } => "finish_manual_grade",
            GradingAction::GenerateFeedback => "generate_feedback",
        }
    }

    pub fn parse(name: &str, confirmed: bool) -> Option<Self> {
        match name {
            "start_autograde" => Some(GradingAction::StartAutograde),
            "autograde_succeeded" => Some(GradingAction::AutogradeSucceeded),
            "autograde_failed" => Some(GradingAction::AutogradeFailed),
            "begin_manual_edit" => Some(GradingAction::BeginManualEdit),
            "finish_manual_grade" => Some(GradingAction::FinishManualGrade { confirmed }),
            "generate_feedback" => Some(GradingAction::GenerateFeedback),
            _ => None,
        }
    }
}

impl fmt::Display for GradingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} while auto_status is {from:?}")]
    IllegalAutoTransition { from: AutoStatus, action: GradingAction },
    #[error("cannot {action} while manual_status is {from:?}")]
    IllegalManualTransition {
        from: ManualStatus,
        action: GradingAction,
    },
    #[error("finishing manual grading requires explicit confirmation")]
    FinishNotConfirmed,
    #[error(
        "feedback needs a finished grading: auto_status is {auto_status:?}, manual_status is {manual_status:?} ({mode:?} grading)"
    )]
    FeedbackPrecondition {
        auto_status: AutoStatus,
        manual_status: ManualStatus,
        mode: GradingMode,
    },
    #[error("inconsistent grading status: {0}")]
    Inconsistent(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GradingStatus {
    pub auto_status: AutoStatus,
    pub manual_status: ManualStatus,
    #[serde(default)]
    pub feedback_available: bool,
}

impl GradingStatus {
    pub fn feedback_allowed(&self, mode: GradingMode) -> bool {
        self.auto_status == AutoStatus::AutomaticallyGraded
            || (!mode.requires_automatic_grading()
                && self.manual_status == ManualStatus::ManuallyGraded)
    }

    /// Feedback can only exist once some grading has finished: the autograde
    /// succeeded or a manual grade was confirmed. Every transition in `apply`
    /// keeps this true.
    pub fn validate(&self) -> Result<(), TransitionError> {
        if self.feedback_available
            && self.auto_status != AutoStatus::AutomaticallyGraded
            && self.manual_status != ManualStatus::ManuallyGraded
        {
            return Err(TransitionError::Inconsistent(
                "feedback is available but no grading has finished",
            ));
        }
        Ok(())
    }

    /// Return the status after `action`, or why it is not allowed.
    ///
    /// Restarting autograde or reopening a finished manual grade makes any
    /// generated feedback stale, so `feedback_available` drops back to false.
    pub fn apply(
        &self,
        action: GradingAction,
        mode: GradingMode,
    ) -> Result<GradingStatus, TransitionError> {
        let mut next = *self;
        match action {
            GradingAction::StartAutograde => {
                if self.auto_status == AutoStatus::Pending {
                    return Err(TransitionError::IllegalAutoTransition {
                        from: self.auto_status,
                        action,
                    });
                }
                next.auto_status = AutoStatus::Pending;
                next.feedback_available = false;
            }
            GradingAction::AutogradeSucceeded | GradingAction::AutogradeFailed => {
                if self.auto_status != AutoStatus::Pending {
                    return Err(TransitionError::IllegalAutoTransition {
                        from: self.auto_status,
                        action,
                    });
                }
                next.auto_status = if action == GradingAction::AutogradeSucceeded {
                    AutoStatus::AutomaticallyGraded
                } else {
                    AutoStatus::GradingFailed
                };
            }
            GradingAction::BeginManualEdit => {
                if self.manual_status == ManualStatus::ManuallyGraded {
                    next.feedback_available = false;
                }
                next.manual_status = ManualStatus::BeingEdited;
            }
            GradingAction::FinishManualGrade { confirmed } => {
                if self.manual_status == ManualStatus::ManuallyGraded {
                    return Err(TransitionError::IllegalManualTransition {
                        from: self.manual_status,
                        action,
                    });
                }
                if !confirmed {
                    return Err(TransitionError::FinishNotConfirmed);
                }
                next.manual_status = ManualStatus::ManuallyGraded;
            }
            GradingAction::GenerateFeedback => {
                if !self.feedback_allowed(mode) {
                    return Err(TransitionError::FeedbackPrecondition {
                        auto_status: self.auto_status,
                        manual_status: self.manual_status,
                        mode,
                    });
                }
                next.feedback_available = true;
            }
        }
        Ok(next)
    }
}
