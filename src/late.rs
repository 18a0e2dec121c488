//! Late-submission penalty resolution.
//!
//! An assignment carries an ordered list of grace periods, each a duration
//! past the deadline paired with the scaling applied to the raw score.
//! `LatePolicy::new` is the validating factory; `resolve_scaling` is the bare
//! stored-order walk and is used by the policy once validation has passed.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::duration::format_iso8601;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LateSubmissionPeriod {
    #[serde(with = "crate::duration::iso8601")]
    pub period: TimeDelta,
    pub scaling: f64,
}

impl LateSubmissionPeriod {
    pub fn new(period: TimeDelta, scaling: f64) -> Self {
        Self { period, scaling }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LatePolicyError {
    #[error("late submission period {index} must have a positive duration")]
    NonPositiveDuration { index: usize },
    #[error("late submission period {index} has scaling {scaling}; must be strictly between 0 and 1")]
    ScalingOutOfRange { index: usize, scaling: f64 },
    #[error("late submission period {index} must be longer than the period before it")]
    DurationsNotIncreasing { index: usize },
    #[error("late submission period {index} must scale lower than the period before it")]
    ScalingsNotDecreasing { index: usize },
}

impl LatePolicyError {
    pub fn index(&self) -> usize {
        match self {
            LatePolicyError::NonPositiveDuration { index }
            | LatePolicyError::ScalingOutOfRange { index, .. }
            | LatePolicyError::DurationsNotIncreasing { index }
            | LatePolicyError::ScalingsNotDecreasing { index } => *index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("submission is {} late, past every late submission period", format_iso8601(.lateness))]
pub struct LateSubmissionRejected {
    pub lateness: TimeDelta,
}

/// Outcome of placing a submission against its deadline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PenaltyDecision {
    /// Submitted before the deadline or inside the grace window before the
    /// first period starts.
    OnTime,
    Penalized { period_index: usize, scaling: f64 },
    Rejected { lateness: TimeDelta },
}

impl PenaltyDecision {
    /// Scaling to apply, or `None` when the submission is not acceptable.
    pub fn scaling(&self) -> Option<f64> {
        match self {
            PenaltyDecision::OnTime => Some(1.0),
            PenaltyDecision::Penalized { scaling, .. } => Some(*scaling),
            PenaltyDecision::Rejected { .. } => None,
        }
    }

    pub fn into_scaling(self) -> Result<f64, LateSubmissionRejected> {
        match self {
            PenaltyDecision::Rejected { lateness } => Err(LateSubmissionRejected { lateness }),
            other => Ok(other.scaling().unwrap_or(1.0)),
        }
    }
}

/// Walk `periods` in stored order.
///
/// A lateness at or before the deadline is on time. Past the deadline, a
/// lateness beyond every period is rejected, and otherwise the last period
/// whose duration has been reached applies, boundaries inclusive. On a list
/// that is not duration-ascending the result follows the same walk and is not
/// corrected.
pub fn resolve_scaling(
    periods: &[LateSubmissionPeriod],
    deadline: DateTime<Utc>,
    submitted_at: DateTime<Utc>,
) -> PenaltyDecision {
    let lateness = submitted_at - deadline;
    if lateness <= TimeDelta::zero() {
        return PenaltyDecision::OnTime;
    }
    if periods.iter().all(|p| lateness > p.period) {
        return PenaltyDecision::Rejected { lateness };
    }

    let mut decision = PenaltyDecision::OnTime;
    for (period_index, p) in periods.iter().enumerate() {
        if p.period <= lateness {
            decision = PenaltyDecision::Penalized {
                period_index,
                scaling: p.scaling,
            };
        }
    }
    decision
}

/// A late-submission configuration that passed validation: durations
/// strictly increasing and positive, scalings strictly decreasing inside
/// (0, 1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LateSubmissionPeriod>", into = "Vec<LateSubmissionPeriod>")]
pub struct LatePolicy {
    periods: Vec<LateSubmissionPeriod>,
}

impl LatePolicy {
    pub fn new(periods: Vec<LateSubmissionPeriod>) -> Result<Self, LatePolicyError> {
        for (index, p) in periods.iter().enumerate() {
            if p.period <= TimeDelta::zero() {
                return Err(LatePolicyError::NonPositiveDuration { index });
            }
            if !(p.scaling > 0.0 && p.scaling < 1.0) {
                return Err(LatePolicyError::ScalingOutOfRange {
                    index,
                    scaling: p.scaling,
                });
            }
            if index > 0 {
                let prev = &periods[index - 1];
                if p.period <= prev.period {
                    return Err(LatePolicyError::DurationsNotIncreasing { index });
                }
                if p.scaling >= prev.scaling {
                    return Err(LatePolicyError::ScalingsNotDecreasing { index });
                }
            }
        }
        Ok(Self { periods })
    }

    /// No grace periods: anything past the deadline is rejected.
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn periods(&self) -> &[LateSubmissionPeriod] {
        &self.periods
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    /// Without a deadline every submission is on time.
    pub fn resolve(
        &self,
        deadline: Option<DateTime<Utc>>,
        submitted_at: DateTime<Utc>,
    ) -> PenaltyDecision {
        match deadline {
            Some(deadline) => resolve_scaling(&self.periods, deadline, submitted_at),
            None => PenaltyDecision::OnTime,
        }
    }
}

impl TryFrom<Vec<LateSubmissionPeriod>> for LatePolicy {
    type Error = LatePolicyError;

    fn try_from(periods: Vec<LateSubmissionPeriod>) -> Result<Self, Self::Error> {
        LatePolicy::new(periods)
    }
}

impl From<LatePolicy> for Vec<LateSubmissionPeriod> {
    fn from(policy: LatePolicy) -> Self {
        policy.periods
    }
}
