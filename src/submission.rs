//! Submission records and final score composition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::GradingError;
use crate::gradebook::GradeBook;
use crate::late::{LatePolicy, PenaltyDecision};
use crate::status::{AutoStatus, GradingAction, GradingMode, GradingStatus, ManualStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub username: String,
    #[serde(with = "crate::duration::timestamp")]
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub auto_status: AutoStatus,
    #[serde(default)]
    pub manual_status: ManualStatus,
    #[serde(default)]
    pub feedback_available: bool,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub score: f64,
    #[serde(default = "default_scaling")]
    pub score_scaling: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_scaling() -> f64 {
    1.0
}

// Ungraded submissions come back from the service with `score: null`.
fn null_as_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(0.0))
}

fn null_as_strict<'de, D: Deserializer<'de>>(d: D) -> Result<LatePolicy, D::Error> {
    Ok(Option::<LatePolicy>::deserialize(d)?.unwrap_or_else(LatePolicy::strict))
}

/// Assignment settings the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSettings {
    #[serde(default, with = "crate::duration::timestamp::option")]
    pub due_date: Option<DateTime<Utc>>,
    /// `null` and a missing key both mean no grace periods.
    #[serde(default, deserialize_with = "null_as_strict")]
    pub late_submission: LatePolicy,
    #[serde(default)]
    pub autograde_type: GradingMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub points: f64,
    pub max_points: f64,
    pub extra_credits: f64,
    pub scaling: f64,
    pub score: f64,
}

/// Scale the base points, cap them at the maximum, then add extra credit
/// unscaled.
pub fn compose_score(points: f64, max_points: f64, scaling: f64, extra_credits: f64) -> f64 {
    (points * scaling).min(max_points) + extra_credits
}

impl Submission {
    pub fn status(&self) -> GradingStatus {
        GradingStatus {
            auto_status: self.auto_status,
            manual_status: self.manual_status,
            feedback_available: self.feedback_available,
        }
    }

    fn set_status(&mut self, status: GradingStatus) {
        self.auto_status = status.auto_status;
        self.manual_status = status.manual_status;
        self.feedback_available = status.feedback_available;
    }

    /// Reject records whose status combination cannot be reached, and
    /// scores or scalings that are not finite.
    pub fn validate(&self) -> Result<(), GradingError> {
        self.status().validate()?;
        if !self.score.is_finite() {
            return Err(GradingError::BadParams(format!(
                "submission {} has a non-finite score",
                self.id
            )));
        }
        if !(self.score_scaling.is_finite() && self.score_scaling > 0.0 && self.score_scaling <= 1.0)
        {
            return Err(GradingError::BadParams(format!(
                "submission {} has score_scaling {}; must be in (0, 1]",
                self.id, self.score_scaling
            )));
        }
        Ok(())
    }

    pub fn apply(&mut self, action: GradingAction, mode: GradingMode) -> Result<(), GradingError> {
        let next = self.status().apply(action, mode)?;
        tracing::debug!(
            submission_id = self.id,
            action = action.name(),
            auto_status = ?next.auto_status,
            manual_status = ?next.manual_status,
            feedback_available = next.feedback_available,
            "grading status changed"
        );
        self.set_status(next);
        Ok(())
    }

    pub fn penalty(&self, settings: &AssignmentSettings) -> PenaltyDecision {
        settings
            .late_submission
            .resolve(settings.due_date, self.submitted_at)
    }

    /// Recompute `score` and `score_scaling` from the gradebook and the
    /// assignment's late policy. A rejected late submission leaves the
    /// record untouched.
    pub fn apply_score(
        &mut self,
        gradebook: &mut GradeBook,
        settings: &AssignmentSettings,
    ) -> Result<ScoreBreakdown, GradingError> {
        let scaling = self.penalty(settings).into_scaling()?;
        let points = gradebook.points();
        let max_points = gradebook.max_points();
        let extra_credits = gradebook.extra_credits();
        let score = compose_score(points, max_points, scaling, extra_credits);

        self.score = score;
        self.score_scaling = scaling;
        tracing::info!(
            submission_id = self.id,
            points,
            max_points,
            extra_credits,
            scaling,
            score,
            "submission scored"
        );
        Ok(ScoreBreakdown {
            points,
            max_points,
            extra_credits,
            scaling,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn composition_caps_before_extra_credit() {
        assert_eq!(compose_score(8.0, 10.0, 0.5, 1.0), 5.0);
        assert_eq!(compose_score(12.0, 10.0, 1.0, 2.0), 12.0);
        assert_eq!(compose_score(0.0, 0.0, 1.0, 0.0), 0.0);
    }

    #[test]
    fn deserializes_with_defaults_and_keeps_unknown_fields() {
        let s: Submission = serde_json::from_value(json!({
            "id": 4,
            "username": "ada",
            "submitted_at": "2024-03-01T12:00:00",
            "assignid": 9
        }))
        .expect("parse submission");
        assert_eq!(s.auto_status, AutoStatus::NotGraded);
        assert_eq!(s.score_scaling, 1.0);
        assert!(s.validate().is_ok());
        let back = serde_json::to_value(&s).unwrap();
        assert_eq!(back["assignid"], 9);
        assert_eq!(back["auto_status"], "not_graded");
        assert_eq!(back["submitted_at"], "2024-03-01T12:00:00.000Z");
    }

    #[test]
    fn null_score_reads_as_zero() {
        let s: Submission = serde_json::from_value(json!({
            "id": 5,
            "username": "ada",
            "submitted_at": "2024-03-01T12:00:00Z",
            "score": null
        }))
        .expect("parse submission");
        assert_eq!(s.score, 0.0);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn settings_parse_backend_shape() {
        let settings: AssignmentSettings = serde_json::from_value(json!({
            "due_date": "2024-03-01T12:00:00Z",
            "late_submission": [{ "period": "P1D", "scaling": 0.5 }],
            "autograde_type": "full_auto"
        }))
        .expect("parse settings");
        assert!(settings.due_date.is_some());
        assert_eq!(settings.late_submission.periods().len(), 1);
        assert!(settings.autograde_type.requires_automatic_grading());

        let unset: AssignmentSettings = serde_json::from_value(json!({
            "due_date": "2024-03-01T12:00:00Z",
            "late_submission": null,
            "autograde_type": "auto"
        }))
        .expect("null late_submission");
        assert!(unset.late_submission.is_empty());

        let empty: AssignmentSettings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.due_date, None);
        assert!(empty.late_submission.is_empty());
        assert_eq!(empty.autograde_type, GradingMode::Auto);
    }
}
