use gradebookd::status::TransitionError;
use gradebookd::{
    AutoStatus, GradingAction, GradingError, GradingMode, ManualStatus, Submission,
};
use serde_json::json;

fn submission(auto: &str, manual: &str, feedback: bool) -> Submission {
    serde_json::from_value(json!({
        "id": 12,
        "username": "grace",
        "submitted_at": "2024-05-10T20:00:00Z",
        "auto_status": auto,
        "manual_status": manual,
        "feedback_available": feedback,
        "score": 0.0,
        "score_scaling": 1.0
    }))
    .expect("parse submission")
}

#[test]
fn feedback_before_autograde_fails_in_full_auto_mode() {
    let mut s = submission("not_graded", "not_graded", false);
    let err = s
        .apply(GradingAction::GenerateFeedback, GradingMode::FullAuto)
        .unwrap_err();
    assert_eq!(err.code(), "feedback_precondition_failed");
    assert!(!s.feedback_available);
}

#[test]
fn full_auto_ignores_manual_grading_for_feedback() {
    let mut s = submission("grading_failed", "manually_graded", false);
    assert!(matches!(
        s.apply(GradingAction::GenerateFeedback, GradingMode::FullAuto),
        Err(GradingError::Transition(
            TransitionError::FeedbackPrecondition { .. }
        ))
    ));
    assert!(!s.feedback_available);

    s.apply(GradingAction::GenerateFeedback, GradingMode::Auto)
        .expect("manual grade is enough outside full_auto");
    assert!(s.feedback_available);
}

#[test]
fn unassisted_feedback_needs_finished_manual_grading() {
    let mut s = submission("not_graded", "being_edited", false);
    assert!(s
        .apply(GradingAction::GenerateFeedback, GradingMode::Unassisted)
        .is_err());
    s.apply(
        GradingAction::FinishManualGrade { confirmed: true },
        GradingMode::Unassisted,
    )
    .unwrap();
    s.apply(GradingAction::GenerateFeedback, GradingMode::Unassisted)
        .unwrap();
    assert!(s.feedback_available);
}

#[test]
fn feedback_generation_is_idempotent() {
    let mut s = submission("automatically_graded", "not_graded", false);
    s.apply(GradingAction::GenerateFeedback, GradingMode::FullAuto)
        .unwrap();
    let once = s.clone();
    s.apply(GradingAction::GenerateFeedback, GradingMode::FullAuto)
        .unwrap();
    assert_eq!(s, once);
    assert!(s.feedback_available);
}

#[test]
fn full_lifecycle_autograde_manual_feedback() {
    let mut s = submission("not_graded", "not_graded", false);
    let mode = GradingMode::Auto;
    s.apply(GradingAction::StartAutograde, mode).unwrap();
    assert_eq!(s.auto_status, AutoStatus::Pending);
    s.apply(GradingAction::AutogradeSucceeded, mode).unwrap();
    assert_eq!(s.auto_status, AutoStatus::AutomaticallyGraded);
    s.apply(GradingAction::BeginManualEdit, mode).unwrap();
    assert_eq!(s.manual_status, ManualStatus::BeingEdited);
    s.apply(GradingAction::FinishManualGrade { confirmed: true }, mode)
        .unwrap();
    assert_eq!(s.manual_status, ManualStatus::ManuallyGraded);
    s.apply(GradingAction::GenerateFeedback, mode).unwrap();
    assert!(s.feedback_available);

    // Reopening the grade makes the generated feedback stale.
    s.apply(GradingAction::BeginManualEdit, mode).unwrap();
    assert_eq!(s.manual_status, ManualStatus::BeingEdited);
    assert!(!s.feedback_available);
}

#[test]
fn restarting_autograde_clears_feedback() {
    let mut s = submission("automatically_graded", "not_graded", true);
    s.apply(GradingAction::StartAutograde, GradingMode::FullAuto)
        .unwrap();
    assert_eq!(s.auto_status, AutoStatus::Pending);
    assert!(!s.feedback_available);
    assert!(s
        .apply(GradingAction::GenerateFeedback, GradingMode::FullAuto)
        .is_err());
}

#[test]
fn autograde_result_without_a_run_is_illegal() {
    let mut s = submission("not_graded", "not_graded", false);
    let err = s
        .apply(GradingAction::AutogradeSucceeded, GradingMode::Auto)
        .unwrap_err();
    assert_eq!(err.code(), "illegal_transition");
    assert_eq!(s.auto_status, AutoStatus::NotGraded);
}

#[test]
fn finish_manual_grade_twice_is_illegal() {
    let mut s = submission("automatically_graded", "manually_graded", false);
    let err = s
        .apply(
            GradingAction::FinishManualGrade { confirmed: true },
            GradingMode::Auto,
        )
        .unwrap_err();
    assert_eq!(err.code(), "illegal_transition");
}

#[test]
fn impossible_records_are_rejected_on_validate() {
    let s = submission("not_graded", "not_graded", true);
    assert_eq!(s.validate().unwrap_err().code(), "inconsistent_status");
    let s = submission("automatically_graded", "not_graded", true);
    assert!(s.validate().is_ok());
}

#[test]
fn manual_feedback_survives_a_pending_autograde_rerun() {
    let mut s = submission("automatically_graded", "manually_graded", false);
    s.apply(GradingAction::StartAutograde, GradingMode::Auto)
        .unwrap();
    s.apply(GradingAction::GenerateFeedback, GradingMode::Auto)
        .unwrap();
    assert_eq!(s.auto_status, AutoStatus::Pending);
    assert!(s.feedback_available);
    s.validate().expect("record produced by legal transitions");

    let reloaded: Submission =
        serde_json::from_value(serde_json::to_value(&s).unwrap()).unwrap();
    reloaded.validate().unwrap();
    s.apply(GradingAction::AutogradeFailed, GradingMode::Auto)
        .unwrap();
    assert_eq!(s.auto_status, AutoStatus::GradingFailed);
    assert!(s.validate().is_ok());
}

#[test]
fn feedback_without_finished_grading_is_inconsistent() {
    for (auto, manual) in [
        ("grading_failed", "not_graded"),
        ("not_graded", "being_edited"),
        ("pending", "being_edited"),
    ] {
        let s = submission(auto, manual, true);
        assert_eq!(
            s.validate().unwrap_err().code(),
            "inconsistent_status",
            "{auto}/{manual}"
        );
    }
}
