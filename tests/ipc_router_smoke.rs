
use serde_json::json;
use test_support::{request_err, request_ok, sample_properties, spawn_sidecar};

#[test]
fn health_reports_version_and_sessions() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(
        health.get("version").and_then(|v| v.as_str()),
        Some(env!("CARGO_PKG_VERSION"))
    );
    assert_eq!(health.get("openSessions").and_then(|v| v.as_u64()), Some(0));
}

#[test]
fn gradebook_session_round_trip() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "gradebook.open",
        json!({ "properties": sample_properties() }),
    );
    let session_id = opened
        .get("sessionId")
        .and_then(|v| v.as_str())
        .expect("sessionId")
        .to_string();
    let summary = opened.get("summary").expect("summary");
    assert_eq!(summary.get("points").and_then(|v| v.as_f64()), Some(2.0));
    assert_eq!(summary.get("maxPoints").and_then(|v| v.as_f64()), Some(10.0));
    assert_eq!(
        summary.get("needsManualGrading").and_then(|v| v.as_bool()),
        Some(true)
    );

    let cell = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "gradebook.cell.setManualScore",
        json!({ "sessionId": session_id, "notebook": "hw1", "cellId": "essay", "score": 1.5 }),
    );
    assert_eq!(cell.get("score").and_then(|v| v.as_f64()), Some(1.5));
    assert_eq!(cell.get("maxScore").and_then(|v| v.as_f64()), Some(2.0));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "gradebook.cell.setComment",
        json!({ "sessionId": session_id, "notebook": "hw1", "cellId": "essay", "comment": "good" }),
    );
    let cell = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "gradebook.cell.get",
        json!({ "sessionId": session_id, "notebook": "hw1", "cellId": "essay" }),
    );
    assert_eq!(cell.get("comment").and_then(|v| v.as_str()), Some("good"));

    let err = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "gradebook.cell.setExtraCredit",
        json!({ "sessionId": session_id, "notebook": "hw1", "cellId": "nope", "extraCredit": 1.0 }),
    );
    assert_eq!(
        err.get("code").and_then(|v| v.as_str()),
        Some("uninitialized_grade")
    );

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "gradebook.export",
        json!({ "sessionId": session_id }),
    );
    let props = exported.get("properties").expect("properties");
    assert_eq!(props.get("assignment_id").and_then(|v| v.as_i64()), Some(7));
    assert_eq!(
        props
            .pointer("/notebooks/hw1/grades_dict/essay/manual_score")
            .and_then(|v| v.as_f64()),
        Some(1.5)
    );

    let closed = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "gradebook.close",
        json!({ "sessionId": session_id }),
    );
    assert_eq!(closed.get("closed").and_then(|v| v.as_bool()), Some(true));

    let err = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "gradebook.summary",
        json!({ "sessionId": session_id }),
    );
    assert_eq!(err.get("code").and_then(|v| v.as_str()), Some("unknown_session"));
}

#[test]
fn submission_score_applies_late_scaling() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "gradebook.open",
        json!({ "properties": sample_properties() }),
    );
    let session_id = opened
        .get("sessionId")
        .and_then(|v| v.as_str())
        .expect("sessionId")
        .to_string();

    let scored = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "submission.score",
        json!({
            "sessionId": session_id,
            "submission": {
                "id": 3,
                "username": "kim",
                "submitted_at": "2024-05-11T13:00:00Z",
                "auto_status": "automatically_graded",
                "manual_status": "not_graded",
                "feedback_available": false,
                "score": 0,
                "score_scaling": 1.0
            },
            "settings": {
                "due_date": "2024-05-10T12:00:00Z",
                "late_submission": [{ "period": "P1D", "scaling": 0.5 }],
                "autograde_type": "auto"
            }
        }),
    );
    assert_eq!(
        scored.pointer("/breakdown/scaling").and_then(|v| v.as_f64()),
        Some(0.5)
    );
    assert_eq!(
        scored.pointer("/submission/score").and_then(|v| v.as_f64()),
        Some(1.0)
    );
    assert_eq!(
        scored
            .pointer("/submission/score_scaling")
            .and_then(|v| v.as_f64()),
        Some(0.5)
    );
}

#[test]
fn late_resolution_and_rejection() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let periods = json!([
        { "period": "P1D", "scaling": 0.5 },
        { "period": "P3D", "scaling": 0.25 }
    ]);

    let resolved = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "lateSubmission.resolve",
        json!({
            "periods": periods,
            "dueDate": "2024-05-10T12:00:00Z",
            "submittedAt": "2024-05-12T12:00:00Z"
        }),
    );
    assert_eq!(resolved.get("scaling").and_then(|v| v.as_f64()), Some(0.5));
    assert_eq!(resolved.get("late").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(resolved.get("periodIndex").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(resolved.get("lateness").and_then(|v| v.as_str()), Some("P2D"));

    let err = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "lateSubmission.resolve",
        json!({
            "periods": periods,
            "dueDate": "2024-05-10T12:00:00Z",
            "submittedAt": "2024-05-14T12:00:00Z"
        }),
    );
    assert_eq!(
        err.get("code").and_then(|v| v.as_str()),
        Some("late_submission_rejected")
    );
    assert_eq!(
        err.pointer("/details/lateness").and_then(|v| v.as_str()),
        Some("P4D")
    );

    let err = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "lateSubmission.validate",
        json!({ "periods": [
            { "period": "P3D", "scaling": 0.25 },
            { "period": "P1D", "scaling": 0.5 }
        ] }),
    );
    assert_eq!(
        err.get("code").and_then(|v| v.as_str()),
        Some("invalid_late_policy")
    );
    assert_eq!(err.pointer("/details/index").and_then(|v| v.as_u64()), Some(1));
}

#[test]
fn feedback_precondition_and_unknown_method() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let err = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "submission.transition",
        json!({
            "submission": {
                "id": 5,
                "username": "ola",
                "submitted_at": "2024-05-10T10:00:00Z",
                "auto_status": "not_graded",
                "manual_status": "not_graded",
                "feedback_available": false
            },
            "action": "generate_feedback",
            "settings": { "autograde_type": "full_auto" }
        }),
    );
    assert_eq!(
        err.get("code").and_then(|v| v.as_str()),
        Some("feedback_precondition_failed")
    );

    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "submission.transition",
        json!({
            "submission": {
                "id": 5,
                "username": "ola",
                "submitted_at": "2024-05-10T10:00:00Z",
                "auto_status": "not_graded",
                "manual_status": "not_graded"
            },
            "action": "start_autograde"
        }),
    );
    assert_eq!(
        moved.pointer("/submission/auto_status").and_then(|v| v.as_str()),
        Some("pending")
    );

    let err = request_err(&mut stdin, &mut reader, "3", "grades.teleport", json!({}));
    assert_eq!(err.get("code").and_then(|v| v.as_str()), Some("not_implemented"));
}

#[test]
fn transition_accepts_records_it_produced() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let settings = json!({ "due_date": null, "late_submission": null, "autograde_type": "auto" });
    let mut submission = json!({
        "id": 9,
        "username": "ivo",
        "submitted_at": "2024-05-10T10:00:00Z",
        "auto_status": "automatically_graded",
        "manual_status": "manually_graded",
        "feedback_available": false,
        "score": null
    });

    for (id, action) in [
        ("1", "start_autograde"),
        ("2", "generate_feedback"),
        ("3", "autograde_succeeded"),
    ] {
        let moved = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "submission.transition",
            json!({ "submission": submission, "action": action, "settings": settings }),
        );
        submission = moved.get("submission").cloned().expect("submission");
    }
    assert_eq!(
        submission.get("auto_status").and_then(|v| v.as_str()),
        Some("automatically_graded")
    );
    assert_eq!(
        submission.get("feedback_available").and_then(|v| v.as_bool()),
        Some(true)
    );
}
