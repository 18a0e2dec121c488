use serde_json::{json, Value};

use crate::ipc::helpers::{parse_field, required_str, respond, session_mut, HandlerErr, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::status::GradingAction;
use crate::submission::{AssignmentSettings, Submission};

fn parse_submission(params: &Value) -> Result<Submission, HandlerErr> {
    let submission: Submission = parse_field(params, "submission")?;
    submission.validate()?;
    Ok(submission)
}

fn parse_settings(params: &Value) -> Result<AssignmentSettings, HandlerErr> {
    match params.get("settings") {
        None | Some(Value::Null) => Ok(AssignmentSettings::default()),
        Some(_) => parse_field(params, "settings"),
    }
}

fn handle_score(state: &mut AppState, req: &Request) -> HandlerResult {
    let mut submission = parse_submission(&req.params)?;
    let settings = parse_settings(&req.params)?;
    let (_, gradebook) = session_mut(state, &req.params)?;

    let breakdown = submission.apply_score(gradebook, &settings)?;
    Ok(json!({
        "submission": submission,
        "breakdown": breakdown,
    }))
}

fn handle_transition(_state: &mut AppState, req: &Request) -> HandlerResult {
    let mut submission = parse_submission(&req.params)?;
    let settings = parse_settings(&req.params)?;
    let name = required_str(&req.params, "action")?;
    let confirmed = req
        .params
        .get("confirmed")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let Some(action) = GradingAction::parse(name, confirmed) else {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("unknown grading action: {name}"),
            details: Some(json!({ "action": name })),
        });
    };

    submission.apply(action, settings.autograde_type)?;
    Ok(json!({ "submission": submission }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "submission.score" => handle_score(state, req),
        "submission.transition" => handle_transition(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
