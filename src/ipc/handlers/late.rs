use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::duration::{format_iso8601, parse_timestamp};
use crate::error::GradingError;
use crate::ipc::helpers::{parse_field, required_str, respond, HandlerErr, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::late::{LatePolicy, LateSubmissionPeriod, PenaltyDecision};

fn parse_policy(params: &Value) -> Result<LatePolicy, HandlerErr> {
    let periods: Vec<LateSubmissionPeriod> = match params.get("periods") {
        None | Some(Value::Null) => Vec::new(),
        Some(_) => parse_field(params, "periods")?,
    };
    Ok(LatePolicy::new(periods)?)
}

fn parse_time(params: &Value, key: &str) -> Result<DateTime<Utc>, HandlerErr> {
    let raw = required_str(params, key)?;
    parse_timestamp(raw).map_err(|e| HandlerErr::from(GradingError::from(e)))
}

fn handle_validate(_state: &mut AppState, req: &Request) -> HandlerResult {
    let policy = parse_policy(&req.params)?;
    Ok(json!({ "periods": policy.periods() }))
}

fn handle_resolve(_state: &mut AppState, req: &Request) -> HandlerResult {
    let policy = parse_policy(&req.params)?;
    let due_date = match req.params.get("dueDate") {
        None | Some(Value::Null) => None,
        Some(_) => Some(parse_time(&req.params, "dueDate")?),
    };
    let submitted_at = parse_time(&req.params, "submittedAt")?;
    let lateness = due_date.map(|d| submitted_at - d);

    let decision = policy.resolve(due_date, submitted_at);
    tracing::debug!(?decision, "late submission resolved");
    let period_index = match decision {
        PenaltyDecision::Penalized { period_index, .. } => Some(period_index),
        _ => None,
    };
    let scaling = decision.into_scaling().map_err(GradingError::from)?;
    Ok(json!({
        "scaling": scaling,
        "late": period_index.is_some(),
        "periodIndex": period_index,
        "lateness": lateness
            .filter(|l| *l > chrono::TimeDelta::zero())
            .map(|l| format_iso8601(&l)),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "lateSubmission.validate" => handle_validate(state, req),
        "lateSubmission.resolve" => handle_resolve(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
