use serde_json::{json, Value};
use uuid::Uuid;

use crate::gradebook::GradeBook;
use crate::ipc::helpers::{
    parse_field, required_bool, required_f64, required_nullable_f64, required_str, respond,
    session_mut, HandlerErr, HandlerResult,
};
use crate::ipc::types::{AppState, Request};

fn to_value<T: serde::Serialize>(v: &T) -> HandlerResult {
    serde_json::to_value(v).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })
}

fn handle_open(state: &mut AppState, req: &Request) -> HandlerResult {
    let raw: Value = parse_field(&req.params, "properties")?;
    if !raw.is_object() {
        return Err(HandlerErr::bad_params("properties must be an object"));
    }
    if state.sessions.len() >= state.config.max_sessions {
        return Err(HandlerErr {
            code: "too_many_sessions",
            message: "close a gradebook session before opening another".to_string(),
            details: Some(json!({ "maxSessions": state.config.max_sessions })),
        });
    }

    let mut gradebook = GradeBook::from_value(raw)?;
    let summary = gradebook.summary();
    let session_id = Uuid::new_v4().to_string();
    tracing::info!(
        session_id = %session_id,
        notebooks = summary.notebooks.len(),
        "gradebook session opened"
    );
    state.sessions.insert(session_id.clone(), gradebook);

    Ok(json!({
        "sessionId": session_id,
        "summary": to_value(&summary)?,
    }))
}

fn handle_summary(state: &mut AppState, req: &Request) -> HandlerResult {
    let (_, gradebook) = session_mut(state, &req.params)?;
    let summary = gradebook.summary();
    let grading_info = gradebook.grading_info();
    Ok(json!({
        "summary": to_value(&summary)?,
        "gradingInfo": grading_info,
    }))
}

fn handle_cell_get(state: &mut AppState, req: &Request) -> HandlerResult {
    let (_, gradebook) = session_mut(state, &req.params)?;
    let notebook = required_str(&req.params, "notebook")?;
    let cell_id = required_str(&req.params, "cellId")?;
    // Same order as the grading view: max points first so task cells exist.
    gradebook.notebook_max_points(notebook)?;
    to_value(&gradebook.cell(notebook, cell_id)?)
}

#[derive(Clone, Copy)]
enum CellEdit {
    ManualScore,
    ExtraCredit,
    Comment,
    NeedsManualGrading,
}

fn handle_cell_edit(state: &mut AppState, req: &Request, edit: CellEdit) -> HandlerResult {
    let params = &req.params;
    let (session_id, gradebook) = session_mut(state, params)?;
    let notebook = required_str(params, "notebook")?;
    let cell_id = required_str(params, "cellId")?;

    match edit {
        CellEdit::ManualScore => {
            gradebook.set_manual_score(notebook, cell_id, required_f64(params, "score")?)?
        }
        CellEdit::ExtraCredit => gradebook.set_extra_credit(
            notebook,
            cell_id,
            required_nullable_f64(params, "extraCredit")?,
        )?,
        CellEdit::Comment => {
            let comment = match params.get("comment") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Null) => None,
                _ => return Err(HandlerErr::bad_params("comment must be a string or null")),
            };
            gradebook.set_comment(notebook, cell_id, comment)?
        }
        CellEdit::NeedsManualGrading => gradebook.set_needs_manual_grading(
            notebook,
            cell_id,
            required_bool(params, "needsManualGrade")?,
        )?,
    }

    tracing::debug!(
        session_id = %session_id,
        notebook,
        cell_id,
        method = %req.method,
        "cell updated"
    );
    to_value(&gradebook.cell(notebook, cell_id)?)
}

fn handle_export(state: &mut AppState, req: &Request) -> HandlerResult {
    let (_, gradebook) = session_mut(state, &req.params)?;
    gradebook.ensure_initialized();
    Ok(json!({ "properties": to_value(gradebook.properties())? }))
}

fn handle_close(state: &mut AppState, req: &Request) -> HandlerResult {
    let session_id = required_str(&req.params, "sessionId")?;
    let closed = state.sessions.remove(session_id).is_some();
    if closed {
        tracing::info!(session_id, "gradebook session closed");
    }
    Ok(json!({ "closed": closed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "gradebook.open" => handle_open(state, req),
        "gradebook.summary" => handle_summary(state, req),
        "gradebook.cell.get" => handle_cell_get(state, req),
        "gradebook.cell.setManualScore" => handle_cell_edit(state, req, CellEdit::ManualScore),
        "gradebook.cell.setExtraCredit" => handle_cell_edit(state, req, CellEdit::ExtraCredit),
        "gradebook.cell.setComment" => handle_cell_edit(state, req, CellEdit::Comment),
        "gradebook.cell.setNeedsManualGrading" => {
            handle_cell_edit(state, req, CellEdit::NeedsManualGrading)
        }
        "gradebook.export" => handle_export(state, req),
        "gradebook.close" => handle_close(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
