use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::duration::format_iso8601;
use crate::error::GradingError;
use crate::gradebook::GradeBook;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::late::LatePolicyError;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<GradingError> for HandlerErr {
    fn from(e: GradingError) -> Self {
        let details = match &e {
            GradingError::LatePolicy(inner) => Some(json!({ "index": inner.index() })),
            GradingError::LateRejected(inner) => {
                Some(json!({ "lateness": format_iso8601(&inner.lateness) }))
            }
            _ => None,
        };
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

impl From<crate::gradebook::GradeBookError> for HandlerErr {
    fn from(e: crate::gradebook::GradeBookError) -> Self {
        GradingError::from(e).into()
    }
}

impl From<LatePolicyError> for HandlerErr {
    fn from(e: LatePolicyError) -> Self {
        GradingError::from(e).into()
    }
}

pub type HandlerResult = Result<Value, HandlerErr>;

pub fn respond(req: &Request, result: HandlerResult) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => {
            tracing::debug!(
                request_id = %req.id,
                method = %req.method,
                code = e.code,
                "request failed: {}",
                e.message
            );
            e.response(&req.id)
        }
    }
}

pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {key}")))
}

pub fn required_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::bad_params(format!("{key} must be a number")))
}

/// The key must be present; `null` clears the value.
pub fn required_nullable_f64(params: &Value, key: &str) -> Result<Option<f64>, HandlerErr> {
    match params.get(key) {
        None => Err(HandlerErr::bad_params(format!("missing {key}"))),
        Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("{key} must be a number or null"))),
    }
}

pub fn required_bool(params: &Value, key: &str) -> Result<bool, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params(format!("{key} must be a boolean")))
}

pub fn parse_field<T: DeserializeOwned>(params: &Value, key: &str) -> Result<T, HandlerErr> {
    let Some(raw) = params.get(key) else {
        return Err(HandlerErr::bad_params(format!("missing {key}")));
    };
    serde_json::from_value(raw.clone()).map_err(|e| HandlerErr {
        code: "bad_params",
        message: format!("invalid {key}: {e}"),
        details: None,
    })
}

pub fn session_mut<'a>(
    state: &'a mut AppState,
    params: &Value,
) -> Result<(String, &'a mut GradeBook), HandlerErr> {
    let session_id = required_str(params, "sessionId")?.to_string();
    match state.sessions.get_mut(&session_id) {
        Some(gb) => Ok((session_id, gb)),
        None => Err(HandlerErr {
            code: "unknown_session",
            message: "gradebook session not found".to_string(),
            details: Some(json!({ "sessionId": session_id })),
        }),
    }
}
