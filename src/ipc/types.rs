use std::collections::HashMap;

use serde::Deserialize;

use crate::config::SidecarConfig;
use crate::gradebook::GradeBook;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Sidecar state. Each session is a private copy of one submission's
/// properties document; nothing is persisted.
pub struct AppState {
    pub config: SidecarConfig,
    pub sessions: HashMap<String, GradeBook>,
}

impl AppState {
    pub fn new(config: SidecarConfig) -> Self {
        Self {
            config,
            sessions: HashMap::new(),
        }
    }
}
