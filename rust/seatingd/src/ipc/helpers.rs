use crate::ipc::error::err;
use crate::ipc::types::{Request, SidecarState};
use crate::model::{AppState, Classroom, TimeMode};
use crate::store::Store;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn bad_params(message: impl Into<String>) -> HandlerErr {
    HandlerErr::new("bad_params", message)
}

pub fn require_store(state: &SidecarState) -> Result<&Store, HandlerErr> {
    state
        .store
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// Required, non-blank string parameter (trimmed).
pub fn str_param(req: &Request, key: &str) -> Result<String, HandlerErr> {
    match req.params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(bad_params(format!("missing {key}"))),
    }
}

pub fn opt_str_param<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

pub fn index_param(req: &Request, key: &str) -> Result<usize, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| bad_params(format!("missing or invalid {key}")))
}

/// `timeMode` from params, or the active time mode when omitted.
pub fn time_mode_param(state: &SidecarState, req: &Request) -> Result<TimeMode, HandlerErr> {
    match req.params.get("timeMode") {
        None | Some(serde_json::Value::Null) => Ok(state.app.active_time_mode),
        Some(v) => v
            .as_str()
            .and_then(TimeMode::parse)
            .ok_or_else(|| bad_params("timeMode must be \"weekday\" or \"weekend\"")),
    }
}

pub fn classroom<'a>(state: &'a SidecarState, req: &Request) -> Result<&'a Classroom, HandlerErr> {
    let class_id = str_param(req, "classId")?;
    state.app.find_classroom(&class_id).ok_or_else(|| {
        HandlerErr::new("not_found", "class not found")
            .with_details(serde_json::json!({ "classId": class_id }))
    })
}

/// Installs `next` and persists it. A failed save is logged, not reported.
pub fn commit(state: &mut SidecarState, next: AppState) {
    state.app = next;
    if let Some(store) = state.store.as_ref() {
        if let Err(e) = store.save_state(&state.app) {
            tracing::warn!(error = %format!("{e:#}"), "failed to persist state");
        }
    }
}

pub fn commit_classroom(state: &mut SidecarState, classroom: Classroom) {
    let next = state.app.upsert_classroom(classroom);
    commit(state, next);
}
