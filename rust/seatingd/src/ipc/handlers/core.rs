use crate::ipc::handlers::respond;
use crate::ipc::helpers::{bad_params, commit, require_store, str_param, HandlerErr};
use crate::ipc::types::{Request, SidecarState};
use crate::model::TimeMode;
use crate::store::Store;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Opens (or creates) the workspace store and loads its state.
pub fn open_workspace(state: &mut SidecarState, path: &Path) -> anyhow::Result<()> {
    let store = Store::open(path)?;
    let app = store.load_state()?;
    tracing::info!(
        workspace = %path.to_string_lossy(),
        classrooms = app.classrooms.len(),
        "workspace selected"
    );
    state.workspace = Some(path.to_path_buf());
    state.store = Some(store);
    state.app = app;
    Ok(())
}

fn handle_health(state: &mut SidecarState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
    }))
}

fn handle_workspace_select(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(str_param(req, "path")?);
    open_workspace(state, &path).map_err(|e| {
        HandlerErr::new("store_failed", format!("{e:#}"))
            .with_details(json!({ "path": path.to_string_lossy() }))
    })?;
    Ok(json!({
        "workspacePath": path.to_string_lossy(),
        "classroomCount": state.app.classrooms.len()
    }))
}

fn handle_state_get(state: &mut SidecarState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "state": state.app }))
}

fn handle_state_set_active(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let mut next = state.app.clone();
    if let Some(v) = req.params.get("timeMode").filter(|v| !v.is_null()) {
        let tm = v
            .as_str()
            .and_then(TimeMode::parse)
            .ok_or_else(|| bad_params("timeMode must be \"weekday\" or \"weekend\""))?;
        next = next.set_active_time_mode(tm);
    }
    if let Some(v) = req.params.get("classroomId").filter(|v| !v.is_null()) {
        let id = v.as_str().ok_or_else(|| bad_params("classroomId must be a string"))?;
        if next.find_classroom(id).is_none() {
            return Err(HandlerErr::new("not_found", "class not found")
                .with_details(json!({ "classId": id })));
        }
        next = next.set_active_classroom(id);
    }
    commit(state, next);
    Ok(json!({
        "activeClassroomId": state.app.active_classroom_id,
        "activeTimeMode": state.app.active_time_mode
    }))
}

pub fn try_handle(state: &mut SidecarState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        "state.get" => handle_state_get(state, req),
        "state.setActive" => handle_state_set_active(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
