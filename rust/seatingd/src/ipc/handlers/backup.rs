use crate::backup;
use crate::ipc::handlers::respond;
use crate::ipc::helpers::{bad_params, commit, require_store, str_param, HandlerErr};
use crate::ipc::types::{Request, SidecarState};
use serde_json::json;
use std::path::PathBuf;

fn handle_backup_export(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let out_path = str_param(req, "outPath")?;
    let out = PathBuf::from(&out_path);
    let export = match req.params.get("format").and_then(|v| v.as_str()).unwrap_or("bundle") {
        "bundle" => backup::export_state_bundle(&state.app, &out),
        "json" => backup::export_state_json(&state.app, &out),
        other => return Err(bad_params(format!("unknown format: {other}"))),
    }
    .map_err(|e| {
        HandlerErr::new("export_failed", format!("{e:#}")).with_details(json!({ "path": out_path }))
    })?;

    Ok(json!({
        "path": out_path,
        "format": export.format,
        "classroomCount": export.classroom_count,
        "stateSha256": export.state_sha256
    }))
}

fn handle_backup_import(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let in_path = str_param(req, "inPath")?;
    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return Err(HandlerErr::new("not_found", "backup file not found")
            .with_details(json!({ "path": in_path })));
    }

    let (imported, summary) = backup::import_state(&src).map_err(|e| {
        HandlerErr::new("import_failed", format!("{e:#}")).with_details(json!({ "path": in_path }))
    })?;
    commit(state, imported);
    Ok(json!({
        "path": in_path,
        "formatDetected": summary.format_detected,
        "classroomCount": summary.classroom_count
    }))
}

pub fn try_handle(state: &mut SidecarState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.export" => handle_backup_export(state, req),
        "backup.import" => handle_backup_import(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
