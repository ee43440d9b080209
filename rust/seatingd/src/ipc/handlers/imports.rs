use crate::batch::import_batch;
use crate::ipc::handlers::respond;
use crate::ipc::helpers::{bad_params, commit, require_store, HandlerErr};
use crate::ipc::types::{Request, SidecarState};
use crate::legacy;
use crate::model::Classroom;
use serde_json::json;

fn summary(classrooms: &[Classroom]) -> Vec<serde_json::Value> {
    classrooms
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "studentCount": c.students.len()
            })
        })
        .collect()
}

fn handle_import_batch(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let Some(text) = req.params.get("text").and_then(|v| v.as_str()) else {
        return Err(bad_params("missing text"));
    };
    let result = import_batch(text);
    let errors: Vec<serde_json::Value> = result
        .errors
        .iter()
        .map(|e| json!({ "block": e.block(), "message": e.to_string() }))
        .collect();
    tracing::info!(
        imported = result.classrooms.len(),
        rejected = errors.len(),
        "batch import"
    );

    let classrooms = summary(&result.classrooms);
    let mut next = state.app.clone();
    for c in result.classrooms {
        next = next.upsert_classroom(c);
    }
    commit(state, next);
    Ok(json!({ "classrooms": classrooms, "errors": errors }))
}

/// `data` is the legacy export itself, either as an object or as JSON text.
fn handle_import_legacy(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let data = match req.params.get("data") {
        Some(serde_json::Value::String(text)) => serde_json::from_str::<serde_json::Value>(text)
            .map_err(|e| HandlerErr::new("import_failed", format!("data is not valid JSON: {e}")))?,
        Some(v) if v.is_object() => v.clone(),
        _ => return Err(bad_params("missing data")),
    };
    if !legacy::looks_like_legacy(&data) {
        return Err(HandlerErr::new(
            "import_failed",
            "data is not a class-keyed seating export",
        ));
    }

    let migrated = legacy::migrate_legacy(&data);
    let classrooms = summary(&migrated.classrooms);
    let mut next = state.app.clone();
    for c in migrated.classrooms {
        next = next.upsert_classroom(c);
    }
    commit(state, next);
    Ok(json!({ "classrooms": classrooms }))
}

pub fn try_handle(state: &mut SidecarState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "import.batch" => handle_import_batch(state, req),
        "import.legacy" => handle_import_legacy(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
