use crate::classroom::{create_classroom, rename_classroom, update_classroom_info, ClassroomInfoPatch};
use crate::ipc::handlers::respond;
use crate::ipc::helpers::{bad_params, classroom, commit, commit_classroom, require_store, str_param, HandlerErr};
use crate::ipc::types::{Request, SidecarState};
use serde_json::json;

fn handle_classes_list(state: &mut SidecarState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let classes: Vec<serde_json::Value> = state
        .app
        .classrooms
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "studentCount": c.students.len(),
                "campus": c.campus,
                "building": c.building,
                "room": c.room,
                "updatedAt": c.updated_at
            })
        })
        .collect();
    Ok(json!({
        "classes": classes,
        "activeClassroomId": state.app.active_classroom_id
    }))
}

fn handle_classes_create(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let name = str_param(req, "name").map_err(|_| bad_params("name must not be empty"))?;
    let c = create_classroom(&name);
    let class_id = c.id.clone();
    commit_classroom(state, c);
    Ok(json!({ "classId": class_id, "name": name }))
}

fn handle_classes_delete(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let class_id = classroom(state, req)?.id.clone();
    let next = state.app.remove_classroom(&class_id);
    commit(state, next);
    Ok(json!({
        "classId": class_id,
        "activeClassroomId": state.app.active_classroom_id
    }))
}

fn patch_field(patch: &serde_json::Value, key: &str) -> Result<Option<String>, HandlerErr> {
    match patch.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(bad_params(format!("patch.{key} must be a string"))),
    }
}

fn handle_classes_update(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let Some(patch) = req.params.get("patch").filter(|p| p.is_object()) else {
        return Err(bad_params("missing patch"));
    };
    let info = ClassroomInfoPatch {
        campus: patch_field(patch, "campus")?,
        building: patch_field(patch, "building")?,
        room: patch_field(patch, "room")?,
        side_notes: patch_field(patch, "sideNotes")?,
    };
    let name = patch_field(patch, "name")?;
    if name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(bad_params("name must not be empty"));
    }

    let mut next = update_classroom_info(classroom(state, req)?, &info);
    if let Some(name) = name {
        next = rename_classroom(&next, &name);
    }
    let result = json!({ "classroom": next });
    commit_classroom(state, next);
    Ok(result)
}

pub fn try_handle(state: &mut SidecarState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "classes.list" => handle_classes_list(state, req),
        "classes.create" => handle_classes_create(state, req),
        "classes.delete" => handle_classes_delete(state, req),
        "classes.update" => handle_classes_update(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
