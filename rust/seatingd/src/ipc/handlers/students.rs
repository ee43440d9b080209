use crate::classroom::{
    add_student, dedupe_names, parse_student_names, remove_student, rename_student, replace_students,
};
use crate::ipc::handlers::respond;
use crate::ipc::helpers::{
    bad_params, classroom, commit_classroom, require_store, str_param, time_mode_param, HandlerErr,
};
use crate::ipc::types::{Request, SidecarState};
use crate::model::{Classroom, TimeMode, MAX_STUDENTS};
use serde_json::json;

fn handle_students_list(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let c = classroom(state, req)?;
    Ok(json!({ "classId": c.id, "students": c.students }))
}

fn replace_roster(
    state: &mut SidecarState,
    req: &Request,
    names: Vec<String>,
    time_mode: TimeMode,
) -> Result<serde_json::Value, HandlerErr> {
    let unique = dedupe_names(&names);
    let truncated = unique.len().saturating_sub(MAX_STUDENTS);
    let next = replace_students(classroom(state, req)?, &unique, time_mode);
    let result = json!({
        "classId": next.id,
        "timeMode": time_mode,
        "importedCount": next.students.len(),
        "truncatedCount": truncated,
        "students": next.students
    });
    commit_classroom(state, next);
    Ok(result)
}

fn handle_students_import(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let time_mode = time_mode_param(state, req)?;
    let Some(text) = req.params.get("text").and_then(|v| v.as_str()) else {
        return Err(bad_params("missing text"));
    };
    let names = parse_student_names(text);
    if names.is_empty() {
        return Err(bad_params("no student names found in text"));
    }
    replace_roster(state, req, names, time_mode)
}

fn handle_students_replace(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let time_mode = time_mode_param(state, req)?;
    let Some(arr) = req.params.get("names").and_then(|v| v.as_array()) else {
        return Err(bad_params("missing names"));
    };
    let names: Vec<String> = arr
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| s.to_string())
        .collect();
    replace_roster(state, req, names, time_mode)
}

fn find_student<'a>(c: &'a Classroom, req: &Request) -> Result<&'a str, HandlerErr> {
    let student_id = str_param(req, "studentId")?;
    c.students
        .iter()
        .find(|s| s.id == student_id)
        .map(|s| s.id.as_str())
        .ok_or_else(|| {
            HandlerErr::new("not_found", "student not found")
                .with_details(json!({ "studentId": student_id }))
        })
}

fn handle_students_add(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let name = str_param(req, "name")?;
    let c = classroom(state, req)?;
    if c.students.len() >= MAX_STUDENTS {
        return Err(bad_params(format!("a class holds at most {MAX_STUDENTS} students")));
    }
    let next = add_student(c, &name);
    let student = next.students.last().cloned();
    commit_classroom(state, next);
    Ok(json!({ "student": student }))
}

fn handle_students_rename(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let name = str_param(req, "name")?;
    let c = classroom(state, req)?;
    let student_id = find_student(c, req)?;
    let next = rename_student(c, student_id, &name);
    let result = json!({ "classId": next.id, "students": next.students });
    commit_classroom(state, next);
    Ok(result)
}

fn handle_students_remove(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let c = classroom(state, req)?;
    let student_id = find_student(c, req)?;
    let next = remove_student(c, student_id);
    let result = json!({ "classId": next.id, "students": next.students });
    commit_classroom(state, next);
    Ok(result)
}

pub fn try_handle(state: &mut SidecarState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_students_list(state, req),
        "students.import" => handle_students_import(state, req),
        "students.replace" => handle_students_replace(state, req),
        "students.add" => handle_students_add(state, req),
        "students.rename" => handle_students_rename(state, req),
        "students.remove" => handle_students_remove(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
