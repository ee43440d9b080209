use crate::classroom::{
    change_layout_mode, clear_seat, get_assigned_count, get_unassigned_students, place_student_in_seat,
    randomize_seats, rotate_seats_once, swap_seat_assignments, update_time_mode_labels,
};
use crate::ipc::handlers::respond;
use crate::ipc::helpers::{
    bad_params, classroom, commit_classroom, index_param, opt_str_param, require_store, str_param,
    time_mode_param, HandlerErr,
};
use crate::ipc::types::{Request, SidecarState};
use crate::layout::{get_active_group_indices, get_layout_metrics};
use crate::model::{Classroom, LayoutMode, TimeMode};
use crate::rotation::{get_rotation_mapping, get_three_rows_color_order};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

/// Everything the UI needs to draw one time mode of a classroom.
fn seating_view(c: &Classroom, time_mode: TimeMode) -> serde_json::Value {
    let config = c.config(time_mode);
    let metrics = get_layout_metrics(config.layout_mode, c.students.len());
    json!({
        "classId": c.id,
        "timeMode": time_mode,
        "config": config,
        "metrics": metrics,
        "activeGroups": get_active_group_indices(metrics.group_count),
        "rotationMapping": get_rotation_mapping(metrics.group_count, config.rotation_count),
        "threeRowsColorOrder": get_three_rows_color_order(config.rotation_count),
        "assignedCount": get_assigned_count(c, time_mode),
        "unassigned": get_unassigned_students(c, time_mode),
        "students": c.students
    })
}

fn seat_index(c: &Classroom, time_mode: TimeMode, req: &Request, key: &str) -> Result<usize, HandlerErr> {
    let idx = index_param(req, key)?;
    let capacity = c.config(time_mode).seats.len();
    if idx >= capacity {
        return Err(bad_params(format!("{key} out of range"))
            .with_details(json!({ key: idx, "capacity": capacity })));
    }
    Ok(idx)
}

fn save_and_view(state: &mut SidecarState, next: Classroom, time_mode: TimeMode) -> serde_json::Value {
    let view = seating_view(&next, time_mode);
    commit_classroom(state, next);
    view
}

fn handle_seating_get(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let time_mode = time_mode_param(state, req)?;
    Ok(seating_view(classroom(state, req)?, time_mode))
}

fn handle_seating_set_layout(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let time_mode = time_mode_param(state, req)?;
    let raw = str_param(req, "layoutMode")?;
    let mode = LayoutMode::parse(&raw)
        .ok_or_else(|| bad_params("layoutMode must be GROUPS, THREE_ROWS or ARC"))?;
    let next = change_layout_mode(classroom(state, req)?, mode, time_mode);
    Ok(save_and_view(state, next, time_mode))
}

fn handle_seating_place(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let time_mode = time_mode_param(state, req)?;
    let c = classroom(state, req)?;
    let idx = seat_index(c, time_mode, req, "seatIndex")?;
    let student_id = str_param(req, "studentId")?;
    if !c.has_student(&student_id) {
        return Err(HandlerErr::new("not_found", "student not found")
            .with_details(json!({ "studentId": student_id })));
    }
    let next = place_student_in_seat(c, &student_id, idx, time_mode);
    Ok(save_and_view(state, next, time_mode))
}

fn handle_seating_clear(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let time_mode = time_mode_param(state, req)?;
    let c = classroom(state, req)?;
    let idx = seat_index(c, time_mode, req, "seatIndex")?;
    let next = clear_seat(c, idx, time_mode);
    Ok(save_and_view(state, next, time_mode))
}

fn handle_seating_swap(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let time_mode = time_mode_param(state, req)?;
    let c = classroom(state, req)?;
    let from = seat_index(c, time_mode, req, "from")?;
    let to = seat_index(c, time_mode, req, "to")?;
    let next = swap_seat_assignments(c, from, to, time_mode);
    Ok(save_and_view(state, next, time_mode))
}

fn handle_seating_rotate(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let time_mode = time_mode_param(state, req)?;
    let c = classroom(state, req)?;
    let before = c.config(time_mode).rotation_count;
    let next = rotate_seats_once(c, time_mode);
    let rotated = next.config(time_mode).rotation_count != before;
    let mut view = save_and_view(state, next, time_mode);
    view["rotated"] = json!(rotated);
    Ok(view)
}

fn handle_seating_randomize(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let time_mode = time_mode_param(state, req)?;
    let c = classroom(state, req)?;
    let next = match req.params.get("seed").and_then(|v| v.as_u64()) {
        Some(seed) => randomize_seats(c, time_mode, &mut StdRng::seed_from_u64(seed)),
        None => randomize_seats(c, time_mode, &mut rand::thread_rng()),
    };
    Ok(save_and_view(state, next, time_mode))
}

fn handle_seating_set_labels(state: &mut SidecarState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_store(state)?;
    let time_mode = time_mode_param(state, req)?;
    let week_label = opt_str_param(req, "weekLabel");
    let class_time = opt_str_param(req, "classTime");
    if week_label.is_none() && class_time.is_none() {
        return Err(bad_params("expected weekLabel and/or classTime"));
    }
    let next = update_time_mode_labels(classroom(state, req)?, time_mode, week_label, class_time);
    Ok(save_and_view(state, next, time_mode))
}

pub fn try_handle(state: &mut SidecarState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "seating.get" => handle_seating_get(state, req),
        "seating.setLayout" => handle_seating_set_layout(state, req),
        "seating.place" => handle_seating_place(state, req),
        "seating.clear" => handle_seating_clear(state, req),
        "seating.swap" => handle_seating_swap(state, req),
        "seating.rotate" => handle_seating_rotate(state, req),
        "seating.randomize" => handle_seating_randomize(state, req),
        "seating.setLabels" => handle_seating_set_labels(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
