//! Turns untrusted JSON (persisted state, backups) into a well-formed
//! [`AppState`].
//!
//! Nothing here fails on bad data. Missing or mistyped fields fall back to
//! defaults, and classrooms or students that cannot be read are dropped
//! individually. Two classroom shapes are accepted:
//!
//! - current: `weekday` / `weekend` sub-objects;
//! - flat: a single implicit time mode with `seats`, `layoutMode`, ... on the
//!   classroom itself. It becomes `weekday`; `weekend` starts empty.
//!
//! The class-name-keyed legacy export lives in [`crate::legacy`].

use crate::layout::{empty_config, get_layout_metrics, seated_roster_ids, seats_for_mode};
use crate::legacy;
use crate::model::{
    now_millis, AppState, Classroom, LayoutMode, Seat, Student, TimeMode, TimeModeConfig,
    ARC_ROWS, ARC_ROW_WIDTH, GROUP_SIZE, MAX_GROUPS, MAX_STUDENTS, MIN_GROUPS, STATE_VERSION,
    THREE_ROWS, THREE_ROWS_MAX_COLS,
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    State,
    Legacy,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::State => "state",
            DocumentKind::Legacy => "legacy",
        }
    }
}

/// Parses and normalizes a state document. `None` only for unparseable JSON.
pub fn parse_state(text: &str) -> Option<AppState> {
    let value: Value = serde_json::from_str(text).ok()?;
    Some(normalize_state(&value))
}

/// Normalizes either a state document or a legacy export.
pub fn normalize_document(value: &Value) -> (AppState, DocumentKind) {
    if legacy::looks_like_legacy(value) {
        return (legacy::migrate_legacy(value), DocumentKind::Legacy);
    }
    (normalize_state(value), DocumentKind::State)
}

pub fn normalize_state(value: &Value) -> AppState {
    let mut state = AppState::empty();
    let Some(obj) = value.as_object() else {
        tracing::warn!("state document is not an object; starting empty");
        return state;
    };

    let raw = obj
        .get("classrooms")
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[]);
    let mut ids: HashSet<String> = HashSet::new();
    let mut dropped = 0usize;
    for v in raw {
        match normalize_classroom(v) {
            Some(c) if ids.insert(c.id.clone()) => state.classrooms.push(c),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!(dropped, "dropped unreadable classrooms while loading state");
    }

    state.active_classroom_id = obj
        .get("activeClassroomId")
        .and_then(|v| v.as_str())
        .filter(|id| ids.contains(*id))
        .map(|id| id.to_string())
        .or_else(|| state.classrooms.first().map(|c| c.id.clone()));
    state.active_time_mode = obj
        .get("activeTimeMode")
        .and_then(|v| v.as_str())
        .and_then(TimeMode::parse)
        .unwrap_or_default();
    state.version = STATE_VERSION;
    state
}

fn str_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn normalize_classroom(value: &Value) -> Option<Classroom> {
    let obj = value.as_object()?;

    let students = match obj.get("students") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(arr)) => normalize_students(arr),
        Some(_) => return None,
    };
    if obj.get("name").is_some_and(|v| !v.is_string()) {
        return None;
    }

    let id = obj
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let has_modes = obj.contains_key("weekday") || obj.contains_key("weekend");
    let is_flat = !has_modes && obj.get("seats").is_some_and(|v| v.is_array());
    let (weekday, weekend) = if is_flat {
        (
            normalize_config(Some(value), &students),
            empty_config(LayoutMode::Groups, students.len()),
        )
    } else {
        (
            normalize_config(obj.get("weekday"), &students),
            normalize_config(obj.get("weekend"), &students),
        )
    };

    Some(Classroom {
        id,
        name: str_field(obj, "name"),
        campus: str_field(obj, "campus"),
        building: str_field(obj, "building"),
        room: str_field(obj, "room"),
        side_notes: str_field(obj, "sideNotes"),
        updated_at: timestamp_field(obj.get("updatedAt")),
        students,
        weekday,
        weekend,
    })
}

fn normalize_students(arr: &[Value]) -> Vec<Student> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<Student> = Vec::new();
    for v in arr {
        let Some(obj) = v.as_object() else {
            continue;
        };
        let Some(id) = obj.get("id").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) else {
            continue;
        };
        if !seen.insert(id.to_string()) {
            continue;
        }
        out.push(Student {
            id: id.to_string(),
            name: str_field(obj, "name"),
        });
        if out.len() >= MAX_STUDENTS {
            break;
        }
    }
    out
}

fn timestamp_field(v: Option<&Value>) -> i64 {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or_else(now_millis),
        _ => now_millis(),
    }
}

fn count_field(v: Option<&Value>) -> u32 {
    let n = match v {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    };
    n.min(u32::MAX as u64) as u32
}

fn normalize_config(value: Option<&Value>, students: &[Student]) -> TimeModeConfig {
    let Some(obj) = value.and_then(|v| v.as_object()) else {
        return empty_config(LayoutMode::Groups, students.len());
    };

    let mode = obj
        .get("layoutMode")
        .and_then(|v| v.as_str())
        .and_then(LayoutMode::parse)
        .unwrap_or_default();

    // Ids not on the roster are kept: readers treat them as empty, and the
    // other time mode may legitimately hold stale ids after a roster swap.
    let mut seen: HashSet<String> = HashSet::new();
    let mut seats: Vec<Seat> = Vec::new();
    for v in obj
        .get("seats")
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[])
    {
        let id = v.as_str().map(str::trim).filter(|s| !s.is_empty());
        match id {
            Some(id) if seen.insert(id.to_string()) => seats.push(Some(id.to_string())),
            _ => seats.push(None),
        }
    }

    let stored_rows = obj
        .get("rows")
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(0);
    let config = TimeModeConfig {
        layout_mode: mode,
        rows: stored_rows,
        cols: 0,
        seats,
        rotation_count: count_field(obj.get("rotationCount")),
        week_label: str_field(obj, "weekLabel"),
        class_time: str_field(obj, "classTime"),
    };
    fit_loaded_config(config, students)
}

/// Geometry implied by a stored grid, or `None` when the grid cannot belong
/// to `config.layout_mode`.
fn stored_geometry(config: &TimeModeConfig, student_count: usize) -> Option<(usize, usize)> {
    let len = config.seats.len();
    match config.layout_mode {
        LayoutMode::Groups if len == GROUP_SIZE * MAX_GROUPS => {
            let groups = config.rows / 3;
            let rows = if config.rows % 3 == 0 && (MIN_GROUPS..=MAX_GROUPS).contains(&groups) {
                config.rows
            } else {
                get_layout_metrics(LayoutMode::Groups, student_count).rows
            };
            Some((rows, 2))
        }
        LayoutMode::Arc if len == ARC_ROWS * ARC_ROW_WIDTH => Some((ARC_ROWS, ARC_ROW_WIDTH)),
        LayoutMode::ThreeRows
            if len % THREE_ROWS == 0 && (1..=THREE_ROWS_MAX_COLS).contains(&(len / THREE_ROWS)) =>
        {
            Some((THREE_ROWS, len / THREE_ROWS))
        }
        _ => None,
    }
}

/// A stored grid that fits its layout is kept exactly as stored, stale ids
/// included. Anything else is laid out again from the roster members it
/// seats; nobody unseated is added.
fn fit_loaded_config(config: TimeModeConfig, students: &[Student]) -> TimeModeConfig {
    if let Some((rows, cols)) = stored_geometry(&config, students.len()) {
        return TimeModeConfig { rows, cols, ..config };
    }
    let m = get_layout_metrics(config.layout_mode, students.len());
    let seated = seated_roster_ids(students, &config.seats);
    TimeModeConfig {
        rows: m.rows,
        cols: m.cols,
        seats: seats_for_mode(config.layout_mode, &seated, students.len()),
        ..config
    }
}
