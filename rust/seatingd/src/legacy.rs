//! Migration of the old class-name-keyed export.
//!
//! Shape, per class:
//!
//! ```text
//! { "<class name>": {
//!     "weekday": { "layout": "circular" | "rows" | "arc",
//!                  "groups": [["name", ...], ...],
//!                  "rowGroups": { "rows": [{ "left": [...], "right": [...] }, ...] },
//!                  "arcGroups": { "rows": [[...], [...]] },
//!                  "locationInfo": { "campus", "building", "room", "notes", "time" },
//!                  "currentArrangement": 3,
//!                  "weekLabel": "..." },
//!     "weekend": { ... } } }
//! ```
//!
//! Students are identified by name only, so every distinct name across both
//! time modes becomes one roster entry with a fresh id.

use crate::layout::{empty_config, get_layout_metrics, place_centered, seats_from_groups};
use crate::model::{
    now_millis, AppState, Classroom, LayoutMode, Seat, Student, TimeMode, TimeModeConfig,
    ARC_ROWS, ARC_ROW_WIDTH, MAX_STUDENTS, THREE_ROWS,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const MODE_KEYS: [(TimeMode, &str); 2] = [(TimeMode::Weekday, "weekday"), (TimeMode::Weekend, "weekend")];

/// True for a non-empty object without `classrooms` whose every value carries
/// a `weekday` or `weekend` block.
pub fn looks_like_legacy(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };
    if obj.is_empty() || obj.contains_key("classrooms") {
        return false;
    }
    obj.values().all(|v| {
        v.as_object()
            .is_some_and(|o| o.contains_key("weekday") || o.contains_key("weekend"))
    })
}

pub fn migrate_legacy(value: &Value) -> AppState {
    let mut state = AppState::empty();
    let Some(obj) = value.as_object() else {
        return state;
    };
    for (class_name, block) in obj {
        match migrate_class(class_name, block) {
            Some(c) => state = state.upsert_classroom(c),
            None => tracing::warn!(class = %class_name, "skipping unreadable legacy class"),
        }
    }
    tracing::info!(classrooms = state.classrooms.len(), "migrated legacy seating data");
    state
}

fn legacy_layout(mode: &Map<String, Value>) -> LayoutMode {
    match mode.get("layout").and_then(|v| v.as_str()).map(str::trim) {
        Some("rows") => LayoutMode::ThreeRows,
        Some("arc") => LayoutMode::Arc,
        _ => LayoutMode::Groups,
    }
}

/// A legacy seat entry is either a bare name or `{ "name": ... }`.
fn entry_name(v: &Value) -> Option<String> {
    let raw = match v {
        Value::String(s) => s.as_str(),
        Value::Object(o) => o.get("name").and_then(|n| n.as_str())?,
        _ => return None,
    };
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

fn name_list(v: Option<&Value>) -> Vec<String> {
    let arr = match v {
        Some(Value::Array(a)) => a.as_slice(),
        // groups were sometimes stored as { "students": [...] }
        Some(Value::Object(o)) => match o.get("students") {
            Some(Value::Array(a)) => a.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    arr.iter().filter_map(entry_name).collect()
}

fn array_at<'a>(v: Option<&'a Value>, path: &[&str]) -> &'a [Value] {
    let mut cur = v;
    for key in path {
        cur = cur.and_then(|c| c.get(*key));
    }
    cur.and_then(|c| c.as_array()).map(|a| a.as_slice()).unwrap_or(&[])
}

/// Per-row name lists for a time mode, in the layout's own structure.
enum Arrangement {
    Groups(Vec<Vec<String>>),
    Rows(Vec<(Vec<String>, Vec<String>)>),
    Arc(Vec<Vec<String>>),
}

impl Arrangement {
    fn read(mode: &Map<String, Value>) -> Self {
        match legacy_layout(mode) {
            LayoutMode::Groups => Arrangement::Groups(
                array_at(mode.get("groups"), &[])
                    .iter()
                    .map(|g| name_list(Some(g)))
                    .collect(),
            ),
            LayoutMode::ThreeRows => Arrangement::Rows(
                array_at(mode.get("rowGroups"), &["rows"])
                    .iter()
                    .map(|row| (name_list(row.get("left")), name_list(row.get("right"))))
                    .collect(),
            ),
            LayoutMode::Arc => Arrangement::Arc(
                array_at(mode.get("arcGroups"), &["rows"])
                    .iter()
                    .map(|row| name_list(Some(row)))
                    .collect(),
            ),
        }
    }

    fn names(&self) -> Vec<&String> {
        match self {
            Arrangement::Groups(groups) | Arrangement::Arc(groups) => groups.iter().flatten().collect(),
            Arrangement::Rows(rows) => rows
                .iter()
                .flat_map(|(l, r)| l.iter().chain(r.iter()))
                .collect(),
        }
    }

    fn seats(&self, ids: &HashMap<String, String>, student_count: usize) -> Vec<Seat> {
        let to_ids = |names: &[String]| -> Vec<String> {
            names.iter().filter_map(|n| ids.get(n).cloned()).collect()
        };
        match self {
            Arrangement::Groups(groups) => {
                let groups: Vec<Vec<String>> = groups.iter().map(|g| to_ids(g)).collect();
                seats_from_groups(&groups)
            }
            Arrangement::Rows(rows) => {
                // Each legacy row fills its own grid row; whoever does not
                // fit there takes the free seats in order.
                let cols = get_layout_metrics(LayoutMode::ThreeRows, student_count).cols;
                let mut seats: Vec<Seat> = vec![None; THREE_ROWS * cols];
                let mut seen: HashSet<String> = HashSet::new();
                let mut overflow: Vec<String> = Vec::new();
                for (r, (left, right)) in rows.iter().enumerate() {
                    let mut members = to_ids(left)
                        .into_iter()
                        .chain(to_ids(right))
                        .filter(|id| seen.insert(id.clone()));
                    if r < THREE_ROWS {
                        for (slot, id) in seats[r * cols..(r + 1) * cols].iter_mut().zip(&mut members) {
                            *slot = Some(id);
                        }
                    }
                    overflow.extend(members);
                }
                let mut overflow = overflow.into_iter();
                for slot in seats.iter_mut().filter(|s| s.is_none()) {
                    match overflow.next() {
                        Some(id) => *slot = Some(id),
                        None => break,
                    }
                }
                seats
            }
            Arrangement::Arc(rows) => {
                let mut seats: Vec<Seat> = vec![None; ARC_ROWS * ARC_ROW_WIDTH];
                let mut seen: HashSet<String> = HashSet::new();
                for (r, row) in rows.iter().enumerate().take(ARC_ROWS) {
                    let row_ids: Vec<String> = to_ids(row)
                        .into_iter()
                        .filter(|id| seen.insert(id.clone()))
                        .collect();
                    place_centered(&mut seats, &row_ids, r * ARC_ROW_WIDTH, ARC_ROW_WIDTH);
                }
                seats
            }
        }
    }
}

fn location_field(modes: &[(TimeMode, &Map<String, Value>)], key: &str) -> String {
    for (_, mode) in modes {
        let v = mode
            .get("locationInfo")
            .and_then(|l| l.get(key))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("");
        if !v.is_empty() {
            return v.to_string();
        }
    }
    String::new()
}

fn migrate_class(class_name: &str, block: &Value) -> Option<Classroom> {
    let obj = block.as_object()?;
    let modes: Vec<(TimeMode, &Map<String, Value>)> = MODE_KEYS
        .iter()
        .filter_map(|(tm, key)| obj.get(*key).and_then(|v| v.as_object()).map(|m| (*tm, m)))
        .collect();
    let arrangements: Vec<(TimeMode, &Map<String, Value>, Arrangement)> = modes
        .iter()
        .map(|(tm, m)| (*tm, *m, Arrangement::read(m)))
        .collect();

    // Union of names, weekday first, first occurrence wins.
    let mut students: Vec<Student> = Vec::new();
    let mut ids: HashMap<String, String> = HashMap::new();
    for (_, _, arrangement) in &arrangements {
        for name in arrangement.names() {
            if students.len() >= MAX_STUDENTS || ids.contains_key(name) {
                continue;
            }
            let id = Uuid::new_v4().to_string();
            ids.insert(name.clone(), id.clone());
            students.push(Student {
                id,
                name: name.clone(),
            });
        }
    }

    let mut weekday = empty_config(LayoutMode::Groups, students.len());
    let mut weekend = empty_config(LayoutMode::Groups, students.len());
    for (tm, mode, arrangement) in &arrangements {
        let layout = legacy_layout(mode);
        let m = get_layout_metrics(layout, students.len());
        let config = TimeModeConfig {
            layout_mode: layout,
            rows: m.rows,
            cols: m.cols,
            seats: arrangement.seats(&ids, students.len()),
            rotation_count: mode
                .get("currentArrangement")
                .and_then(|v| v.as_u64())
                .map(|n| n.min(u32::MAX as u64) as u32)
                .unwrap_or(0),
            week_label: mode
                .get("weekLabel")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            class_time: mode
                .get("locationInfo")
                .and_then(|l| l.get("time"))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string(),
        };
        match tm {
            TimeMode::Weekday => weekday = config,
            TimeMode::Weekend => weekend = config,
        }
    }

    Some(Classroom {
        id: Uuid::new_v4().to_string(),
        name: class_name.trim().to_string(),
        campus: location_field(&modes, "campus"),
        building: location_field(&modes, "building"),
        room: location_field(&modes, "room"),
        side_notes: location_field(&modes, "notes"),
        updated_at: now_millis(),
        students,
        weekday,
        weekend,
    })
}
