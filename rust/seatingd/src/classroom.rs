use crate::layout::{
    empty_config, get_layout_metrics, refit_config, seats_for_mode, seats_from_order, tidy_config,
    with_layout,
};
use crate::model::{
    now_millis, Classroom, LayoutMode, Student, TimeMode, MAX_STUDENTS,
};
use crate::rotation::{occupied_count, rotate_config};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

const HEADER_NAMES: [&str; 3] = ["姓名", "name", "student"];
const CELL_DELIMITERS: [char; 5] = ['\t', ',', ';', '，', '；'];

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn create_classroom(name: &str) -> Classroom {
    create_classroom_with_id(&new_id(), name)
}

pub fn create_classroom_with_id(id: &str, name: &str) -> Classroom {
    Classroom {
        id: id.to_string(),
        name: name.trim().to_string(),
        students: Vec::new(),
        campus: String::new(),
        building: String::new(),
        room: String::new(),
        side_notes: String::new(),
        updated_at: now_millis(),
        weekday: empty_config(LayoutMode::Groups, 0),
        weekend: empty_config(LayoutMode::Groups, 0),
    }
}

/// Clone of `classroom` with a fresh `updated_at`, ready to be changed.
fn touched(classroom: &Classroom) -> Classroom {
    let mut next = classroom.clone();
    next.updated_at = now_millis();
    next
}

/// Trims names, drops empties and keeps the first of each repeat.
pub fn dedupe_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for raw in names {
        let name = raw.as_ref().trim();
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_string()) {
            out.push(name.to_string());
        }
    }
    out
}

/// Pulls candidate names out of pasted text or a CSV-like export.
///
/// Only the first cell of each line is used. Header cells and blank lines
/// are skipped; nothing here fails.
pub fn parse_student_names(text: &str) -> Vec<String> {
    let text = text.trim_start_matches('\u{feff}');
    let mut names: Vec<String> = Vec::new();
    for line in text.lines() {
        let first = line.split(CELL_DELIMITERS).next().unwrap_or("");
        let name = first.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() {
            continue;
        }
        let lowered = name.to_lowercase();
        if HEADER_NAMES.iter().any(|h| *h == lowered) {
            continue;
        }
        names.push(name);
    }
    dedupe_names(&names)
}

/// Installs a fresh roster and fills `time_mode`'s seats in name order.
///
/// The other time mode is left alone, so its seats keep pointing at the old
/// ids until it is reconciled.
pub fn replace_students<S: AsRef<str>>(
    classroom: &Classroom,
    names: &[S],
    time_mode: TimeMode,
) -> Classroom {
    let mut next = touched(classroom);
    let names = dedupe_names(names);
    next.students = names
        .into_iter()
        .take(MAX_STUDENTS)
        .map(|name| Student { id: new_id(), name })
        .collect();

    let ids: Vec<String> = next.students.iter().map(|s| s.id.clone()).collect();
    let count = next.students.len();
    let config = next.config_mut(time_mode);
    let m = get_layout_metrics(config.layout_mode, count);
    config.rows = m.rows;
    config.cols = m.cols;
    config.seats = seats_from_order(&ids, m.capacity);
    config.rotation_count = 0;
    next
}

pub fn change_layout_mode(classroom: &Classroom, mode: LayoutMode, time_mode: TimeMode) -> Classroom {
    let mut next = touched(classroom);
    let config = with_layout(classroom.config(time_mode), mode, &classroom.students);
    *next.config_mut(time_mode) = config;
    next
}

/// Re-fits `time_mode`'s seats to the current roster without changing layout.
pub fn reconcile_time_mode(classroom: &Classroom, time_mode: TimeMode) -> Classroom {
    let mode = classroom.config(time_mode).layout_mode;
    change_layout_mode(classroom, mode, time_mode)
}

pub fn swap_seat_assignments(classroom: &Classroom, i: usize, j: usize, time_mode: TimeMode) -> Classroom {
    let capacity = classroom.config(time_mode).seats.len();
    if i == j || i >= capacity || j >= capacity {
        return classroom.clone();
    }
    let mut next = touched(classroom);
    next.config_mut(time_mode).seats.swap(i, j);
    next
}

pub fn clear_seat(classroom: &Classroom, seat_index: usize, time_mode: TimeMode) -> Classroom {
    if seat_index >= classroom.config(time_mode).seats.len() {
        return classroom.clone();
    }
    let mut next = touched(classroom);
    next.config_mut(time_mode).seats[seat_index] = None;
    next
}

/// Seats `student_id` at `seat_index`. Whoever sat there becomes unassigned.
pub fn place_student_in_seat(
    classroom: &Classroom,
    student_id: &str,
    seat_index: usize,
    time_mode: TimeMode,
) -> Classroom {
    if !classroom.has_student(student_id) || seat_index >= classroom.config(time_mode).seats.len() {
        return classroom.clone();
    }
    let mut next = touched(classroom);
    let seats = &mut next.config_mut(time_mode).seats;
    for slot in seats.iter_mut() {
        if slot.as_deref() == Some(student_id) {
            *slot = None;
        }
    }
    seats[seat_index] = Some(student_id.to_string());
    next
}

pub fn rotate_seats_once(classroom: &Classroom, time_mode: TimeMode) -> Classroom {
    let config = classroom.config(time_mode);
    if occupied_count(&classroom.students, &config.seats) < 2 {
        return classroom.clone();
    }
    let mut next = touched(classroom);
    *next.config_mut(time_mode) = rotate_config(config, &classroom.students);
    next
}

/// Shuffles the whole roster (Fisher-Yates) and lays it out again.
pub fn randomize_seats<R: Rng + ?Sized>(classroom: &Classroom, time_mode: TimeMode, rng: &mut R) -> Classroom {
    let mut ids: Vec<String> = classroom.students.iter().map(|s| s.id.clone()).collect();
    for i in (1..ids.len()).rev() {
        let j = rng.gen_range(0..=i);
        ids.swap(i, j);
    }

    let mut next = touched(classroom);
    let count = classroom.students.len();
    let config = next.config_mut(time_mode);
    let m = get_layout_metrics(config.layout_mode, count);
    config.rows = m.rows;
    config.cols = m.cols;
    config.seats = seats_for_mode(config.layout_mode, &ids, count);
    next
}

pub fn get_student_map(classroom: &Classroom) -> HashMap<&str, &Student> {
    classroom
        .students
        .iter()
        .map(|s| (s.id.as_str(), s))
        .collect()
}

pub fn get_assigned_count(classroom: &Classroom, time_mode: TimeMode) -> usize {
    occupied_count(&classroom.students, &classroom.config(time_mode).seats)
}

/// Roster members with no seat in `time_mode`, in roster order.
pub fn get_unassigned_students(classroom: &Classroom, time_mode: TimeMode) -> Vec<&Student> {
    let seated: HashSet<&str> = classroom
        .config(time_mode)
        .seats
        .iter()
        .flatten()
        .map(|s| s.as_str())
        .collect();
    classroom
        .students
        .iter()
        .filter(|s| !seated.contains(s.id.as_str()))
        .collect()
}

pub fn rename_classroom(classroom: &Classroom, name: &str) -> Classroom {
    let name = name.trim();
    if name.is_empty() {
        return classroom.clone();
    }
    let mut next = touched(classroom);
    next.name = name.to_string();
    next
}

#[derive(Debug, Clone, Default)]
pub struct ClassroomInfoPatch {
    pub campus: Option<String>,
    pub building: Option<String>,
    pub room: Option<String>,
    pub side_notes: Option<String>,
}

pub fn update_classroom_info(classroom: &Classroom, patch: &ClassroomInfoPatch) -> Classroom {
    let mut next = touched(classroom);
    if let Some(v) = &patch.campus {
        next.campus = v.trim().to_string();
    }
    if let Some(v) = &patch.building {
        next.building = v.trim().to_string();
    }
    if let Some(v) = &patch.room {
        next.room = v.trim().to_string();
    }
    if let Some(v) = &patch.side_notes {
        next.side_notes = v.clone();
    }
    next
}

pub fn update_time_mode_labels(
    classroom: &Classroom,
    time_mode: TimeMode,
    week_label: Option<&str>,
    class_time: Option<&str>,
) -> Classroom {
    let mut next = touched(classroom);
    let config = next.config_mut(time_mode);
    if let Some(v) = week_label {
        config.week_label = v.trim().to_string();
    }
    if let Some(v) = class_time {
        config.class_time = v.trim().to_string();
    }
    next
}

/// Appends one student, who takes the next free seat in both time modes.
/// Everyone already seated stays where they are.
pub fn add_student(classroom: &Classroom, name: &str) -> Classroom {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() || classroom.students.len() >= MAX_STUDENTS {
        return classroom.clone();
    }
    let mut next = touched(classroom);
    next.students.push(Student { id: new_id(), name });
    for tm in TimeMode::ALL {
        let config = tidy_config(next.config(tm), &next.students);
        *next.config_mut(tm) = config;
    }
    next
}

pub fn rename_student(classroom: &Classroom, student_id: &str, name: &str) -> Classroom {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() || !classroom.has_student(student_id) {
        return classroom.clone();
    }
    let mut next = touched(classroom);
    for s in next.students.iter_mut().filter(|s| s.id == student_id) {
        s.name = name.clone();
    }
    next
}

/// Drops a student from the roster and empties their seat in both modes.
/// Other occupants stay put unless the layout's capacity shrinks.
pub fn remove_student(classroom: &Classroom, student_id: &str) -> Classroom {
    if !classroom.has_student(student_id) {
        return classroom.clone();
    }
    let mut next = touched(classroom);
    next.students.retain(|s| s.id != student_id);
    let students = next.students.clone();
    for tm in TimeMode::ALL {
        let config = next.config_mut(tm);
        for slot in config.seats.iter_mut() {
            if slot.as_deref() == Some(student_id) {
                *slot = None;
            }
        }
        *config = refit_config(config, &students);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn with_roster(names: &[&str]) -> Classroom {
        replace_students(&create_classroom("J328"), names, TimeMode::Weekday)
    }

    fn ids(c: &Classroom) -> Vec<String> {
        c.students.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn create_starts_with_empty_group_layouts() {
        let c = create_classroom("  J328 ");
        assert_eq!(c.name, "J328");
        assert!(c.students.is_empty());
        for tm in TimeMode::ALL {
            let cfg = c.config(tm);
            assert_eq!(cfg.layout_mode, LayoutMode::Groups);
            assert_eq!(cfg.seats.len(), 36);
            assert_eq!(cfg.rotation_count, 0);
        }
    }

    #[test]
    fn replace_students_fills_in_name_order() {
        let c = with_roster(&["Alice", "Bob", "Carol"]);
        assert_eq!(get_assigned_count(&c, TimeMode::Weekday), 3);
        let names: Vec<&str> = c.students.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
        let seats = &c.weekday.seats;
        assert_eq!(seats.len(), 36);
        for (i, id) in ids(&c).iter().enumerate() {
            assert_eq!(seats[i].as_deref(), Some(id.as_str()));
        }
        assert!(seats[3..].iter().all(|s| s.is_none()));
    }

    #[test]
    fn replace_students_dedupes_and_truncates() {
        let mut names: Vec<String> = (0..40).map(|i| format!("S{i}")).collect();
        names.insert(1, "S0".into());
        names.insert(2, "   ".into());
        let c = replace_students(&create_classroom("big"), &names, TimeMode::Weekday);
        assert_eq!(c.students.len(), MAX_STUDENTS);
        assert_eq!(c.students[1].name, "S1");
    }

    #[test]
    fn replace_students_resets_counter_and_leaves_other_mode() {
        let c = with_roster(&["A", "B"]);
        let c = rotate_seats_once(&c, TimeMode::Weekday);
        assert_eq!(c.weekday.rotation_count, 1);
        let weekend_before = c.weekend.clone();

        let c = replace_students(&c, &["X", "Y", "Z"], TimeMode::Weekday);
        assert_eq!(c.weekday.rotation_count, 0);
        assert_eq!(c.weekend, weekend_before);
    }

    #[test]
    fn replace_students_leaves_other_mode_pointing_at_old_ids() {
        let c = with_roster(&["A", "B"]);
        let c = reconcile_time_mode(&c, TimeMode::Weekend);
        let old_ids = ids(&c);
        assert_eq!(get_assigned_count(&c, TimeMode::Weekend), 2);

        let c = replace_students(&c, &["A", "B"], TimeMode::Weekday);
        let weekend_ids: Vec<&str> = c.weekend.seats.iter().flatten().map(|s| s.as_str()).collect();
        assert_eq!(weekend_ids, old_ids.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        assert_eq!(get_assigned_count(&c, TimeMode::Weekend), 0);

        let c = reconcile_time_mode(&c, TimeMode::Weekend);
        assert_eq!(get_assigned_count(&c, TimeMode::Weekend), 2);
    }

    #[test]
    fn change_layout_touches_only_one_mode() {
        let c = with_roster(&["A", "B", "C", "D"]);
        let c = change_layout_mode(&c, LayoutMode::ThreeRows, TimeMode::Weekday);
        assert_eq!(c.weekday.layout_mode, LayoutMode::ThreeRows);
        assert_eq!((c.weekday.rows, c.weekday.cols), (3, 2));
        assert_eq!(c.weekday.seats.len(), 6);
        assert_eq!(c.weekend.layout_mode, LayoutMode::Groups);
    }

    #[test]
    fn swap_and_clear_ignore_bad_indices() {
        let c = with_roster(&["A", "B"]);
        assert_eq!(swap_seat_assignments(&c, 1, 1, TimeMode::Weekday), c);
        assert_eq!(swap_seat_assignments(&c, 0, 36, TimeMode::Weekday), c);
        assert_eq!(clear_seat(&c, 99, TimeMode::Weekday), c);

        let swapped = swap_seat_assignments(&c, 0, 5, TimeMode::Weekday);
        assert_eq!(swapped.weekday.seats[0], None);
        assert_eq!(swapped.weekday.seats[5], c.weekday.seats[0]);

        let cleared = clear_seat(&c, 1, TimeMode::Weekday);
        assert_eq!(cleared.weekday.seats[1], None);
        assert_eq!(get_unassigned_students(&cleared, TimeMode::Weekday)[0].name, "B");
    }

    #[test]
    fn placing_evicts_the_previous_occupant() {
        let c = with_roster(&["A", "B", "C"]);
        let a = c.students[0].id.clone();
        let b = c.students[1].id.clone();

        let moved = place_student_in_seat(&c, &a, 1, TimeMode::Weekday);
        assert_eq!(moved.weekday.seats[0], None);
        assert_eq!(moved.weekday.seats[1].as_deref(), Some(a.as_str()));
        let unassigned = get_unassigned_students(&moved, TimeMode::Weekday);
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].id, b);

        assert_eq!(place_student_in_seat(&c, "nobody", 1, TimeMode::Weekday), c);
        assert_eq!(place_student_in_seat(&c, &a, 36, TimeMode::Weekday), c);
    }

    #[test]
    fn rotate_noop_keeps_updated_at() {
        let c = with_roster(&["Solo"]);
        assert_eq!(rotate_seats_once(&c, TimeMode::Weekday), c);
    }

    #[test]
    fn randomize_keeps_everyone_seated_once() {
        let names: Vec<String> = (0..20).map(|i| format!("S{i}")).collect();
        let c = replace_students(&create_classroom("r"), &names, TimeMode::Weekday);
        let c = change_layout_mode(&c, LayoutMode::Arc, TimeMode::Weekday);
        let c = rotate_seats_once(&c, TimeMode::Weekday);
        let mut rng = StdRng::seed_from_u64(7);
        let shuffled = randomize_seats(&c, TimeMode::Weekday, &mut rng);

        assert_eq!(shuffled.weekday.rotation_count, 1);
        assert_eq!(get_assigned_count(&shuffled, TimeMode::Weekday), 20);
        let seated: HashSet<&String> = shuffled.weekday.seats.iter().flatten().collect();
        assert_eq!(seated.len(), 20);
        // ten per arc row, on columns 4..=13
        assert_eq!(shuffled.weekday.seats[..18].iter().flatten().count(), 10);
        assert!(shuffled.weekday.seats[3].is_none());
        assert!(shuffled.weekday.seats[4].is_some());
    }

    #[test]
    fn parse_names_handles_headers_and_delimiters() {
        let text = "\u{feff}姓名,学号\nAlice\t001\n  Bob   Smith ;x\n\nNAME\nCarol，3\nAlice\nstudent\n";
        assert_eq!(parse_student_names(text), vec!["Alice", "Bob Smith", "Carol"]);
        assert!(parse_student_names("").is_empty());
        assert!(parse_student_names(",,,\n\t").is_empty());
    }

    #[test]
    fn add_rename_remove_student() {
        let c = with_roster(&["A", "B"]);
        let c = add_student(&c, "  New   Kid ");
        assert_eq!(c.students.len(), 3);
        assert_eq!(c.students[2].name, "New Kid");
        assert_eq!(get_assigned_count(&c, TimeMode::Weekday), 3);
        assert_eq!(get_assigned_count(&c, TimeMode::Weekend), 3);

        let id = c.students[2].id.clone();
        let c = rename_student(&c, &id, "Renamed");
        assert_eq!(get_student_map(&c)[id.as_str()].name, "Renamed");

        let c = remove_student(&c, &id);
        assert_eq!(c.students.len(), 2);
        assert!(c.weekday.seats.iter().flatten().all(|s| *s != id));
        assert!(c.weekend.seats.iter().flatten().all(|s| *s != id));
    }

    #[test]
    fn add_student_keeps_hand_placed_groups() {
        let c = with_roster(&["A", "B", "C", "D"]);
        let ids = ids(&c);
        // A and B in group 0 with a gap, C and D moved to group 1
        let c = swap_seat_assignments(&c, 1, 3, TimeMode::Weekday);
        let c = place_student_in_seat(&c, &ids[2], 6, TimeMode::Weekday);
        let c = place_student_in_seat(&c, &ids[3], 7, TimeMode::Weekday);
        let before = c.weekday.seats.clone();

        let c = add_student(&c, "E");
        let e = c.students[4].id.clone();
        for (i, seat) in before.iter().enumerate() {
            if seat.is_some() {
                assert_eq!(&c.weekday.seats[i], seat, "seat {i} moved");
            }
        }
        assert_eq!(c.weekday.seats[1].as_deref(), Some(e.as_str()));
        assert_eq!(get_assigned_count(&c, TimeMode::Weekday), 5);
    }

    #[test]
    fn add_student_respects_limit() {
        let names: Vec<String> = (0..36).map(|i| format!("S{i}")).collect();
        let c = replace_students(&create_classroom("full"), &names, TimeMode::Weekday);
        assert_eq!(add_student(&c, "Extra"), c);
    }

    #[test]
    fn info_and_labels_update() {
        let c = create_classroom("J328");
        let c = update_classroom_info(
            &c,
            &ClassroomInfoPatch {
                campus: Some(" North ".into()),
                room: Some("328".into()),
                ..Default::default()
            },
        );
        assert_eq!(c.campus, "North");
        assert_eq!(c.room, "328");
        assert_eq!(c.building, "");

        let c = update_time_mode_labels(&c, TimeMode::Weekend, Some("Week 2"), None);
        assert_eq!(c.weekend.week_label, "Week 2");
        assert_eq!(c.weekday.week_label, "");
        assert_eq!(rename_classroom(&c, "  "), c);
    }
}
