use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use seatingd::classroom::{
    add_student, change_layout_mode, clear_seat, create_classroom, get_assigned_count,
    place_student_in_seat, randomize_seats, remove_student, replace_students, rotate_seats_once,
    swap_seat_assignments,
};
use seatingd::layout::get_layout_metrics;
use seatingd::model::{AppState, Classroom, LayoutMode, TimeMode, MAX_STUDENTS};
use seatingd::normalize::parse_state;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    Layout(LayoutMode, TimeMode),
    Rotate(TimeMode),
    Swap(usize, usize, TimeMode),
    Clear(usize, TimeMode),
    Place(usize, usize, TimeMode),
    Randomize(u64, TimeMode),
    Add,
    Remove(usize),
    Replace(usize, TimeMode),
}

fn time_mode() -> impl Strategy<Value = TimeMode> {
    prop_oneof![Just(TimeMode::Weekday), Just(TimeMode::Weekend)]
}

fn layout_mode() -> impl Strategy<Value = LayoutMode> {
    prop_oneof![
        Just(LayoutMode::Groups),
        Just(LayoutMode::ThreeRows),
        Just(LayoutMode::Arc)
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (layout_mode(), time_mode()).prop_map(|(l, t)| Op::Layout(l, t)),
        time_mode().prop_map(Op::Rotate),
        (0usize..40, 0usize..40, time_mode()).prop_map(|(i, j, t)| Op::Swap(i, j, t)),
        (0usize..40, time_mode()).prop_map(|(i, t)| Op::Clear(i, t)),
        (0usize..40, 0usize..40, time_mode()).prop_map(|(s, i, t)| Op::Place(s, i, t)),
        (any::<u64>(), time_mode()).prop_map(|(seed, t)| Op::Randomize(seed, t)),
        Just(Op::Add),
        (0usize..40).prop_map(Op::Remove),
    ]
}

/// Adds roster replacement, which leaves the other time mode on old ids.
fn op_with_replace() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => op(),
        1 => (0usize..=36, time_mode()).prop_map(|(count, t)| Op::Replace(count, t)),
    ]
}

fn apply(c: &Classroom, op: &Op, n: usize) -> Classroom {
    let student_id = |k: usize| c.students.get(k % c.students.len().max(1)).map(|s| s.id.clone());
    match op {
        Op::Layout(mode, tm) => change_layout_mode(c, *mode, *tm),
        Op::Rotate(tm) => rotate_seats_once(c, *tm),
        Op::Swap(i, j, tm) => swap_seat_assignments(c, *i, *j, *tm),
        Op::Clear(i, tm) => clear_seat(c, *i, *tm),
        Op::Place(k, i, tm) => match student_id(*k) {
            Some(id) => place_student_in_seat(c, &id, *i, *tm),
            None => c.clone(),
        },
        Op::Randomize(seed, tm) => randomize_seats(c, *tm, &mut StdRng::seed_from_u64(*seed)),
        Op::Add => add_student(c, &format!("New {n}")),
        Op::Remove(k) => match student_id(*k) {
            Some(id) => remove_student(c, &id),
            None => c.clone(),
        },
        Op::Replace(count, tm) => {
            let names: Vec<String> = (0..*count).map(|i| format!("R{n}-{i}")).collect();
            replace_students(c, &names, *tm)
        }
    }
}

fn check_invariants(c: &Classroom) {
    let roster: HashSet<&str> = c.students.iter().map(|s| s.id.as_str()).collect();
    assert!(c.students.len() <= MAX_STUDENTS);
    for tm in TimeMode::ALL {
        let config = c.config(tm);
        let m = get_layout_metrics(config.layout_mode, c.students.len());
        assert_eq!(config.seats.len(), m.capacity, "{tm:?} capacity");
        assert!(m.capacity >= c.students.len());
        let mut seen = HashSet::new();
        for id in config.seats.iter().flatten() {
            assert!(seen.insert(id.as_str()), "{tm:?} seats {id} twice");
            assert!(roster.contains(id.as_str()), "{tm:?} seats unknown {id}");
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn seats_stay_unique_and_sized(count in 0usize..=40, ops in prop::collection::vec(op(), 0..30)) {
        let names: Vec<String> = (0..count).map(|i| format!("Student {i}")).collect();
        let mut c = replace_students(&create_classroom("P"), &names, TimeMode::Weekday);
        check_invariants(&c);
        for (n, op) in ops.iter().enumerate() {
            c = apply(&c, op, n);
            check_invariants(&c);
        }
    }

    #[test]
    fn rotation_seats_the_whole_roster(count in 2usize..=36, mode in layout_mode(), steps in 1usize..8) {
        let names: Vec<String> = (0..count).map(|i| format!("S{i}")).collect();
        let c = replace_students(&create_classroom("R"), &names, TimeMode::Weekend);
        let mut c = change_layout_mode(&c, mode, TimeMode::Weekend);
        for _ in 0..steps {
            c = rotate_seats_once(&c, TimeMode::Weekend);
        }
        prop_assert_eq!(get_assigned_count(&c, TimeMode::Weekend), count);
        prop_assert_eq!(c.weekend.rotation_count as usize, steps);
        prop_assert_eq!(c.weekend.layout_mode, mode);
    }

    #[test]
    fn persisted_state_round_trips(
        count in 0usize..=36,
        weekend in layout_mode(),
        ops in prop::collection::vec(op_with_replace(), 0..20),
    ) {
        let names: Vec<String> = (0..count).map(|i| format!("Student {i}")).collect();
        let c = change_layout_mode(&create_classroom("RT"), weekend, TimeMode::Weekend);
        let mut c = replace_students(&c, &names, TimeMode::Weekday);
        for (n, op) in ops.iter().enumerate() {
            c = apply(&c, op, n);
        }
        let state = AppState::empty().upsert_classroom(c).set_active_time_mode(TimeMode::Weekend);
        let text = serde_json::to_string(&state).expect("serialize");
        prop_assert_eq!(parse_state(&text), Some(state));
    }
}
