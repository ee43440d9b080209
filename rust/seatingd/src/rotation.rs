//! Per-layout rotation moves.
//!
//! Every move keeps the layout's structure: groups rotate internally, the
//! three-row layout rotates each half-row and then shifts whole rows, and the
//! arc rotates each row and re-centers it. The counter drives the display
//! helpers at the bottom of this module.

use crate::layout::{get_active_group_indices, get_layout_metrics, place_centered, tidy_config};
use crate::model::{
    LayoutMode, Seat, Student, TimeModeConfig, ARC_ROWS, ARC_ROW_WIDTH, GROUP_SIZE, MAX_GROUPS,
    THREE_ROWS,
};
use std::collections::HashSet;

/// Occupants of `slots` in order, moved one position (first goes last).
fn rotate_occupants(slots: &[Seat]) -> Vec<String> {
    let mut occupants: Vec<String> = slots.iter().flatten().cloned().collect();
    if occupants.len() >= 2 {
        occupants.rotate_left(1);
    }
    occupants
}

/// Rotates the occupants of `slots` and packs them to the front.
fn rotate_in_place(slots: &mut [Seat]) {
    let occupants = rotate_occupants(slots);
    for (i, slot) in slots.iter_mut().enumerate() {
        *slot = occupants.get(i).cloned();
    }
}

pub fn occupied_count(students: &[Student], seats: &[Seat]) -> usize {
    let roster: HashSet<&str> = students.iter().map(|s| s.id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    seats
        .iter()
        .flatten()
        .filter(|id| roster.contains(id.as_str()) && seen.insert(id.as_str()))
        .count()
}

/// One rotation step for `config`. Returns the input untouched when fewer
/// than two seats are occupied.
pub fn rotate_config(config: &TimeModeConfig, students: &[Student]) -> TimeModeConfig {
    if occupied_count(students, &config.seats) < 2 {
        tracing::debug!(layout = config.layout_mode.as_str(), "rotation skipped: fewer than two occupants");
        return config.clone();
    }

    let current = tidy_config(config, students);
    let mut next = match current.layout_mode {
        LayoutMode::Groups => rotate_groups(&current, students.len()),
        LayoutMode::ThreeRows => rotate_three_rows(&current),
        LayoutMode::Arc => rotate_arc(&current),
    };
    next.rotation_count = current.rotation_count.saturating_add(1);
    next
}

fn rotate_groups(config: &TimeModeConfig, student_count: usize) -> TimeModeConfig {
    let group_count = get_layout_metrics(LayoutMode::Groups, student_count).group_count;
    let mut seats = config.seats.clone();
    for g in get_active_group_indices(group_count) {
        let start = g * GROUP_SIZE;
        let end = (start + GROUP_SIZE).min(seats.len());
        if start < end {
            rotate_in_place(&mut seats[start..end]);
        }
    }
    TimeModeConfig {
        seats,
        ..config.clone()
    }
}

fn rotate_three_rows(config: &TimeModeConfig) -> TimeModeConfig {
    let cols = config.cols.max(1);
    let left_width = cols.div_ceil(2);

    let mut rows: Vec<Vec<Seat>> = (0..THREE_ROWS)
        .map(|r| {
            let mut row: Vec<Seat> = vec![None; cols];
            for (c, slot) in row.iter_mut().enumerate() {
                *slot = config.seats.get(r * cols + c).cloned().flatten();
            }
            row
        })
        .collect();

    for row in rows.iter_mut() {
        let (left, right) = row.split_at_mut(left_width);
        rotate_in_place(left);
        rotate_in_place(right);
    }

    // Old row 1 moves to the front, old row 0 goes to the back.
    rows.rotate_left(1);

    TimeModeConfig {
        seats: rows.into_iter().flatten().collect(),
        ..config.clone()
    }
}

fn rotate_arc(config: &TimeModeConfig) -> TimeModeConfig {
    let mut seats: Vec<Seat> = vec![None; ARC_ROWS * ARC_ROW_WIDTH];
    for r in 0..ARC_ROWS {
        let start = r * ARC_ROW_WIDTH;
        let end = (start + ARC_ROW_WIDTH).min(config.seats.len());
        if start >= end {
            continue;
        }
        let occupants = rotate_occupants(&config.seats[start..end]);
        place_centered(&mut seats, &occupants, start, ARC_ROW_WIDTH);
    }
    TimeModeConfig {
        seats,
        ..config.clone()
    }
}

/// Which group's data each physical table shows after `rotation_count` steps.
///
/// `mapping[table] = group`. Active tables cycle through the active groups;
/// inactive tables map to themselves. Seat data is never moved by this.
pub fn get_rotation_mapping(group_count: usize, rotation_count: u32) -> Vec<usize> {
    let mut mapping: Vec<usize> = (0..MAX_GROUPS).collect();
    let active = get_active_group_indices(group_count);
    let n = active.len();
    if n == 0 {
        return mapping;
    }
    let shift = rotation_count as usize % n;
    for (i, &table) in active.iter().enumerate() {
        mapping[table] = active[(i + n - shift) % n];
    }
    mapping
}

/// Color indices for `[row0-left, row0-right, row1-left, row1-right, row2-left, row2-right]`.
pub fn get_three_rows_color_order(rotation_count: u32) -> [u8; 6] {
    let mut order: [u8; 6] = [1, 2, 3, 4, 5, 6];
    for _ in 0..(rotation_count % 3) {
        order.rotate_left(2);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::empty_config;

    fn roster(n: usize) -> Vec<Student> {
        (0..n)
            .map(|i| Student {
                id: format!("s{i}"),
                name: format!("Student {i}"),
            })
            .collect()
    }

    fn seat(id: &str) -> Seat {
        Some(id.to_string())
    }

    #[test]
    fn single_occupant_is_a_no_op() {
        let students = roster(1);
        let mut config = empty_config(LayoutMode::Groups, 1);
        config.seats[0] = seat("s0");
        config.rotation_count = 2;
        assert_eq!(rotate_config(&config, &students), config);

        let empty = empty_config(LayoutMode::Arc, 0);
        assert_eq!(rotate_config(&empty, &[]), empty);
    }

    #[test]
    fn stale_ids_do_not_count_as_occupants() {
        let students = roster(1);
        let mut config = empty_config(LayoutMode::Groups, 1);
        config.seats[0] = seat("s0");
        config.seats[1] = seat("gone");
        assert_eq!(rotate_config(&config, &students), config);
    }

    #[test]
    fn groups_rotate_within_each_group() {
        let students = roster(8);
        let mut config = empty_config(LayoutMode::Groups, 8);
        for (i, s) in students.iter().enumerate() {
            config.seats[i] = Some(s.id.clone());
        }
        let next = rotate_config(&config, &students);
        assert_eq!(next.rotation_count, 1);
        let g0: Vec<&str> = next.seats[..6].iter().flatten().map(|s| s.as_str()).collect();
        assert_eq!(g0, vec!["s1", "s2", "s3", "s4", "s5", "s0"]);
        assert_eq!(next.seats[6].as_deref(), Some("s7"));
        assert_eq!(next.seats[7].as_deref(), Some("s6"));
    }

    #[test]
    fn two_occupants_cycle_back_after_two_rotations() {
        let students = roster(2);
        let mut config = empty_config(LayoutMode::Groups, 2);
        config.seats[0] = seat("s0");
        config.seats[1] = seat("s1");

        let once = rotate_config(&config, &students);
        assert_eq!(once.seats[0].as_deref(), Some("s1"));
        let twice = rotate_config(&once, &students);
        assert_eq!(twice.seats, config.seats);
        assert_eq!(twice.rotation_count, 2);
    }

    #[test]
    fn three_rows_shift_rows_and_halves() {
        // 18 students: cols = 6, left half = 3 seats.
        let students = roster(18);
        let mut config = empty_config(LayoutMode::ThreeRows, 18);
        for (i, s) in students.iter().enumerate() {
            config.seats[i] = Some(s.id.clone());
        }
        let next = rotate_config(&config, &students);
        let ids: Vec<&str> = next.seats.iter().map(|s| s.as_deref().unwrap_or("")).collect();
        assert_eq!(
            ids,
            vec![
                "s7", "s8", "s6", "s10", "s11", "s9", // old row 1
                "s13", "s14", "s12", "s16", "s17", "s15", // old row 2
                "s1", "s2", "s0", "s4", "s5", "s3", // old row 0
            ]
        );
    }

    #[test]
    fn three_rows_front_row_moves_to_back() {
        let students = roster(16);
        let mut config = empty_config(LayoutMode::ThreeRows, 16);
        assert_eq!(config.cols, 6);
        config.seats[0] = seat("s0");
        config.seats[3] = seat("s1");
        config.seats[6] = seat("s2");
        config.seats[12] = seat("s3");
        let rotated = rotate_config(&config, &students);
        let back_row: Vec<&str> = rotated.seats[12..18].iter().flatten().map(|s| s.as_str()).collect();
        assert!(back_row.contains(&"s0"));
        assert!(back_row.contains(&"s1"));
    }

    #[test]
    fn arc_rotates_and_recenters_each_row() {
        let students = roster(3);
        let mut config = empty_config(LayoutMode::Arc, 3);
        config.seats[8] = seat("s0");
        config.seats[9] = seat("s1");
        config.seats[26] = seat("s2");

        let next = rotate_config(&config, &students);
        assert_eq!(next.seats[8].as_deref(), Some("s1"));
        assert_eq!(next.seats[9].as_deref(), Some("s0"));
        assert_eq!(next.seats[26].as_deref(), Some("s2"));
        assert_eq!(next.rotation_count, 1);
    }

    #[test]
    fn gapped_groups_keep_their_members() {
        let students = roster(4);
        let mut config = empty_config(LayoutMode::Groups, 4);
        config.seats[0] = seat("s0");
        config.seats[1] = seat("s1");
        config.seats[6] = seat("s2");
        config.seats[7] = seat("s3");

        let next = rotate_config(&config, &students);
        assert_eq!(next.seats[0].as_deref(), Some("s1"));
        assert_eq!(next.seats[1].as_deref(), Some("s0"));
        assert_eq!(next.seats[6].as_deref(), Some("s3"));
        assert_eq!(next.seats[7].as_deref(), Some("s2"));
        assert_eq!(next.seats.iter().flatten().count(), 4);
    }

    #[test]
    fn hand_placed_group_member_stays_in_its_group() {
        let students = roster(3);
        let mut config = empty_config(LayoutMode::Groups, 3);
        config.seats[0] = seat("s0");
        config.seats[1] = seat("s1");
        config.seats[15] = seat("s2");

        let next = rotate_config(&config, &students);
        let g2: Vec<&str> = next.seats[12..18].iter().flatten().map(|s| s.as_str()).collect();
        assert_eq!(g2, vec!["s2"]);
        assert_eq!(next.seats[0].as_deref(), Some("s1"));
    }

    #[test]
    fn uneven_arc_rows_rotate_independently() {
        let students = roster(4);
        let mut config = empty_config(LayoutMode::Arc, 4);
        config.seats[8] = seat("s0");
        config.seats[9] = seat("s1");
        config.seats[10] = seat("s2");
        config.seats[26] = seat("s3");

        let next = rotate_config(&config, &students);
        assert_eq!(next.seats[..18].iter().flatten().count(), 3);
        assert_eq!(next.seats[18..].iter().flatten().count(), 1);
        assert_eq!(next.seats[8].as_deref(), Some("s1"));
        assert_eq!(next.seats[9].as_deref(), Some("s2"));
        assert_eq!(next.seats[7].as_deref(), Some("s0"));
        assert_eq!(next.seats[26].as_deref(), Some("s3"));
    }

    #[test]
    fn unseated_students_join_before_rotating() {
        let students = roster(3);
        let mut config = empty_config(LayoutMode::Groups, 3);
        config.seats[6] = seat("s0");
        config.seats[7] = seat("s1");
        config.seats[8] = seat("gone");

        let next = rotate_config(&config, &students);
        assert_eq!(next.seats.iter().flatten().count(), 3);
        assert_eq!(next.seats[0].as_deref(), Some("s2"));
        let g1: Vec<&str> = next.seats[6..12].iter().flatten().map(|s| s.as_str()).collect();
        assert_eq!(g1, vec!["s1", "s0"]);
    }

    #[test]
    fn rotation_mapping_cycles_active_tables() {
        assert_eq!(get_rotation_mapping(3, 0), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(get_rotation_mapping(3, 1), vec![2, 0, 1, 3, 4, 5]);
        assert_eq!(get_rotation_mapping(4, 1), vec![4, 0, 1, 3, 2, 5]);
        assert_eq!(get_rotation_mapping(4, 4), get_rotation_mapping(4, 0));
        assert_eq!(get_rotation_mapping(6, 2), vec![4, 5, 0, 1, 2, 3]);
    }

    #[test]
    fn color_order_repeats_every_three_steps() {
        assert_eq!(get_three_rows_color_order(0), [1, 2, 3, 4, 5, 6]);
        assert_eq!(get_three_rows_color_order(1), [3, 4, 5, 6, 1, 2]);
        assert_eq!(get_three_rows_color_order(2), [5, 6, 1, 2, 3, 4]);
        assert_eq!(get_three_rows_color_order(3), get_three_rows_color_order(0));
    }
}
