use crate::model::{
    LayoutMode, Seat, Student, TimeModeConfig, ARC_ROWS, ARC_ROW_WIDTH, GROUP_SIZE, MAX_GROUPS,
    MIN_GROUPS, THREE_ROWS, THREE_ROWS_DEFAULT_BASIS, THREE_ROWS_MAX_COLS,
};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetrics {
    pub rows: usize,
    pub cols: usize,
    pub group_count: usize,
    pub capacity: usize,
}

pub fn get_layout_metrics(mode: LayoutMode, student_count: usize) -> LayoutMetrics {
    match mode {
        LayoutMode::Groups => {
            let group_count = student_count.div_ceil(GROUP_SIZE).clamp(MIN_GROUPS, MAX_GROUPS);
            // Capacity stays at the full 6x6 so group numbering never shifts
            // when the roster grows or shrinks.
            LayoutMetrics {
                rows: group_count * 3,
                cols: 2,
                group_count,
                capacity: GROUP_SIZE * MAX_GROUPS,
            }
        }
        LayoutMode::Arc => LayoutMetrics {
            rows: ARC_ROWS,
            cols: ARC_ROW_WIDTH,
            group_count: 0,
            capacity: ARC_ROWS * ARC_ROW_WIDTH,
        },
        LayoutMode::ThreeRows => {
            let basis = if student_count > 0 {
                student_count
            } else {
                THREE_ROWS_DEFAULT_BASIS
            };
            let cols = basis.div_ceil(THREE_ROWS).clamp(1, THREE_ROWS_MAX_COLS);
            LayoutMetrics {
                rows: THREE_ROWS,
                cols,
                group_count: 0,
                capacity: THREE_ROWS * cols,
            }
        }
    }
}

/// Physical group slots that hold students for a given group count.
///
/// With exactly four groups slot 3 is skipped, so the tables read 1, 2, 3, 5.
pub fn get_active_group_indices(group_count: usize) -> Vec<usize> {
    if group_count == 4 {
        return vec![0, 1, 2, 4];
    }
    (0..group_count.min(MAX_GROUPS)).collect()
}

/// Seated ids in seat order, then everyone else in roster order.
///
/// Empty seats, ids missing from the roster and repeated ids are skipped.
pub fn ordered_ids_from_seats(students: &[Student], seats: &[Seat]) -> Vec<String> {
    let roster: HashSet<&str> = students.iter().map(|s| s.id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out: Vec<String> = Vec::with_capacity(students.len());

    for id in seats.iter().flatten() {
        if roster.contains(id.as_str()) && seen.insert(id.as_str()) {
            out.push(id.clone());
        }
    }
    for s in students {
        if seen.insert(s.id.as_str()) {
            out.push(s.id.clone());
        }
    }
    out
}

pub fn seats_from_order(ids: &[String], capacity: usize) -> Vec<Seat> {
    let mut seats: Vec<Seat> = vec![None; capacity];
    for (slot, id) in seats.iter_mut().zip(ids) {
        *slot = Some(id.clone());
    }
    seats
}

/// Column order for centered placement: the two middle columns first, then
/// alternating outwards, left side first.
pub fn centered_columns(width: usize) -> Vec<usize> {
    let mut order: Vec<usize> = Vec::with_capacity(width);
    if width == 0 {
        return order;
    }
    // Signed so the left pointer can step past column 0.
    let mut left = ((width - 1) / 2) as isize;
    let mut right = left + 1;
    let width = width as isize;
    let mut take_left = true;
    while left >= 0 || right < width {
        if (take_left && left >= 0) || right >= width {
            order.push(left as usize);
            left -= 1;
        } else {
            order.push(right as usize);
            right += 1;
        }
        take_left = !take_left;
    }
    order
}

/// Fills one row outward from its two middle columns, left side first.
pub fn place_centered(seats: &mut [Seat], ids: &[String], row_start: usize, row_width: usize) {
    if row_width == 0 || row_start >= seats.len() {
        return;
    }
    let row_width = row_width.min(seats.len() - row_start);
    let row = &mut seats[row_start..row_start + row_width];
    for (col, id) in centered_columns(row_width).into_iter().zip(ids) {
        row[col] = Some(id.clone());
    }
}

/// Arc grid for an ordered id list: first half centered in row 0, the rest in row 1.
pub fn arc_seats_from_order(ids: &[String]) -> Vec<Seat> {
    let mut seats: Vec<Seat> = vec![None; ARC_ROWS * ARC_ROW_WIDTH];
    let split = ids.len().div_ceil(2);
    let (front, back) = ids.split_at(split);
    place_centered(&mut seats, front, 0, ARC_ROW_WIDTH);
    place_centered(&mut seats, back, ARC_ROW_WIDTH, ARC_ROW_WIDTH);
    seats
}

/// Grid for an ordered id list under `mode`, sized for `student_count`.
pub fn seats_for_mode(mode: LayoutMode, ids: &[String], student_count: usize) -> Vec<Seat> {
    match mode {
        LayoutMode::Arc => arc_seats_from_order(ids),
        LayoutMode::Groups | LayoutMode::ThreeRows => {
            seats_from_order(ids, get_layout_metrics(mode, student_count).capacity)
        }
    }
}

/// Group grid from per-slot member lists; slot `g` fills seats `g*6..g*6+6`.
///
/// Slots past the sixth and members past the sixth in a slot are ignored,
/// as are ids already seated.
pub fn seats_from_groups(groups: &[Vec<String>]) -> Vec<Seat> {
    let mut seats: Vec<Seat> = vec![None; GROUP_SIZE * MAX_GROUPS];
    let mut seated: HashSet<&str> = HashSet::new();
    for (g, members) in groups.iter().enumerate().take(MAX_GROUPS) {
        let mut k = 0;
        for id in members {
            if k >= GROUP_SIZE {
                break;
            }
            if !seated.insert(id.as_str()) {
                continue;
            }
            seats[g * GROUP_SIZE + k] = Some(id.clone());
            k += 1;
        }
    }
    seats
}

pub fn empty_config(mode: LayoutMode, student_count: usize) -> TimeModeConfig {
    let m = get_layout_metrics(mode, student_count);
    TimeModeConfig {
        layout_mode: mode,
        rows: m.rows,
        cols: m.cols,
        seats: vec![None; m.capacity],
        rotation_count: 0,
        week_label: String::new(),
        class_time: String::new(),
    }
}

/// Moves `config` onto `mode` for the given roster, keeping current
/// occupants in seat order and appending unseated students after them.
///
/// Rotation count and labels are carried over unchanged.
pub fn with_layout(config: &TimeModeConfig, mode: LayoutMode, students: &[Student]) -> TimeModeConfig {
    let m = get_layout_metrics(mode, students.len());
    let ordered = ordered_ids_from_seats(students, &config.seats);
    TimeModeConfig {
        layout_mode: mode,
        rows: m.rows,
        cols: m.cols,
        seats: seats_for_mode(mode, &ordered, students.len()),
        ..config.clone()
    }
}

/// Refreshes the cached geometry for the current roster size. Seats are only
/// re-laid when the capacity no longer matches, and then only the students
/// already seated are placed again.
pub fn refit_config(config: &TimeModeConfig, students: &[Student]) -> TimeModeConfig {
    let m = get_layout_metrics(config.layout_mode, students.len());
    let seats = if config.seats.len() == m.capacity {
        config.seats.clone()
    } else {
        let seated = seated_roster_ids(students, &config.seats);
        seats_for_mode(config.layout_mode, &seated, students.len())
    };
    TimeModeConfig {
        rows: m.rows,
        cols: m.cols,
        seats,
        ..config.clone()
    }
}

/// Roster ids in seat order, skipping strangers and repeats.
pub fn seated_roster_ids(students: &[Student], seats: &[Seat]) -> Vec<String> {
    let roster: HashSet<&str> = students.iter().map(|s| s.id.as_str()).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    seats
        .iter()
        .flatten()
        .filter(|id| roster.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Cleans `config` for the current roster without moving anyone who is
/// validly seated.
///
/// Ids missing from the roster and repeated ids are cleared, then unseated
/// students take free seats: active group slots first for groups, row-major
/// for three rows, and the emptier arc row from the middle outwards. When
/// the capacity changed the grid is laid out again with [`with_layout`].
pub fn tidy_config(config: &TimeModeConfig, students: &[Student]) -> TimeModeConfig {
    let m = get_layout_metrics(config.layout_mode, students.len());
    if config.seats.len() != m.capacity {
        return with_layout(config, config.layout_mode, students);
    }

    let roster: HashSet<&str> = students.iter().map(|s| s.id.as_str()).collect();
    let mut seated: HashSet<String> = HashSet::new();
    let mut seats: Vec<Seat> = config
        .seats
        .iter()
        .map(|slot| match slot {
            Some(id) if roster.contains(id.as_str()) && seated.insert(id.clone()) => Some(id.clone()),
            _ => None,
        })
        .collect();

    for s in students.iter().filter(|s| !seated.contains(&s.id)) {
        let Some(i) = next_free_seat(config.layout_mode, &seats, m.group_count) else {
            break;
        };
        seats[i] = Some(s.id.clone());
    }

    TimeModeConfig {
        rows: m.rows,
        cols: m.cols,
        seats,
        ..config.clone()
    }
}

fn next_free_seat(mode: LayoutMode, seats: &[Seat], group_count: usize) -> Option<usize> {
    let free = |i: &usize| seats.get(*i).is_some_and(|s| s.is_none());
    match mode {
        LayoutMode::Groups => get_active_group_indices(group_count)
            .into_iter()
            .flat_map(|g| g * GROUP_SIZE..(g + 1) * GROUP_SIZE)
            .chain(0..seats.len())
            .find(free),
        LayoutMode::ThreeRows => (0..seats.len()).find(free),
        LayoutMode::Arc => {
            let filled = |r: usize| {
                seats
                    .iter()
                    .skip(r * ARC_ROW_WIDTH)
                    .take(ARC_ROW_WIDTH)
                    .flatten()
                    .count()
            };
            let mut rows: Vec<usize> = (0..ARC_ROWS).collect();
            rows.sort_by_key(|r| filled(*r));
            let columns = centered_columns(ARC_ROW_WIDTH);
            rows.into_iter()
                .flat_map(|r| columns.iter().map(move |c| r * ARC_ROW_WIDTH + c))
                .find(free)
        }
    }
}
