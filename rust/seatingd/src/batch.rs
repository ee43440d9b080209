//! Batch import of several classrooms from one pasted text.
//!
//! Blocks are separated by a line holding only `!`. Inside a block every
//! line is `key: value` (ASCII or full-width colon) or `Group N: a, b, c`.
//! A block needs a class name and at least one declared layout; failing
//! blocks are reported and the rest are still imported.

use crate::classroom::{
    change_layout_mode, create_classroom, dedupe_names, replace_students, update_classroom_info,
    update_time_mode_labels, ClassroomInfoPatch,
};
use crate::layout::{get_layout_metrics, seats_from_groups};
use crate::model::{Classroom, LayoutMode, Student, TimeMode, TimeModeConfig, MAX_GROUPS, MAX_STUDENTS};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

const MEMBER_DELIMITERS: [char; 5] = [',', '，', '、', ';', '；'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchBlockError {
    #[error("block {block}: missing class name")]
    MissingName { block: usize },
    #[error("block {block} ({name}): no weekday or weekend layout declared")]
    MissingLayout { block: usize, name: String },
}

impl BatchBlockError {
    pub fn block(&self) -> usize {
        match self {
            BatchBlockError::MissingName { block } | BatchBlockError::MissingLayout { block, .. } => *block,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchBlock {
    pub name: String,
    pub campus: String,
    pub building: String,
    pub room: String,
    pub side_notes: String,
    pub class_time: String,
    pub weekday_layout: Option<LayoutMode>,
    pub weekend_layout: Option<LayoutMode>,
    /// `(group number as written, members)`.
    pub groups: Vec<(usize, Vec<String>)>,
    pub students: Vec<String>,
}

impl BatchBlock {
    /// Roster in order of first appearance: group lines, then loose names.
    pub fn roster(&self) -> Vec<String> {
        let all: Vec<&String> = self
            .groups
            .iter()
            .flat_map(|(_, members)| members.iter())
            .chain(self.students.iter())
            .collect();
        let mut names = dedupe_names(&all);
        names.truncate(MAX_STUDENTS);
        names
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchImport {
    pub classrooms: Vec<Classroom>,
    pub errors: Vec<BatchBlockError>,
}

pub fn layout_from_token(token: &str) -> LayoutMode {
    let lower = token.to_lowercase();
    if token.contains("三排") || lower.contains("three") || lower.contains("rows") {
        LayoutMode::ThreeRows
    } else if token.contains("圆弧") || lower.contains("arc") {
        LayoutMode::Arc
    } else {
        LayoutMode::Groups
    }
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_members(s: &str) -> Vec<String> {
    s.split(MEMBER_DELIMITERS)
        .map(collapse)
        .filter(|m| !m.is_empty())
        .collect()
}

/// `Group 3: a, b`, `组3：a、b` or `第3组: a`.
fn parse_group_line(head: &str, rest: &str) -> Option<(usize, Vec<String>)> {
    let head = head.trim();
    let lower = head.to_lowercase();
    let number = if let Some(n) = lower.strip_prefix("group") {
        n.to_string()
    } else if let Some(n) = head.strip_prefix('第') {
        n.trim_end_matches('组').to_string()
    } else if let Some(n) = head.strip_prefix('组') {
        n.to_string()
    } else {
        return None;
    };
    let n = number.trim().parse::<usize>().ok()?;
    Some((n, split_members(rest)))
}

fn parse_block(lines: &[&str], block: usize) -> Result<BatchBlock, BatchBlockError> {
    let mut out = BatchBlock::default();
    for line in lines {
        let Some((head, rest)) = line.split_once([':', '：']) else {
            continue;
        };
        if let Some(group) = parse_group_line(head, rest) {
            out.groups.push(group);
            continue;
        }
        let value = collapse(rest);
        match head.trim().to_lowercase().as_str() {
            "班级名称" | "班级" | "class" | "class name" | "name" => out.name = value,
            "校区" | "campus" => out.campus = value,
            "楼层" | "building" => out.building = value,
            "教室" | "room" => out.room = value,
            "备注" | "notes" => out.side_notes = value,
            "时间" | "time" | "class time" => out.class_time = value,
            "周中布局" | "weekday layout" | "weekday" if !value.is_empty() => {
                out.weekday_layout = Some(layout_from_token(&value))
            }
            "周末布局" | "weekend layout" | "weekend" if !value.is_empty() => {
                out.weekend_layout = Some(layout_from_token(&value))
            }
            "学生" | "students" => out.students.extend(split_members(rest)),
            other => tracing::debug!(block, key = other, "ignoring unknown batch key"),
        }
    }

    if out.name.is_empty() {
        return Err(BatchBlockError::MissingName { block });
    }
    if out.weekday_layout.is_none() && out.weekend_layout.is_none() {
        return Err(BatchBlockError::MissingLayout {
            block,
            name: out.name,
        });
    }
    Ok(out)
}

/// Splits `text` into blocks and parses each. Block numbers are 1-based and
/// count only non-empty blocks.
pub fn parse_batch(text: &str) -> Vec<Result<BatchBlock, BatchBlockError>> {
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in text.trim_start_matches('\u{feff}').lines() {
        let t = line.trim();
        if !t.is_empty() && t.chars().all(|c| c == '!' || c == '！') {
            blocks.push(Vec::new());
        } else if !t.is_empty() {
            if let Some(cur) = blocks.last_mut() {
                cur.push(t);
            }
        }
    }
    blocks
        .into_iter()
        .filter(|b| !b.is_empty())
        .enumerate()
        .map(|(i, lines)| parse_block(&lines, i + 1))
        .collect()
}

/// Group seats for a parsed block: `Group N` fills slot `N-1`, anyone left
/// over takes the first free seats.
fn grouped_config(base: &TimeModeConfig, block: &BatchBlock, students: &[Student]) -> TimeModeConfig {
    let id_by_name: HashMap<&str, &str> = students
        .iter()
        .map(|s| (s.name.as_str(), s.id.as_str()))
        .collect();
    let mut slots: Vec<Vec<String>> = vec![Vec::new(); MAX_GROUPS];
    for (n, members) in &block.groups {
        if (1..=MAX_GROUPS).contains(n) {
            slots[n - 1].extend(members.iter().filter_map(|m| id_by_name.get(m.as_str())).map(|id| id.to_string()));
        }
    }
    let mut seats = seats_from_groups(&slots);

    let seated: HashSet<String> = seats.iter().flatten().cloned().collect();
    let mut leftovers = students.iter().filter(|s| !seated.contains(&s.id));
    for slot in seats.iter_mut().filter(|s| s.is_none()) {
        match leftovers.next() {
            Some(s) => *slot = Some(s.id.clone()),
            None => break,
        }
    }

    let m = get_layout_metrics(LayoutMode::Groups, students.len());
    TimeModeConfig {
        layout_mode: LayoutMode::Groups,
        rows: m.rows,
        cols: m.cols,
        seats,
        ..base.clone()
    }
}

pub fn build_classroom(block: &BatchBlock) -> Classroom {
    let c = create_classroom(&block.name);
    let c = update_classroom_info(
        &c,
        &ClassroomInfoPatch {
            campus: Some(block.campus.clone()),
            building: Some(block.building.clone()),
            room: Some(block.room.clone()),
            side_notes: Some(block.side_notes.clone()),
        },
    );
    let mut c = replace_students(&c, &block.roster(), TimeMode::Weekday);

    for (tm, declared) in [
        (TimeMode::Weekday, block.weekday_layout),
        (TimeMode::Weekend, block.weekend_layout),
    ] {
        let layout = declared.unwrap_or(LayoutMode::Groups);
        c = if layout == LayoutMode::Groups && !block.groups.is_empty() {
            let config = grouped_config(c.config(tm), block, &c.students);
            let mut next = c.clone();
            *next.config_mut(tm) = config;
            next
        } else {
            change_layout_mode(&c, layout, tm)
        };
        if declared.is_some() && !block.class_time.is_empty() {
            c = update_time_mode_labels(&c, tm, None, Some(&block.class_time));
        }
    }
    c
}

pub fn import_batch(text: &str) -> BatchImport {
    let mut out = BatchImport::default();
    for parsed in parse_batch(text) {
        match parsed {
            Ok(block) => out.classrooms.push(build_classroom(&block)),
            Err(e) => {
                tracing::warn!(error = %e, "batch block rejected");
                out.errors.push(e);
            }
        }
    }
    out
}
