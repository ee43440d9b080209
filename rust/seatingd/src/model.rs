use serde::{Deserialize, Serialize};

pub const MAX_STUDENTS: usize = 36;
pub const GROUP_SIZE: usize = 6;
pub const MAX_GROUPS: usize = 6;
pub const MIN_GROUPS: usize = 3;
pub const ARC_ROWS: usize = 2;
pub const ARC_ROW_WIDTH: usize = 18;
pub const THREE_ROWS: usize = 3;
pub const THREE_ROWS_MAX_COLS: usize = 12;
/// Headcount used to size an empty three-row room.
pub const THREE_ROWS_DEFAULT_BASIS: usize = 18;
pub const STATE_VERSION: u32 = 3;

/// One seat slot: a student id or empty.
pub type Seat = Option<String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutMode {
    #[default]
    Groups,
    ThreeRows,
    Arc,
}

impl LayoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Groups => "GROUPS",
            LayoutMode::ThreeRows => "THREE_ROWS",
            LayoutMode::Arc => "ARC",
        }
    }

    /// Accepts the persisted names plus the lowercase tags older files used.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GROUPS" | "CIRCULAR" => Some(LayoutMode::Groups),
            "THREE_ROWS" | "ROWS" => Some(LayoutMode::ThreeRows),
            "ARC" => Some(LayoutMode::Arc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    #[default]
    Weekday,
    Weekend,
}

impl TimeMode {
    pub const ALL: [TimeMode; 2] = [TimeMode::Weekday, TimeMode::Weekend];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeMode::Weekday => "weekday",
            TimeMode::Weekend => "weekend",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "weekday" => Some(TimeMode::Weekday),
            "weekend" => Some(TimeMode::Weekend),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeModeConfig {
    pub layout_mode: LayoutMode,
    pub rows: usize,
    pub cols: usize,
    pub seats: Vec<Seat>,
    pub rotation_count: u32,
    pub week_label: String,
    pub class_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: String,
    pub name: String,
    pub students: Vec<Student>,
    pub campus: String,
    pub building: String,
    pub room: String,
    pub side_notes: String,
    /// Milliseconds since the Unix epoch.
    pub updated_at: i64,
    pub weekday: TimeModeConfig,
    pub weekend: TimeModeConfig,
}

impl Classroom {
    pub fn config(&self, time_mode: TimeMode) -> &TimeModeConfig {
        match time_mode {
            TimeMode::Weekday => &self.weekday,
            TimeMode::Weekend => &self.weekend,
        }
    }

    pub fn config_mut(&mut self, time_mode: TimeMode) -> &mut TimeModeConfig {
        match time_mode {
            TimeMode::Weekday => &mut self.weekday,
            TimeMode::Weekend => &mut self.weekend,
        }
    }

    pub fn has_student(&self, student_id: &str) -> bool {
        self.students.iter().any(|s| s.id == student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub version: u32,
    pub classrooms: Vec<Classroom>,
    pub active_classroom_id: Option<String>,
    pub active_time_mode: TimeMode,
}

impl Default for AppState {
    fn default() -> Self {
        Self::empty()
    }
}

impl AppState {
    pub fn empty() -> Self {
        AppState {
            version: STATE_VERSION,
            classrooms: Vec::new(),
            active_classroom_id: None,
            active_time_mode: TimeMode::Weekday,
        }
    }

    pub fn find_classroom(&self, class_id: &str) -> Option<&Classroom> {
        self.classrooms.iter().find(|c| c.id == class_id)
    }

    /// Replaces the classroom with the same id, or appends it. The first
    /// classroom added becomes the active one.
    pub fn upsert_classroom(&self, classroom: Classroom) -> AppState {
        let mut next = self.clone();
        if next.active_classroom_id.is_none() {
            next.active_classroom_id = Some(classroom.id.clone());
        }
        match next.classrooms.iter_mut().find(|c| c.id == classroom.id) {
            Some(slot) => *slot = classroom,
            None => next.classrooms.push(classroom),
        }
        next
    }

    pub fn remove_classroom(&self, class_id: &str) -> AppState {
        let mut next = self.clone();
        next.classrooms.retain(|c| c.id != class_id);
        if next.active_classroom_id.as_deref() == Some(class_id) || next.classrooms.is_empty() {
            next.active_classroom_id = next.classrooms.first().map(|c| c.id.clone());
        }
        next
    }

    pub fn set_active_classroom(&self, class_id: &str) -> AppState {
        if self.find_classroom(class_id).is_none() {
            return self.clone();
        }
        let mut next = self.clone();
        next.active_classroom_id = Some(class_id.to_string());
        next
    }

    pub fn set_active_time_mode(&self, time_mode: TimeMode) -> AppState {
        let mut next = self.clone();
        next.active_time_mode = time_mode;
        next
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
