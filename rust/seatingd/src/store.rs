use crate::legacy;
use crate::model::AppState;
use crate::normalize;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub const DB_FILE: &str = "seatingd.sqlite3";
pub const STATE_KEY: &str = "seating-chart-state";
pub const LEGACY_KEY: &str = "seating-chart-legacy";

pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    pub fn open(workspace: &Path) -> anyhow::Result<Store> {
        std::fs::create_dir_all(workspace).with_context(|| {
            format!("failed to create workspace {}", workspace.to_string_lossy())
        })?;
        let path = workspace.join(DB_FILE);
        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open {}", path.to_string_lossy()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create kv_store table")?;
        tracing::info!(path = %path.to_string_lossy(), "store opened");
        Ok(Store { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |r| r.get(0))
            .optional()
            .with_context(|| format!("failed to read key {key}"))
    }

    pub fn put_raw(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO kv_store(key, value, updated_at) VALUES(?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value, &now),
            )
            .with_context(|| format!("failed to write key {key}"))?;
        Ok(())
    }

    /// Loads the persisted state, migrating a legacy export on first run.
    ///
    /// A corrupt primary document yields an empty state rather than an error.
    pub fn load_state(&self) -> anyhow::Result<AppState> {
        if let Some(text) = self.get_raw(STATE_KEY)? {
            return Ok(match normalize::parse_state(&text) {
                Some(state) => {
                    tracing::info!(classrooms = state.classrooms.len(), "state loaded");
                    state
                }
                None => {
                    tracing::warn!("persisted state is not valid JSON; starting empty");
                    AppState::empty()
                }
            });
        }

        if let Some(text) = self.get_raw(LEGACY_KEY)? {
            let value: serde_json::Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "legacy data is not valid JSON; ignoring");
                    return Ok(AppState::empty());
                }
            };
            let state = legacy::migrate_legacy(&value);
            self.save_state(&state)
                .context("failed to save migrated legacy state")?;
            return Ok(state);
        }

        Ok(AppState::empty())
    }

    pub fn save_state(&self, state: &AppState) -> anyhow::Result<()> {
        let text = serde_json::to_string(state).context("failed to serialize state")?;
        self.put_raw(STATE_KEY, &text)
    }
}
