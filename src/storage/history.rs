// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Event history using SQLite.

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::emergency::EmergencyListener;

/// A single history entry.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub timestamp: DateTime<Local>,
    pub kind: EventKind,
    pub detail: String,
}

/// Type of history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Connected,
    Disconnected,
    Emergency,
    Danger,
    Error,
}

impl EventKind {
    fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connected => "CONNECTED",
            EventKind::Disconnected => "DISCONNECTED",
            EventKind::Emergency => "EMERGENCY",
            EventKind::Danger => "DANGER",
            EventKind::Error => "ERROR",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "CONNECTED" => EventKind::Connected,
            "DISCONNECTED" => EventKind::Disconnected,
            "EMERGENCY" => EventKind::Emergency,
            "DANGER" => EventKind::Danger,
            _ => EventKind::Error,
        }
    }
}

/// History database manager.
#[derive(Clone)]
pub struct EventHistory {
    conn: Arc<Mutex<Connection>>,
    max_entries: u32,
}

impl EventHistory {
    /// Create or open history database.
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("history.db");
        info!("Opening history database: {:?}", db_path);

        let conn = Connection::open(&db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                kind TEXT NOT NULL,
                detail TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp DESC)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            max_entries: 10000,
        })
    }

    /// Set maximum number of entries to keep.
    pub fn set_max_entries(&mut self, max: u32) {
        self.max_entries = max;
    }

    /// Record an event.
    pub fn add_entry(&self, kind: EventKind, detail: &str) -> Result<()> {
        let conn = self.conn.lock();
        let timestamp = Local::now().timestamp();

        conn.execute(
            "INSERT INTO events (timestamp, kind, detail) VALUES (?1, ?2, ?3)",
            params![timestamp, kind.as_str(), detail],
        )?;

        self.cleanup_old_entries(&conn)?;

        Ok(())
    }

    /// Get recent entries, newest first.
    pub fn get_recent(&self, limit: u32) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, kind, detail
             FROM events
             ORDER BY timestamp DESC, id DESC
             LIMIT ?1",
        )?;

        let entries = stmt
            .query_map([limit], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Get recent entries of one kind, newest first.
    pub fn get_recent_of_kind(&self, kind: EventKind, limit: u32) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, kind, detail
             FROM events
             WHERE kind = ?1
             ORDER BY timestamp DESC, id DESC
             LIMIT ?2",
        )?;

        let entries = stmt
            .query_map(params![kind.as_str(), limit], Self::entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Clear all history.
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM events", [])?;
        info!("History cleared");
        Ok(())
    }

    /// Get total entry count.
    pub fn count(&self) -> Result<u32> {
        let conn = self.conn.lock();
        let count: u32 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count)
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
        let timestamp_secs: i64 = row.get(1)?;
        let kind_str: String = row.get(2)?;

        Ok(HistoryEntry {
            id: row.get(0)?,
            timestamp: Local
                .timestamp_opt(timestamp_secs, 0)
                .earliest()
                .unwrap_or_else(Local::now),
            kind: EventKind::from_str(&kind_str),
            detail: row.get(3)?,
        })
    }

    /// Remove old entries beyond max_entries.
    fn cleanup_old_entries(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "DELETE FROM events WHERE id NOT IN (
                SELECT id FROM events ORDER BY timestamp DESC, id DESC LIMIT ?1
            )",
            [self.max_entries],
        )?;
        Ok(())
    }
}

impl EmergencyListener for EventHistory {
    fn on_emergency(&self) -> Result<()> {
        self.add_entry(EventKind::Emergency, "Emergency call triggered")
    }
}
