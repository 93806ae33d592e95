use super::{timestamp_at, Database};
use crate::errors::{AppError, AppResult};
use crate::models::Progress;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

const SELECT_PROGRESS: &str = "SELECT id, date, content, created_at FROM progresses";

/// Progress entries are stored as a JSON array of strings in `progresses.content`.
pub fn encode_progress_entries(entries: &[String]) -> AppResult<String> {
    Ok(serde_json::to_string(entries)?)
}

pub fn decode_progress_entries(raw: &str) -> AppResult<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

impl Database {
    pub fn list_progress(&self) -> AppResult<Vec<Progress>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!("{} ORDER BY date DESC", SELECT_PROGRESS))?;
        let rows = statement
            .query_map([], parse_progress_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(StoredProgress::decode).collect()
    }

    pub fn progress_by_date(&self, date: NaiveDate) -> AppResult<Option<Progress>> {
        let conn = self.conn()?;
        progress_on(&conn, date)
    }

    /// Writes the log for `date`, replacing the whole row if that day already
    /// has one.
    pub fn create_or_update_progress(&self, date: NaiveDate, entries: &[String]) -> AppResult<Progress> {
        let content = encode_progress_entries(entries)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO progresses (date, content) VALUES (?1, ?2)",
            params![date, content],
        )?;

        tracing::debug!(date = %date, entries = entries.len(), "progress saved");
        progress_on(&conn, date)?
            .ok_or_else(|| AppError::CreateFailed(format!("Failed to create/update progress for {}", date)))
    }

    pub fn delete_progress(&self, id: i64) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM progresses WHERE id = ?1", [id])?;
        Ok(())
    }
}

fn progress_on(conn: &Connection, date: NaiveDate) -> AppResult<Option<Progress>> {
    conn.query_row(&format!("{} WHERE date = ?1", SELECT_PROGRESS), [date], parse_progress_row)
        .optional()?
        .map(StoredProgress::decode)
        .transpose()
}

// Entries are decoded after the query; a corrupt blob is an `Internal` error.
struct StoredProgress {
    id: i64,
    date: NaiveDate,
    content: String,
    created_at: DateTime<Utc>,
}

impl StoredProgress {
    fn decode(self) -> AppResult<Progress> {
        Ok(Progress {
            id: self.id,
            date: self.date,
            content: decode_progress_entries(&self.content)?,
            created_at: self.created_at,
        })
    }
}

fn parse_progress_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredProgress> {
    Ok(StoredProgress {
        id: row.get(0)?,
        date: row.get(1)?,
        content: row.get(2)?,
        created_at: timestamp_at(row, 3)?,
    })
}
