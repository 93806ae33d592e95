use super::{inserted_id, timestamp_at, Assignments, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{NewNote, Note, NotePatch};
use rusqlite::{params, Connection, OptionalExtension};

const SELECT_NOTE: &str = "SELECT id, title, content, created_at, last_modified FROM notes";

impl Database {
    /// Most recently edited first.
    pub fn list_notes(&self) -> AppResult<Vec<Note>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!("{} ORDER BY last_modified DESC, id DESC", SELECT_NOTE))?;
        let notes = statement
            .query_map([], parse_note_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    pub fn get_note(&self, id: i64) -> AppResult<Option<Note>> {
        let conn = self.conn()?;
        note_by_id(&conn, id)
    }

    pub fn create_note(&self, note: NewNote) -> AppResult<Note> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT INTO notes (title, content) VALUES (?1, ?2)",
            params![note.title, note.content],
        )?;
        let id = inserted_id(&conn, changed, "note")?;

        tracing::debug!(id, "note created");
        note_by_id(&conn, id)?.ok_or_else(|| AppError::CreateFailed(format!("note {} not readable after insert", id)))
    }

    /// `last_modified` moves only when the content changes; a title-only patch
    /// leaves it alone.
    pub fn update_note(&self, id: i64, patch: NotePatch) -> AppResult<()> {
        let mut assignments = Assignments::new();
        if let Some(title) = patch.title {
            assignments.set("title", title);
        }
        if let Some(content) = patch.content {
            assignments.set("content", content);
            assignments.set_current_timestamp("last_modified");
        }
        if assignments.is_empty() {
            return Ok(());
        }

        let conn = self.conn()?;
        assignments.apply(&conn, "notes", id)?;
        Ok(())
    }

    pub fn delete_note(&self, id: i64) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        Ok(())
    }
}

fn note_by_id(conn: &Connection, id: i64) -> AppResult<Option<Note>> {
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_NOTE), [id], parse_note_row)
        .optional()
        .map_err(AppError::from)
}

fn parse_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        created_at: timestamp_at(row, 3)?,
        last_modified: timestamp_at(row, 4)?,
    })
}
