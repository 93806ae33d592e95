use super::{format_timestamp, inserted_id, optional_timestamp_at, timestamp_at, Assignments, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{Bug, BugPatch, NewBug};
use rusqlite::{params, Connection, OptionalExtension};

const SELECT_BUG: &str =
    "SELECT id, title, description, fixed, created_at, completed_at, additional_info FROM bugs";

impl Database {
    pub fn list_bugs(&self) -> AppResult<Vec<Bug>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_BUG))?;
        let bugs = statement
            .query_map([], parse_bug_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bugs)
    }

    pub fn get_bug(&self, id: i64) -> AppResult<Option<Bug>> {
        let conn = self.conn()?;
        bug_by_id(&conn, id)
    }

    pub fn create_bug(&self, bug: NewBug) -> AppResult<Bug> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT INTO bugs (title, description, fixed, additional_info) VALUES (?1, ?2, ?3, ?4)",
            params![bug.title, bug.description, bug.fixed, bug.additional_info],
        )?;
        let id = inserted_id(&conn, changed, "bug")?;

        tracing::debug!(id, "bug created");
        bug_by_id(&conn, id)?.ok_or_else(|| AppError::CreateFailed(format!("bug {} not readable after insert", id)))
    }

    pub fn update_bug(&self, id: i64, patch: BugPatch) -> AppResult<()> {
        let mut assignments = Assignments::new();
        if let Some(title) = patch.title {
            assignments.set("title", title);
        }
        if let Some(description) = patch.description {
            assignments.set("description", description);
        }
        if let Some(fixed) = patch.fixed {
            assignments.set("fixed", fixed);
        }
        if let Some(completed_at) = patch.completed_at {
            assignments.set("completed_at", completed_at.as_ref().map(format_timestamp));
        }
        if let Some(additional_info) = patch.additional_info {
            assignments.set("additional_info", additional_info);
        }
        if assignments.is_empty() {
            return Ok(());
        }

        let conn = self.conn()?;
        assignments.apply(&conn, "bugs", id)?;
        Ok(())
    }

    pub fn delete_bug(&self, id: i64) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM bugs WHERE id = ?1", [id])?;
        Ok(())
    }
}

fn bug_by_id(conn: &Connection, id: i64) -> AppResult<Option<Bug>> {
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_BUG), [id], parse_bug_row)
        .optional()
        .map_err(AppError::from)
}

fn parse_bug_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bug> {
    Ok(Bug {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        fixed: row.get::<_, Option<i64>>(3)?.unwrap_or(0) != 0,
        created_at: timestamp_at(row, 4)?,
        completed_at: optional_timestamp_at(row, 5)?,
        additional_info: row.get(6)?,
    })
}
