use super::{inserted_id, timestamp_at, Assignments, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{Idea, IdeaPatch, IdeaStatus, NewIdea};
use rusqlite::{params, Connection, OptionalExtension};

const SELECT_IDEA: &str = "SELECT id, title, content, status, created_at FROM ideas";

impl Database {
    pub fn list_ideas(&self) -> AppResult<Vec<Idea>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_IDEA))?;
        let ideas = statement
            .query_map([], parse_idea_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ideas)
    }

    pub fn get_idea(&self, id: i64) -> AppResult<Option<Idea>> {
        let conn = self.conn()?;
        idea_by_id(&conn, id)
    }

    pub fn create_idea(&self, idea: NewIdea) -> AppResult<Idea> {
        let status = idea.status.unwrap_or_default();

        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT INTO ideas (title, content, status) VALUES (?1, ?2, ?3)",
            params![idea.title, idea.content, status.as_str()],
        )?;
        let id = inserted_id(&conn, changed, "idea")?;

        tracing::debug!(id, "idea created");
        idea_by_id(&conn, id)?.ok_or_else(|| AppError::CreateFailed(format!("idea {} not readable after insert", id)))
    }

    pub fn update_idea(&self, id: i64, patch: IdeaPatch) -> AppResult<()> {
        let mut assignments = Assignments::new();
        if let Some(title) = patch.title {
            assignments.set("title", title);
        }
        if let Some(content) = patch.content {
            assignments.set("content", content);
        }
        if let Some(status) = patch.status {
            assignments.set("status", status.as_str());
        }
        if assignments.is_empty() {
            return Ok(());
        }

        let conn = self.conn()?;
        assignments.apply(&conn, "ideas", id)?;
        Ok(())
    }

    pub fn delete_idea(&self, id: i64) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM ideas WHERE id = ?1", [id])?;
        Ok(())
    }
}

fn idea_by_id(conn: &Connection, id: i64) -> AppResult<Option<Idea>> {
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_IDEA), [id], parse_idea_row)
        .optional()
        .map_err(AppError::from)
}

fn parse_idea_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Idea> {
    let id: i64 = row.get(0)?;
    let status = match row.get::<_, Option<String>>(3)? {
        Some(raw) => IdeaStatus::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(id, status = %raw, "unknown idea status, reading as pending");
            IdeaStatus::default()
        }),
        None => IdeaStatus::default(),
    };
    Ok(Idea {
        id,
        title: row.get(1)?,
        content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        status,
        created_at: timestamp_at(row, 4)?,
    })
}
