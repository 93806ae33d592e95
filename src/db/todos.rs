use super::{format_timestamp, inserted_id, optional_timestamp_at, timestamp_at, Assignments, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{NewTodo, Todo, TodoPatch};
use rusqlite::{params, Connection, OptionalExtension};

const SELECT_TODO: &str =
    "SELECT id, title, content, priority, finished, created_at, completed_at, idea_id FROM todos";
const DEFAULT_PRIORITY: i64 = 2;

impl Database {
    pub fn list_todos(&self) -> AppResult<Vec<Todo>> {
        let conn = self.conn()?;
        let mut statement = conn.prepare(&format!("{} ORDER BY created_at DESC, id DESC", SELECT_TODO))?;
        let todos = statement
            .query_map([], parse_todo_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    pub fn get_todo(&self, id: i64) -> AppResult<Option<Todo>> {
        let conn = self.conn()?;
        todo_by_id(&conn, id)
    }

    pub fn create_todo(&self, todo: NewTodo) -> AppResult<Todo> {
        // Zero is treated like "unset", same as an omitted priority.
        let priority = todo.priority.filter(|value| *value != 0).unwrap_or(DEFAULT_PRIORITY);

        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT INTO todos (title, content, priority, finished, idea_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![todo.title, todo.content, priority, todo.finished, todo.idea_id],
        )?;
        let id = inserted_id(&conn, changed, "todo")?;

        tracing::debug!(id, "todo created");
        todo_by_id(&conn, id)?.ok_or_else(|| AppError::CreateFailed(format!("todo {} not readable after insert", id)))
    }

    pub fn update_todo(&self, id: i64, patch: TodoPatch) -> AppResult<()> {
        let mut assignments = Assignments::new();
        if let Some(title) = patch.title {
            assignments.set("title", title);
        }
        if let Some(content) = patch.content {
            assignments.set("content", content);
        }
        if let Some(priority) = patch.priority {
            assignments.set("priority", priority);
        }
        if let Some(finished) = patch.finished {
            assignments.set("finished", finished);
        }
        if let Some(completed_at) = patch.completed_at {
            assignments.set("completed_at", completed_at.as_ref().map(format_timestamp));
        }
        if assignments.is_empty() {
            return Ok(());
        }

        let conn = self.conn()?;
        assignments.apply(&conn, "todos", id)?;
        Ok(())
    }

    pub fn delete_todo(&self, id: i64) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM todos WHERE id = ?1", [id])?;
        Ok(())
    }
}

fn todo_by_id(conn: &Connection, id: i64) -> AppResult<Option<Todo>> {
    conn.query_row(&format!("{} WHERE id = ?1", SELECT_TODO), [id], parse_todo_row)
        .optional()
        .map_err(AppError::from)
}

fn parse_todo_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        priority: row.get::<_, Option<i64>>(3)?.unwrap_or(DEFAULT_PRIORITY),
        finished: row.get::<_, Option<i64>>(4)?.unwrap_or(0) != 0,
        created_at: timestamp_at(row, 5)?,
        completed_at: optional_timestamp_at(row, 6)?,
        idea_id: row.get(7)?,
    })
}
