use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

mod blocks;
mod bugs;
mod ideas;
mod notes;
mod progress;
mod todos;

pub use progress::{decode_progress_entries, encode_progress_entries};

const SCHEMA_SQL: &str = include_str!("schema.sql");
const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A project file opened as a SQLite database.
///
/// The connection is guarded by a mutex so at most one statement is in flight
/// at a time, whichever thread the caller runs on.
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) the project file, ensures every table exists
    /// and purges blocks left over from previous days.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        let db = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };
        db.prepare()?;

        tracing::info!(path = %path.to_string_lossy(), "project database opened");
        Ok(db)
    }

    /// Schema check plus block retention purge. Idempotent.
    pub fn prepare(&self) -> AppResult<()> {
        {
            let conn = self.conn()?;
            conn.execute_batch(SCHEMA_SQL)?;
        }

        let purged = self.purge_blocks_before(local_today())?;
        if purged > 0 {
            tracing::info!(count = purged, "purged blocks from previous days");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn daily_cleanup(&self) -> AppResult<u64> {
        self.purge_blocks_before(local_today())
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

/// Column assignments for a partial `UPDATE`. Only fields that are present in
/// a patch get added, so an empty patch produces no statement at all.
struct Assignments {
    clauses: Vec<String>,
    values: Vec<Box<dyn ToSql>>,
}

impl Assignments {
    fn new() -> Self {
        Self {
            clauses: Vec::new(),
            values: Vec::new(),
        }
    }

    fn set<T: ToSql + 'static>(&mut self, column: &str, value: T) {
        self.values.push(Box::new(value));
        self.clauses.push(format!("{} = ?{}", column, self.values.len()));
    }

    fn set_current_timestamp(&mut self, column: &str) {
        self.clauses.push(format!("{} = CURRENT_TIMESTAMP", column));
    }

    fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn apply<K: ToSql + 'static>(mut self, conn: &Connection, table: &str, key: K) -> AppResult<usize> {
        if self.is_empty() {
            return Ok(0);
        }

        self.values.push(Box::new(key));
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            self.clauses.join(", "),
            self.values.len()
        );
        let params: Vec<&dyn ToSql> = self.values.iter().map(|value| value.as_ref()).collect();
        Ok(conn.execute(&sql, params.as_slice())?)
    }
}

fn inserted_id(conn: &Connection, changed: usize, entity: &str) -> AppResult<i64> {
    let id = conn.last_insert_rowid();
    if changed == 0 || id == 0 {
        return Err(AppError::CreateFailed(format!(
            "Failed to create {}: no ID returned",
            entity
        )));
    }
    Ok(id)
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format(SQLITE_TIMESTAMP_FORMAT).to_string()
}

// SQLite's CURRENT_TIMESTAMP yields `YYYY-MM-DD HH:MM:SS` in UTC; RFC 3339 is
// accepted too for files written by other tools.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|error| format!("invalid timestamp '{}': {}", raw, error))
}

fn timestamp_at(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    parse_timestamp(&raw).map_err(|message| conversion_error(index, message))
}

fn optional_timestamp_at(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    row.get::<_, Option<String>>(index)?
        .map(|raw| parse_timestamp(&raw).map_err(|message| conversion_error(index, message)))
        .transpose()
}

fn conversion_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}

#[cfg(test)]
impl Database {
    pub(crate) fn execute_raw(&self, sql: &str) -> AppResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(sql, [])?)
    }

    pub(crate) fn row_count(&self, table: &str) -> AppResult<i64> {
        let conn = self.conn()?;
        Ok(conn.query_row(&format!("SELECT COUNT(1) FROM {}", table), [], |row| row.get(0))?)
    }

    pub(crate) fn total_changes(&self) -> AppResult<u64> {
        let conn = self.conn()?;
        Ok(conn.total_changes() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, parse_timestamp, Database};
    use chrono::{TimeZone, Utc};

    #[test]
    fn open_creates_every_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(&dir.path().join("project.db")).expect("db");

        for table in ["todos", "bugs", "ideas", "notes", "progresses", "blocks"] {
            assert_eq!(db.row_count(table).expect("count"), 0, "table {table}");
        }
    }

    #[test]
    fn open_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("projects").join("default.db");
        let db = Database::open(&path).expect("db");
        assert_eq!(db.path(), path.as_path());
        assert!(path.exists());
    }

    #[test]
    fn prepare_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(&dir.path().join("project.db")).expect("db");
        db.execute_raw("INSERT INTO todos (title) VALUES ('keep me')").expect("insert");

        db.prepare().expect("second prepare");
        db.prepare().expect("third prepare");

        assert_eq!(db.row_count("todos").expect("count"), 1);
    }

    #[test]
    fn reopening_an_existing_file_keeps_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("project.db");
        {
            let db = Database::open(&path).expect("db");
            db.execute_raw("INSERT INTO notes (title) VALUES ('persisted')").expect("insert");
        }
        let reopened = Database::open(&path).expect("reopen");
        assert_eq!(reopened.row_count("notes").expect("count"), 1);
    }

    #[test]
    fn timestamps_accept_sqlite_and_rfc3339_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 30).unwrap();
        assert_eq!(parse_timestamp("2024-03-09 14:05:30").expect("sqlite"), expected);
        assert_eq!(parse_timestamp("2024-03-09T14:05:30Z").expect("rfc3339"), expected);
        assert_eq!(format_timestamp(&expected), "2024-03-09 14:05:30");
        assert!(parse_timestamp("yesterday").is_err());
    }
}
