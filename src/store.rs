use crate::db::Database;
use crate::errors::{AppError, AppResult};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Tells the store which project file is currently selected.
pub trait ProjectSource: Send + Sync {
    fn current_project_path(&self) -> Option<PathBuf>;
}

/// Process-wide handle to the selected project's database.
///
/// Created closed; `initialize` opens it, `reinitialize` follows a project
/// switch, `close` drops the connection. Every record operation goes through
/// [`Store::database`], which refuses to hand out a database before
/// initialization has completed.
pub struct Store {
    projects: Arc<dyn ProjectSource>,
    active: RwLock<Option<Arc<Database>>>,
}

impl Store {
    pub fn new(projects: Arc<dyn ProjectSource>) -> Self {
        Self {
            projects,
            active: RwLock::new(None),
        }
    }

    /// Safe to call repeatedly. Re-runs the schema check and block purge when
    /// the selected project is already open, and opens the new file when the
    /// selection has changed.
    pub fn initialize(&self) -> AppResult<Arc<Database>> {
        let path = self.projects.current_project_path().ok_or_else(|| {
            AppError::NoProject("No project file selected. Initialize a project first.".to_string())
        })?;

        let mut active = self
            .active
            .write()
            .map_err(|_| AppError::Internal("store lock poisoned".to_string()))?;

        if let Some(current) = active.as_ref().filter(|db| db.path() == path.as_path()) {
            current.prepare()?;
            return Ok(Arc::clone(current));
        }

        let database = Arc::new(Database::open(&path)?);
        *active = Some(Arc::clone(&database));
        tracing::info!(path = %path.to_string_lossy(), "store initialized");
        Ok(database)
    }

    pub fn reinitialize(&self) -> AppResult<Arc<Database>> {
        self.close()?;
        self.initialize()
    }

    pub fn close(&self) -> AppResult<()> {
        let mut active = self
            .active
            .write()
            .map_err(|_| AppError::Internal("store lock poisoned".to_string()))?;
        if let Some(previous) = active.take() {
            tracing::info!(path = %previous.path().to_string_lossy(), "store closed");
        }
        Ok(())
    }

    pub fn database(&self) -> AppResult<Arc<Database>> {
        let active = self
            .active
            .read()
            .map_err(|_| AppError::Internal("store lock poisoned".to_string()))?;
        active.as_ref().map(Arc::clone).ok_or_else(|| {
            AppError::StoreUnavailable("Store has not been initialized for a project".to_string())
        })
    }

    pub fn is_open(&self) -> bool {
        self.active.read().map(|active| active.is_some()).unwrap_or(false)
    }

    pub fn active_path(&self) -> Option<PathBuf> {
        self.active
            .read()
            .ok()
            .and_then(|active| active.as_ref().map(|db| db.path().to_path_buf()))
    }

    /// Purges blocks from previous days. Startup already does this once; the
    /// shell calls it again when the app comes back to the foreground.
    pub fn daily_cleanup(&self) -> AppResult<u64> {
        let purged = self.database()?.daily_cleanup()?;
        if purged > 0 {
            tracing::info!(count = purged, "daily cleanup removed stale blocks");
        }
        Ok(purged)
    }
}
