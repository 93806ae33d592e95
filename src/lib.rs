pub mod command;
pub mod db;
pub mod errors;
pub mod maintenance;
pub mod models;
pub mod project;
pub mod store;

use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Block, BlockPatch, Bug, BugPatch, EditorParams, Idea, IdeaPatch, Intent, NewBlock, NewBug, NewIdea, NewNote,
    NewTodo, Note, NotePatch, Progress, RecordKind, Todo, TodoPatch,
};
use crate::project::{AppDirs, ProjectManager};
use crate::store::Store;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use uuid::Uuid;

pub const APP_ID: &str = "com.devnote.app";

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Everything a GUI shell needs: the project selection and the record store
/// for the selected project.
#[derive(Clone)]
pub struct AppState {
    pub projects: Arc<ProjectManager>,
    pub store: Arc<Store>,
}

impl AppState {
    pub fn new(dirs: AppDirs) -> Self {
        let projects = Arc::new(ProjectManager::new(dirs));
        let store = Arc::new(Store::new(projects.clone()));
        Self { projects, store }
    }

    /// Selects the last used (or default) project and opens its store.
    pub fn bootstrap(dirs: AppDirs) -> AppResult<Self> {
        let state = Self::new(dirs);
        let path = state.projects.init_project()?;
        state.store.initialize()?;
        tracing::info!(path = %path.to_string_lossy(), "devnote core ready");
        Ok(state)
    }
}

/// Entry point for the desktop shell: platform directories, file logging,
/// then [`AppState::bootstrap`].
pub fn start() -> AppResult<AppState> {
    let dirs = AppDirs::discover(APP_ID)?;
    init_tracing(&dirs.logs_dir()).map_err(AppError::Internal)?;
    AppState::bootstrap(dirs)
}

pub fn parse_command(input: &str) -> Option<Intent> {
    command::parse(input)
}

pub fn editor_params_for(input: &str) -> Option<EditorParams> {
    command::parse(input).map(|intent| intent.editor_params())
}

pub fn todos_list(state: &AppState) -> Result<Vec<Todo>, String> {
    with_database(state, |db| db.list_todos())
}

pub fn todo_create(state: &AppState, payload: NewTodo) -> Result<Todo, String> {
    with_database(state, |db| db.create_todo(payload))
}

pub fn todo_update(state: &AppState, id: i64, patch: TodoPatch) -> Result<(), String> {
    with_database(state, |db| db.update_todo(id, patch))
}

pub fn todo_delete(state: &AppState, id: i64) -> Result<(), String> {
    with_database(state, |db| db.delete_todo(id))
}

pub fn bugs_list(state: &AppState) -> Result<Vec<Bug>, String> {
    with_database(state, |db| db.list_bugs())
}

pub fn bug_create(state: &AppState, payload: NewBug) -> Result<Bug, String> {
    with_database(state, |db| db.create_bug(payload))
}

pub fn bug_update(state: &AppState, id: i64, patch: BugPatch) -> Result<(), String> {
    with_database(state, |db| db.update_bug(id, patch))
}

pub fn bug_delete(state: &AppState, id: i64) -> Result<(), String> {
    with_database(state, |db| db.delete_bug(id))
}

pub fn ideas_list(state: &AppState) -> Result<Vec<Idea>, String> {
    with_database(state, |db| db.list_ideas())
}

pub fn idea_create(state: &AppState, payload: NewIdea) -> Result<Idea, String> {
    with_database(state, |db| db.create_idea(payload))
}

pub fn idea_update(state: &AppState, id: i64, patch: IdeaPatch) -> Result<(), String> {
    with_database(state, |db| db.update_idea(id, patch))
}

pub fn idea_delete(state: &AppState, id: i64) -> Result<(), String> {
    with_database(state, |db| db.delete_idea(id))
}

pub fn notes_list(state: &AppState) -> Result<Vec<Note>, String> {
    with_database(state, |db| db.list_notes())
}

pub fn note_create(state: &AppState, payload: NewNote) -> Result<Note, String> {
    with_database(state, |db| db.create_note(payload))
}

pub fn note_update(state: &AppState, id: i64, patch: NotePatch) -> Result<(), String> {
    with_database(state, |db| db.update_note(id, patch))
}

pub fn note_delete(state: &AppState, id: i64) -> Result<(), String> {
    with_database(state, |db| db.delete_note(id))
}

pub fn progress_list(state: &AppState) -> Result<Vec<Progress>, String> {
    with_database(state, |db| db.list_progress())
}

pub fn progress_get(state: &AppState, date: NaiveDate) -> Result<Option<Progress>, String> {
    with_database(state, |db| db.progress_by_date(date))
}

pub fn progress_save(state: &AppState, date: NaiveDate, content: Vec<String>) -> Result<Progress, String> {
    with_database(state, |db| db.create_or_update_progress(date, &content))
}

pub fn progress_delete(state: &AppState, id: i64) -> Result<(), String> {
    with_database(state, |db| db.delete_progress(id))
}

pub fn blocks_list(state: &AppState) -> Result<Vec<Block>, String> {
    with_database(state, |db| db.list_blocks())
}

pub fn block_create(state: &AppState, payload: NewBlock) -> Result<Block, String> {
    with_database(state, |db| db.create_block(payload))
}

pub fn block_update(state: &AppState, id: String, patch: BlockPatch) -> Result<(), String> {
    with_database(state, |db| db.update_block(&id, patch))
}

pub fn block_delete(state: &AppState, id: String) -> Result<(), String> {
    with_database(state, |db| db.delete_block(&id))
}

pub fn blocks_clear(state: &AppState) -> Result<(), String> {
    with_database(state, |db| db.delete_all_blocks())
}

pub fn blocks_cleanup(state: &AppState) -> Result<u64, String> {
    state.store.daily_cleanup().map_err(to_client_error)
}

/// Saves editor content as a new block on today's workspace.
pub fn capture_block(state: &AppState, kind: RecordKind, content: String) -> Result<Block, String> {
    let payload = NewBlock {
        id: Uuid::new_v4().to_string(),
        kind,
        content,
        related_id: None,
    };
    with_database(state, |db| db.create_block(payload))
}

pub fn project_current(state: &AppState) -> Option<PathBuf> {
    state.projects.current_project_path()
}

pub fn project_new(state: &AppState, path: PathBuf) -> Result<PathBuf, String> {
    let previous = state.projects.current_project_path();
    let created = state.projects.new_project(&path).map_err(to_client_error)?;
    activate_selection(state, previous).map_err(to_client_error)?;
    Ok(created)
}

pub fn project_open(state: &AppState, path: PathBuf) -> Result<Option<PathBuf>, String> {
    let previous = state.projects.current_project_path();
    let Some(opened) = state.projects.open_project(&path).map_err(to_client_error)? else {
        return Ok(None);
    };
    activate_selection(state, previous).map_err(to_client_error)?;
    Ok(Some(opened))
}

/// Opens the store on the newly selected file and only then records it in the
/// config. If the file cannot be opened, the previous project is selected and
/// reopened, and the config keeps pointing at it.
fn activate_selection(state: &AppState, previous: Option<PathBuf>) -> AppResult<()> {
    let error = match state.store.reinitialize() {
        Ok(_) => return state.projects.remember_current(),
        Err(error) => error,
    };

    tracing::warn!(error = %error, "project switch failed, restoring previous project");
    state.projects.restore(previous)?;
    if state.projects.current_project_path().is_some() {
        if let Err(reopen) = state.store.initialize() {
            tracing::warn!(error = %reopen, "previous project could not be reopened");
        }
    }
    Err(error)
}

pub fn init_tracing(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "devnote.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

fn with_database<T>(state: &AppState, operation: impl FnOnce(&Database) -> AppResult<T>) -> Result<T, String> {
    state
        .store
        .database()
        .and_then(|db| operation(db.as_ref()))
        .map_err(to_client_error)
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
