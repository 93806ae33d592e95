use crate::errors::{AppError, AppResult};
use crate::store::ProjectSource;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const CONFIG_FILE: &str = "config.json";
const DEFAULT_DB_NAME: &str = "default.db";
const PROJECTS_DIR: &str = "projects";

static PROJECT_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(db|sqlite)$").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_project_path: Option<PathBuf>,
}

/// Where the app keeps its config file and its default project.
#[derive(Debug, Clone)]
pub struct AppDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppDirs {
    pub fn discover(app_id: &str) -> AppResult<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| AppError::Io("Unable to determine the platform config directory".to_string()))?;
        let data_dir = dirs::data_dir()
            .ok_or_else(|| AppError::Io("Unable to determine the platform data directory".to_string()))?;
        Ok(Self {
            config_dir: config_dir.join(app_id),
            data_dir: data_dir.join(app_id),
        })
    }

    /// Both directories under one root; handy for portable installs.
    pub fn rooted(root: &Path) -> Self {
        Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
        }
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

/// Tracks the selected project file and remembers it across launches.
///
/// Choosing a file (save/open dialogs) is the shell's job; this type only
/// receives the chosen path.
#[derive(Debug)]
pub struct ProjectManager {
    dirs: AppDirs,
    current: RwLock<Option<PathBuf>>,
}

impl ProjectManager {
    pub fn new(dirs: AppDirs) -> Self {
        Self {
            dirs,
            current: RwLock::new(None),
        }
    }

    pub fn dirs(&self) -> &AppDirs {
        &self.dirs
    }

    /// Selects the last used project if it still exists, otherwise the default
    /// project under the data directory (creating an empty file for it).
    pub fn init_project(&self) -> AppResult<PathBuf> {
        let config = self.read_config();
        if let Some(last) = config.last_project_path.filter(|path| path.exists()) {
            tracing::info!(path = %last.to_string_lossy(), "reopening last project");
            self.select(Some(last.clone()))?;
            return Ok(last);
        }

        let default_path = self.default_project_path()?;
        if !default_path.exists() {
            create_empty_file(&default_path)?;
            tracing::info!(path = %default_path.to_string_lossy(), "created default project file");
        }

        self.select(Some(default_path.clone()))?;
        self.write_config(&ProjectConfig {
            last_project_path: Some(default_path.clone()),
        })?;
        Ok(default_path)
    }

    /// Creates an empty project file at `path` and selects it. Names without a
    /// `.db`/`.sqlite` extension get `.db` appended.
    ///
    /// The config is left alone; call [`ProjectManager::remember_current`]
    /// once the store has opened the new file.
    pub fn new_project(&self, path: &Path) -> AppResult<PathBuf> {
        let file_path = with_project_extension(path);
        create_empty_file(&file_path)?;

        self.select(Some(file_path.clone()))?;
        tracing::info!(path = %file_path.to_string_lossy(), "new project created");
        Ok(file_path)
    }

    /// Selects an existing project file. Returns `None` if it does not exist.
    /// Like `new_project`, this does not touch the config.
    pub fn open_project(&self, path: &Path) -> AppResult<Option<PathBuf>> {
        if !path.is_file() {
            tracing::warn!(path = %path.to_string_lossy(), "project file not found");
            return Ok(None);
        }

        let file_path = path.to_path_buf();
        self.select(Some(file_path.clone()))?;
        Ok(Some(file_path))
    }

    /// Records the current selection as the project to reopen on next launch.
    pub fn remember_current(&self) -> AppResult<()> {
        let Some(path) = self.current_project_path() else {
            return Ok(());
        };
        self.write_config(&ProjectConfig {
            last_project_path: Some(path),
        })
    }

    /// Puts back a selection captured before a switch that could not be
    /// completed.
    pub fn restore(&self, previous: Option<PathBuf>) -> AppResult<()> {
        self.select(previous)
    }

    pub fn current_project_path(&self) -> Option<PathBuf> {
        self.current.read().ok().and_then(|current| current.clone())
    }

    pub fn config_path(&self) -> PathBuf {
        self.dirs.config_dir.join(CONFIG_FILE)
    }

    pub fn default_project_path(&self) -> AppResult<PathBuf> {
        let projects_dir = self.dirs.data_dir.join(PROJECTS_DIR);
        fs::create_dir_all(&projects_dir)?;
        Ok(projects_dir.join(DEFAULT_DB_NAME))
    }

    /// A missing or unreadable config reads as empty.
    pub fn read_config(&self) -> ProjectConfig {
        let path = self.config_path();
        if !path.exists() {
            return ProjectConfig::default();
        }

        match fs::read(&path)
            .map_err(AppError::from)
            .and_then(|bytes| serde_json::from_slice::<ProjectConfig>(&bytes).map_err(AppError::from))
        {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(path = %path.to_string_lossy(), error = %error, "ignoring unreadable project config");
                ProjectConfig::default()
            }
        }
    }

    pub fn write_config(&self, config: &ProjectConfig) -> AppResult<()> {
        let path = self.config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(config)?;
        fs::write(&path, bytes)?;
        Ok(())
    }

    fn select(&self, path: Option<PathBuf>) -> AppResult<()> {
        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::Internal("project lock poisoned".to_string()))?;
        *current = path;
        Ok(())
    }
}

impl ProjectSource for ProjectManager {
    fn current_project_path(&self) -> Option<PathBuf> {
        ProjectManager::current_project_path(self)
    }
}

fn with_project_extension(path: &Path) -> PathBuf {
    if PROJECT_EXTENSION.is_match(&path.to_string_lossy()) {
        return path.to_path_buf();
    }
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".db");
    PathBuf::from(raw)
}

// SQLite treats a zero-length file as an empty database.
fn create_empty_file(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{with_project_extension, AppDirs, ProjectConfig, ProjectManager};
    use std::path::{Path, PathBuf};

    fn manager(root: &Path) -> ProjectManager {
        ProjectManager::new(AppDirs::rooted(root))
    }

    #[test]
    fn first_launch_creates_and_remembers_default_project() {
        let dir = tempfile::tempdir().expect("tempdir");
        let projects = manager(dir.path());

        let path = projects.init_project().expect("init");
        assert_eq!(path, dir.path().join("data").join("projects").join("default.db"));
        assert!(path.is_file());
        assert_eq!(projects.current_project_path(), Some(path.clone()));
        assert_eq!(projects.read_config().last_project_path, Some(path));
    }

    #[test]
    fn init_reuses_recorded_project_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let projects = manager(dir.path());
        let existing = dir.path().join("work.db");
        std::fs::write(&existing, b"").expect("seed file");
        projects
            .write_config(&ProjectConfig {
                last_project_path: Some(existing.clone()),
            })
            .expect("config");

        assert_eq!(projects.init_project().expect("init"), existing);
    }

    #[test]
    fn init_falls_back_when_recorded_project_is_gone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let projects = manager(dir.path());
        projects
            .write_config(&ProjectConfig {
                last_project_path: Some(dir.path().join("deleted.db")),
            })
            .expect("config");

        let path = projects.init_project().expect("init");
        assert!(path.ends_with("projects/default.db"));
        assert_eq!(projects.read_config().last_project_path, Some(path));
    }

    #[test]
    fn malformed_config_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let projects = manager(dir.path());
        std::fs::create_dir_all(dir.path().join("config")).expect("config dir");
        std::fs::write(projects.config_path(), b"{not json").expect("write");

        assert_eq!(projects.read_config(), ProjectConfig::default());
    }

    #[test]
    fn config_uses_camel_case_key() {
        let config = ProjectConfig {
            last_project_path: Some(PathBuf::from("/tmp/a.db")),
        };
        let json = serde_json::to_value(&config).expect("json");
        assert_eq!(json, serde_json::json!({"lastProjectPath": "/tmp/a.db"}));
        assert_eq!(serde_json::to_value(ProjectConfig::default()).expect("json"), serde_json::json!({}));
    }

    #[test]
    fn new_project_normalizes_extension() {
        assert_eq!(with_project_extension(Path::new("/p/work")), PathBuf::from("/p/work.db"));
        assert_eq!(with_project_extension(Path::new("/p/a.SQLITE")), PathBuf::from("/p/a.SQLITE"));
        assert_eq!(with_project_extension(Path::new("/p/notes.txt")), PathBuf::from("/p/notes.txt.db"));

        let dir = tempfile::tempdir().expect("tempdir");
        let projects = manager(dir.path());
        let created = projects.new_project(&dir.path().join("work")).expect("new");
        assert_eq!(created, dir.path().join("work.db"));
        assert!(created.is_file());
        assert_eq!(projects.current_project_path(), Some(created));
    }

    #[test]
    fn open_missing_project_selects_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let projects = manager(dir.path());

        assert_eq!(projects.open_project(&dir.path().join("nope.db")).expect("open"), None);
        assert_eq!(projects.current_project_path(), None);

        let existing = dir.path().join("there.sqlite");
        std::fs::write(&existing, b"").expect("seed");
        assert_eq!(projects.open_project(&existing).expect("open"), Some(existing.clone()));
        assert_eq!(projects.read_config().last_project_path, None);

        projects.remember_current().expect("remember");
        assert_eq!(projects.read_config().last_project_path, Some(existing));
    }

    #[test]
    fn restore_reverts_an_unconfirmed_switch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let projects = manager(dir.path());
        let original = projects.init_project().expect("init");

        let previous = projects.current_project_path();
        projects.new_project(&dir.path().join("draft")).expect("new");
        projects.restore(previous).expect("restore");

        assert_eq!(projects.current_project_path(), Some(original.clone()));
        assert_eq!(projects.read_config().last_project_path, Some(original));
    }
}
