use chrono::Local;
use devnote_lib::models::{NewNote, NewTodo, NotePatch, RecordKind, TodoPatch};
use devnote_lib::project::AppDirs;
use devnote_lib::{
    blocks_clear, blocks_list, capture_block, note_create, note_update, notes_list, progress_get, progress_save,
    project_current, project_new, project_open, todo_create, todo_delete, todo_update, todos_list, AppState,
};

#[test]
fn bootstrap_opens_the_default_project() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::bootstrap(AppDirs::rooted(dir.path())).expect("bootstrap");

    let current = project_current(&state).expect("project selected");
    assert!(current.ends_with("projects/default.db"));
    assert!(state.store.is_open());
    assert!(todos_list(&state).expect("list").is_empty());
}

#[test]
fn commands_before_bootstrap_report_unavailable_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::new(AppDirs::rooted(dir.path()));

    let error = todos_list(&state).expect_err("not initialized");
    assert!(error.starts_with("STORE_UNAVAILABLE"), "{error}");
}

#[test]
fn todo_lifecycle_through_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::bootstrap(AppDirs::rooted(dir.path())).expect("bootstrap");

    let todo = todo_create(
        &state,
        NewTodo {
            title: "renew certificate".to_string(),
            ..NewTodo::default()
        },
    )
    .expect("create");
    assert_eq!(todo.priority, 2);
    assert!(!todo.finished);

    todo_update(
        &state,
        todo.id,
        TodoPatch {
            finished: Some(true),
            ..TodoPatch::default()
        },
    )
    .expect("update");
    let listed = todos_list(&state).expect("list");
    assert_eq!(listed.len(), 1);
    assert!(listed[0].finished);
    assert_eq!(listed[0].title, "renew certificate");

    todo_delete(&state, todo.id).expect("delete");
    todo_delete(&state, todo.id).expect("delete twice");
    assert!(todos_list(&state).expect("list").is_empty());
}

#[test]
fn note_edits_and_progress_upserts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::bootstrap(AppDirs::rooted(dir.path())).expect("bootstrap");

    let note = note_create(
        &state,
        NewNote {
            title: "retro".to_string(),
            content: "went well".to_string(),
        },
    )
    .expect("note");
    note_update(
        &state,
        note.id,
        NotePatch {
            content: Some("went well; ship faster".to_string()),
            ..NotePatch::default()
        },
    )
    .expect("update");
    assert_eq!(notes_list(&state).expect("notes")[0].content, "went well; ship faster");

    let today = Local::now().date_naive();
    progress_save(&state, today, vec!["morning".to_string()]).expect("first");
    progress_save(&state, today, vec!["morning".to_string(), "afternoon".to_string()]).expect("second");
    let stored = progress_get(&state, today).expect("get").expect("exists");
    assert_eq!(stored.content, vec!["morning", "afternoon"]);
}

#[test]
fn captured_blocks_live_on_todays_workspace() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::bootstrap(AppDirs::rooted(dir.path())).expect("bootstrap");

    let first = capture_block(&state, RecordKind::Todo, "call the bank".to_string()).expect("first");
    let second = capture_block(&state, RecordKind::Bug, "login loops".to_string()).expect("second");
    assert_ne!(first.id, second.id);

    let blocks = blocks_list(&state).expect("list");
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].kind, RecordKind::Todo);

    blocks_clear(&state).expect("clear");
    assert!(blocks_list(&state).expect("list").is_empty());
}

#[test]
fn switching_projects_reopens_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::bootstrap(AppDirs::rooted(dir.path())).expect("bootstrap");
    todo_create(
        &state,
        NewTodo {
            title: "in default".to_string(),
            ..NewTodo::default()
        },
    )
    .expect("create");
    let default_path = project_current(&state).expect("current");

    let created = project_new(&state, dir.path().join("side-project")).expect("new");
    assert_eq!(created, dir.path().join("side-project.db"));
    assert!(todos_list(&state).expect("list").is_empty());

    assert_eq!(project_open(&state, dir.path().join("missing.db")).expect("open"), None);
    assert_eq!(project_current(&state), Some(created));

    project_open(&state, default_path).expect("reopen").expect("exists");
    assert_eq!(todos_list(&state).expect("list").len(), 1);

    let restarted = AppState::bootstrap(AppDirs::rooted(dir.path())).expect("restart");
    assert_eq!(todos_list(&restarted).expect("list").len(), 1);
}

#[test]
fn unreadable_project_file_leaves_previous_project_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::bootstrap(AppDirs::rooted(dir.path())).expect("bootstrap");
    todo_create(
        &state,
        NewTodo {
            title: "still here".to_string(),
            ..NewTodo::default()
        },
    )
    .expect("create");
    let default_path = project_current(&state).expect("current");

    let garbage = dir.path().join("garbage.db");
    std::fs::write(&garbage, vec![b'x'; 4096]).expect("write garbage");

    assert!(project_open(&state, garbage).is_err());
    assert_eq!(project_current(&state), Some(default_path.clone()));
    assert!(state.store.is_open());
    assert_eq!(todos_list(&state).expect("list").len(), 1);
    assert_eq!(state.projects.read_config().last_project_path, Some(default_path));
}
