// tests/integration_test.rs - Integration tests for files, buffers and ex commands

mod common;

use common::{boundary, validation};
use kestrel::buffer_manager::BufferId;
use kestrel::config::EditorConfig;
use kestrel::editor::{Editor, Status};
use kestrel::error::{EditorError, PersistOp};
use kestrel::persistence::MemoryPersistence;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tempfile::TempDir;

fn memory_editor(store: &Rc<MemoryPersistence>) -> Editor {
    Editor::with_persistence(EditorConfig::default(), Box::new(Rc::clone(store)))
}

#[test]
fn test_load_edit_save_file() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("test.txt");
    fs::write(&file_path, "Hello\nWorld\n").unwrap();

    let mut editor = Editor::new();
    editor.open_file(&file_path).unwrap();
    assert_eq!(editor.buffer().line_count(), 3);
    assert_eq!(editor.buffer().line(0).unwrap(), "Hello");
    assert_eq!(editor.buffer().line(2).unwrap(), "");
    assert_eq!(editor.registers().read('%').unwrap().text, file_path.display().to_string());

    editor.feed_keys("A!<Esc>:w<CR>").unwrap();
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "Hello!\nWorld\n");
    assert!(!editor.buffer().is_dirty());
    assert!(matches!(editor.status(), Some(Status::Info(msg)) if msg.contains("written")));
}

#[test]
fn test_crlf_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("dos.txt");
    fs::write(&file_path, "one\r\ntwo\r\n").unwrap();

    let mut editor = Editor::new();
    editor.open_file(&file_path).unwrap();
    assert_eq!(editor.buffer().line(0).unwrap(), "one");
    editor.feed_keys("ddp:w<CR>").unwrap();
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "two\r\none\r\n");
}

#[test]
fn test_missing_file_opens_empty_and_is_created_on_write() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("new.txt");

    let mut editor = Editor::new();
    editor.open_file(&file_path).unwrap();
    assert_eq!(validation::lines(&editor), vec![""]);
    editor.feed_keys("inew file<Esc>:wq<CR>").unwrap();
    assert_eq!(fs::read_to_string(&file_path).unwrap(), "new file");
}

#[test]
fn test_write_clean_buffer_reports_no_changes() {
    let store = Rc::new(MemoryPersistence::new().with_file("a.txt", "abc"));
    let mut editor = memory_editor(&store);
    editor.open_file("a.txt").unwrap();
    editor.feed_keys(":w<CR>").unwrap();
    assert_eq!(editor.status(), Some(&Status::Info("No changes to save".to_string())));
}

#[test]
fn test_failed_save_is_fatal_and_distinct() {
    let store = Rc::new(MemoryPersistence::new().with_file("locked.txt", "abc"));
    store.set_read_only("locked.txt");
    let mut editor = memory_editor(&store);
    editor.open_file("locked.txt").unwrap();

    let err = editor.feed_keys("x:w<CR>").unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, EditorError::Persistence { op: PersistOp::Save, .. }));
    assert!(editor.buffer().is_dirty());
    assert_eq!(store.contents(Path::new("locked.txt")).unwrap(), "abc");
}

#[test]
fn test_write_unnamed_buffer() {
    let store = Rc::new(MemoryPersistence::new());
    let mut editor = memory_editor(&store);
    editor.feed_keys("ihello<Esc>:w<CR>").unwrap();
    assert_eq!(
        editor.status(),
        Some(&Status::Error(EditorError::NoFileName.to_string()))
    );

    editor.feed_keys(":w out.txt<CR>").unwrap();
    assert_eq!(store.contents(Path::new("out.txt")).unwrap(), "hello");
    assert_eq!(editor.buffer().path(), Some(Path::new("out.txt")));
    assert!(!editor.buffer().is_dirty());
}

#[test]
fn test_undo_back_to_saved_state_is_clean() {
    let store = Rc::new(MemoryPersistence::new().with_file("a.txt", "abc"));
    let mut editor = memory_editor(&store);
    editor.open_file("a.txt").unwrap();
    editor.feed_keys("x:w<CR>x").unwrap();
    assert!(editor.buffer().is_dirty());
    editor.feed_keys("u").unwrap();
    assert!(!editor.buffer().is_dirty());
    editor.feed_keys("u").unwrap();
    assert!(editor.buffer().is_dirty());
}

#[test]
fn test_buffers_switch_and_close() {
    let store = Rc::new(
        MemoryPersistence::new()
            .with_file("a.txt", "alpha")
            .with_file("b.txt", "beta"),
    );
    let mut editor = memory_editor(&store);
    let a = editor.open_file("a.txt").unwrap();
    let b = editor.open_file("b.txt").unwrap();
    assert_eq!(editor.buffers().len(), 2);
    assert_eq!(editor.active_buffer_id(), b);

    editor.feed_keys(":bn<CR>").unwrap();
    assert_eq!(editor.active_buffer_id(), a);
    assert_eq!(validation::lines(&editor), vec!["alpha"]);
    editor.feed_keys(&format!(":b {}<CR>", b)).unwrap();
    assert_eq!(editor.active_buffer_id(), b);

    // cursor and history stay with their buffer
    editor.feed_keys("x:bp<CR>").unwrap();
    assert_eq!(validation::lines(&editor), vec!["alpha"]);
    editor.feed_keys(":bn<CR>u").unwrap();
    assert_eq!(validation::lines(&editor), vec!["beta"]);

    editor.feed_keys(":bd<CR>").unwrap();
    assert_eq!(editor.active_buffer_id(), a);
    editor.feed_keys(":bd<CR>").unwrap();
    assert_eq!(
        editor.status(),
        Some(&Status::Error(EditorError::CannotCloseLastBuffer.to_string()))
    );
    editor.feed_keys(":b 99<CR>").unwrap();
    assert_eq!(
        editor.status(),
        Some(&Status::Error(EditorError::UnknownBuffer(BufferId(99)).to_string()))
    );
}

#[test]
fn test_close_dirty_buffer_needs_force() {
    let store = Rc::new(
        MemoryPersistence::new()
            .with_file("a.txt", "alpha")
            .with_file("b.txt", "beta"),
    );
    let mut editor = memory_editor(&store);
    editor.open_file("a.txt").unwrap();
    let b = editor.open_file("b.txt").unwrap();
    editor.feed_keys("x:bd<CR>").unwrap();
    assert_eq!(editor.active_buffer_id(), b);
    editor.feed_keys(":bd!<CR>").unwrap();
    assert_ne!(editor.active_buffer_id(), b);
}

#[test]
fn test_reopen_activates_existing_buffer() {
    let store = Rc::new(
        MemoryPersistence::new()
            .with_file("a.txt", "alpha")
            .with_file("b.txt", "beta"),
    );
    let mut editor = memory_editor(&store);
    let a = editor.open_file("a.txt").unwrap();
    editor.open_file("b.txt").unwrap();
    editor.feed_keys(":e a.txt<CR>").unwrap();
    assert_eq!(editor.active_buffer_id(), a);
    assert_eq!(editor.buffers().len(), 2);
}

#[test]
fn test_edit_reload_requires_force_when_dirty() {
    let store = Rc::new(MemoryPersistence::new().with_file("a.txt", "alpha"));
    let mut editor = memory_editor(&store);
    editor.open_file("a.txt").unwrap();
    editor.feed_keys("x:e<CR>").unwrap();
    assert_eq!(validation::lines(&editor), vec!["lpha"]);
    editor.feed_keys(":e!<CR>").unwrap();
    assert_eq!(validation::lines(&editor), vec!["alpha"]);
    assert!(!editor.buffer().is_dirty());
    assert!(!editor.history().can_undo());
}

#[test]
fn test_list_buffers() {
    let store = Rc::new(MemoryPersistence::new().with_file("a.txt", "alpha"));
    let mut editor = memory_editor(&store);
    editor.open_file("a.txt").unwrap();
    editor.feed_keys(":ls<CR>").unwrap();
    let listing = editor.status().unwrap().message().to_string();
    assert!(listing.contains("a.txt"));
    assert!(listing.contains('%'));
}

#[test]
fn test_quit_checks_every_buffer() {
    let store = Rc::new(
        MemoryPersistence::new()
            .with_file("a.txt", "alpha")
            .with_file("b.txt", "beta"),
    );
    let mut editor = memory_editor(&store);
    editor.open_file("a.txt").unwrap();
    editor.feed_keys("x").unwrap();
    editor.open_file("b.txt").unwrap();
    assert!(!editor.feed_keys(":q<CR>").unwrap());
    assert!(!editor.feed_keys(":x<CR>").unwrap());
    assert!(editor.feed_keys(":q!<CR>").unwrap());
}

#[test]
fn test_substitute_scopes_and_flags() {
    let mut editor = boundary::editor_with("foo foo\nfoo");
    editor.feed_keys(":s/foo/bar/<CR>").unwrap();
    assert_eq!(validation::lines(&editor), vec!["bar foo", "foo"]);
    editor.feed_keys(":%s/FOO/baz/gi<CR>").unwrap();
    assert_eq!(validation::lines(&editor), vec!["bar baz", "baz"]);
    editor.feed_keys(":%s/nothing/x/<CR>").unwrap();
    assert!(editor.status().unwrap().is_error());
}

#[test]
fn test_substitute_reuses_last_search() {
    let mut editor = boundary::editor_with("a.b a.b");
    editor.feed_keys("/\\.<CR>:s//-/g<CR>").unwrap();
    assert_eq!(validation::lines(&editor), vec!["a-b a-b"]);
    editor.feed_keys(":s/b/[&]/g<CR>").unwrap();
    assert_eq!(validation::lines(&editor), vec!["a-[b] a-[b]"]);
}

#[test]
fn test_goto_line_command() {
    let mut editor = boundary::editor_with(&boundary::multiline_text(20));
    editor.feed_keys(":15<CR>").unwrap();
    assert_eq!(editor.cursor().line, 14);
    editor.feed_keys(":999<CR>").unwrap();
    assert_eq!(editor.cursor().line, 19);
    assert_eq!(editor.registers().read(':').unwrap().text, "999");
}

#[test]
fn test_unknown_ex_command_is_reported() {
    let mut editor = boundary::editor_with("abc");
    assert!(!editor.feed_keys(":frobnicate<CR>").unwrap());
    assert!(editor.status().unwrap().is_error());
    assert_eq!(editor.mode(), kestrel::mode::Mode::Normal);
}

#[test]
fn test_config_changes_behaviour() {
    let config = EditorConfig::from_toml_str("shift_width = 2\nwrap_scan = false\nignore_case = true\n")
        .unwrap();
    let mut editor = Editor::with_config(config);
    editor.feed_keys("iabc<CR>ABC<Esc>").unwrap();
    editor.feed_keys(">>").unwrap();
    assert_eq!(validation::lines(&editor), vec!["abc", "  ABC"]);

    editor.feed_keys("gg/abc<CR>").unwrap();
    assert_eq!(editor.cursor().line, 1);
    editor.feed_keys("n").unwrap();
    assert!(editor.status().unwrap().is_error());
    assert_eq!(editor.cursor().line, 1);
}

#[test]
fn test_viewport_follows_cursor() {
    let mut editor = boundary::editor_with(&boundary::multiline_text(100));
    editor.resize(10, 40);
    editor.feed_keys("50G").unwrap();
    let range = editor.visible_range();
    assert!(range.contains(&49));
    assert_eq!(range.len(), 10);
    editor.feed_keys("gg").unwrap();
    assert_eq!(editor.visible_range(), 0..10);
}
