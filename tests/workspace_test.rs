//! End-to-end workspace scenarios across several folders and editor events.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use marklink::config::Settings;
use marklink::references::references;
use marklink::workspace::{FolderSpec, State};
use tower_lsp::lsp_types::Position;

fn create_folder(temp_dir: &TempDir, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let root = temp_dir.path().join(name);
    fs::create_dir(&root).unwrap();
    for (file, text) in files {
        let path = root.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    root
}

fn reference_lines(state: &State, path: &Path, position: Position) -> Vec<(PathBuf, u32)> {
    references(state, position, path, true)
        .unwrap()
        .unwrap_or_default()
        .into_iter()
        .map(|location| {
            (
                location.uri.to_file_path().unwrap(),
                location.range.start.line,
            )
        })
        .collect()
}

#[test]
fn folders_do_not_see_each_others_documents() {
    let temp_dir = TempDir::new().unwrap();
    let work = create_folder(
        &temp_dir,
        "work",
        &[("plan.md", "# Plan\n"), ("todo.md", "[[plan]]\n")],
    );
    let home = create_folder(&temp_dir, "home", &[("list.md", "[[plan]]\n")]);

    let state = State::initialize(
        None,
        &[FolderSpec::new("work", &work), FolderSpec::new("home", &home)],
        |_| Settings::default(),
    )
    .unwrap();

    let lines = reference_lines(&state, &work.join("plan.md"), Position::default());

    assert_eq!(lines, vec![(work.join("plan.md"), 0), (work.join("todo.md"), 0)]);
}

#[test]
fn rename_as_close_then_open_moves_the_document() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_folder(
        &temp_dir,
        "notes",
        &[("old.md", "# Topic\n"), ("index.md", "[[topic]]\n")],
    );
    let state = State::initialize(None, &[FolderSpec::new("notes", &root)], |_| {
        Settings::default()
    })
    .unwrap()
    .open_document(root.join("old.md"), "# Topic\n", 1)
    .unwrap();

    fs::rename(root.join("old.md"), root.join("new.md")).unwrap();
    let renamed = state
        .close_document(&root.join("old.md"))
        .and_then(|state| state.open_document(root.join("new.md"), "# Topic\n", 1))
        .unwrap();

    assert!(renamed.document(&root.join("old.md")).unwrap().is_none());
    let lines = reference_lines(&renamed, &root.join("new.md"), Position::default());
    assert_eq!(lines, vec![(root.join("new.md"), 0), (root.join("index.md"), 0)]);
}

#[test]
fn workspace_folder_changes_rescan_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let first = create_folder(&temp_dir, "first", &[("a.md", "# A\n")]);
    let second = create_folder(
        &temp_dir,
        "second",
        &[("b.md", "# B\n"), ("sub/c.md", "[b](../b.md)\n")],
    );
    let state = State::initialize(None, &[FolderSpec::new("first", &first)], |_| {
        Settings::default()
    })
    .unwrap();

    let next = state
        .reconcile_folders(
            &[FolderSpec::new("second", &second)],
            &[first.clone()],
            Settings::for_root,
        )
        .unwrap();

    assert_eq!(next.folders().count(), 1);
    let lines = reference_lines(&next, &second.join("b.md"), Position::default());
    assert_eq!(lines, vec![(second.join("b.md"), 0), (second.join("sub/c.md"), 0)]);
}
