//! Shared test utilities.
//!
//! Only compiled when running tests.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::config::Settings;
use crate::workspace::Folder;

/// Creates a temporary folder root for testing.
///
/// Returns the temp directory handle, which must stay alive for the test, and
/// the path of a non-hidden `notes` subdirectory. Some systems create temp
/// directories as `/tmp/.tmpXXXXX`; the subdirectory keeps the root itself
/// clear of dot-prefixed components.
pub fn create_test_folder_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let folder_dir = temp_dir.path().join("notes");
    fs::create_dir(&folder_dir).expect("Failed to create notes subdirectory");
    (temp_dir, folder_dir)
}

/// Creates files through `setup_fn`, then scans them into a [`Folder`] with
/// default settings.
///
/// ```ignore
/// let (_temp_dir, folder_dir, folder) = create_test_folder(|dir| {
///     std::fs::write(dir.join("test.md"), "# Test").unwrap();
/// });
/// ```
pub fn create_test_folder<F>(setup_fn: F) -> (TempDir, PathBuf, Folder)
where
    F: FnOnce(&PathBuf),
{
    let (temp_dir, folder_dir) = create_test_folder_dir();
    setup_fn(&folder_dir);
    let folder = Folder::scan("notes", &folder_dir, &Settings::default())
        .expect("Failed to scan test folder")
        .expect("Test folder vanished");
    (temp_dir, folder_dir, folder)
}

/// Two cross-linked documents exercising every element kind.
///
/// ```text
/// doc1.md                      doc2.md
/// 0 # Doc 1                    0 # Doc 2
/// 1                            1
/// 2 ## D1 H2.1                 2 ## D2 H2.1
/// 3 Link to [[doc-2#d2-h22]].  3 See [d2-link-1] here.
///                              4 Jump to [[#d2-h22]].
///                              5 Again [d2-link-1].
///                              6 ## D2 H2.2
///                              7 Back to [[doc-1]].
///                              8 Also [lbl1](/doc1.md).
///                              9
///                             10 [d2-link-1]: some-url
/// ```
pub fn create_reference_fixture() -> (TempDir, PathBuf, Folder) {
    create_test_folder(|dir| {
        fs::write(
            dir.join("doc1.md"),
            "# Doc 1\n\n## D1 H2.1\nLink to [[doc-2#d2-h22]].\n",
        )
        .expect("Failed to write doc1.md");
        fs::write(
            dir.join("doc2.md"),
            concat!(
                "# Doc 2\n",
                "\n",
                "## D2 H2.1\n",
                "See [d2-link-1] here.\n",
                "Jump to [[#d2-h22]].\n",
                "Again [d2-link-1].\n",
                "## D2 H2.2\n",
                "Back to [[doc-1]].\n",
                "Also [lbl1](/doc1.md).\n",
                "\n",
                "[d2-link-1]: some-url\n",
            ),
        )
        .expect("Failed to write doc2.md");
    })
}
